//! Shared plumbing for Office Open XML packages (`.docx`, `.pptx`).
//!
//! Both formats are ZIP archives of XML parts. Parts are read with a size
//! cap (zip-bomb protection) and parsed with `quick-xml`.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::BytesText;

use crate::error::{Error, Result};

/// Maximum decompressed bytes to read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub(crate) struct Package<'a> {
    archive: zip::ZipArchive<Cursor<&'a [u8]>>,
    path: &'a Path,
    format: &'static str,
}

impl<'a> Package<'a> {
    pub fn open(bytes: &'a [u8], path: &'a Path, format: &'static str) -> Result<Self> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::parse(format, path, e))?;
        Ok(Self {
            archive,
            path,
            format,
        })
    }

    pub fn error(&self, message: impl std::fmt::Display) -> Error {
        Error::parse(self.format, self.path, message)
    }

    /// Read one part, failing if it is missing or exceeds the size cap.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        read_capped(&mut self.archive, name, MAX_XML_ENTRY_BYTES)
            .map_err(|msg| Error::parse(self.format, self.path, msg))
    }

    /// Part names like `ppt/slides/slide12.xml`, sorted by their number.
    pub fn numbered_parts(&self, prefix: &str, suffix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|n| n.starts_with(prefix) && n.ends_with(suffix))
            .map(|s| s.to_string())
            .collect();
        names.sort_by_key(|name| {
            name.trim_start_matches(prefix)
                .trim_end_matches(suffix)
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        });
        names
    }
}

/// Read `name` from `archive`, allowing at most `cap` decompressed bytes.
fn read_capped<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
    cap: u64,
) -> std::result::Result<Vec<u8>, String> {
    let entry = archive
        .by_name(name)
        .map_err(|e| format!("{}: {}", name, e))?;
    let mut out = Vec::new();
    entry
        .take(cap + 1)
        .read_to_end(&mut out)
        .map_err(|e| format!("{}: {}", name, e))?;
    if out.len() as u64 > cap {
        return Err(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, cap
        ));
    }
    Ok(out)
}

pub(crate) fn unescaped(te: &BytesText<'_>) -> String {
    te.unescape().map(|s| s.into_owned()).unwrap_or_default()
}

/// Rows and cells of one table while its XML is being walked.
#[derive(Default)]
pub(crate) struct TableBuilder {
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn start_row(&mut self) {
        self.rows.push(Vec::new());
    }

    pub fn start_cell(&mut self) {
        if self.rows.is_empty() {
            self.start_row();
        }
        if let Some(row) = self.rows.last_mut() {
            row.push(String::new());
        }
    }

    /// Append a paragraph to the current cell, newline-separated.
    pub fn push_paragraph(&mut self, text: &str) {
        if let Some(cell) = self.rows.last_mut().and_then(|r| r.last_mut()) {
            if !cell.is_empty() {
                cell.push('\n');
            }
            cell.push_str(text);
        }
    }

    /// Render as a `TABLE:` block of ` | `-joined stripped cells.
    pub fn render(self) -> Option<String> {
        if self.rows.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.trim())
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect();
        Some(format!("TABLE:\n{}", lines.join("\n")))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_renders_pipe_rows() {
        let mut table = TableBuilder::default();
        table.start_row();
        table.start_cell();
        table.push_paragraph(" Name ");
        table.start_cell();
        table.push_paragraph("Role");
        table.start_row();
        table.start_cell();
        table.push_paragraph("Ada");
        table.start_cell();
        table.push_paragraph("Engineer");
        assert_eq!(
            table.render().unwrap(),
            "TABLE:\nName | Role\nAda | Engineer"
        );
    }

    #[test]
    fn read_reports_missing_part_with_path() {
        let bytes = test_support::zip_of(&[("word/other.xml", "<a/>")]);
        let path = Path::new("report.docx");
        let mut pkg = Package::open(&bytes, path, "DOCX").unwrap();
        let err = pkg.read("word/document.xml").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("report.docx"), "{}", msg);
        assert!(msg.contains("word/document.xml"), "{}", msg);
    }

    #[test]
    fn size_cap_is_inclusive() {
        let bytes = test_support::zip_of(&[("a.xml", "12345678"), ("b.xml", "123456789")]);
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(read_capped(&mut archive, "a.xml", 8).unwrap(), b"12345678");
        let err = read_capped(&mut archive, "b.xml", 8).unwrap_err();
        assert!(err.contains("exceeds size limit"));
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert!(TableBuilder::default().render().is_none());
    }

    #[test]
    fn numbered_parts_sort_numerically() {
        let bytes = test_support::zip_of(&[
            ("ppt/slides/slide10.xml", "<a/>"),
            ("ppt/slides/slide2.xml", "<a/>"),
            ("ppt/slides/slide1.xml", "<a/>"),
            ("ppt/slides/_rels/slide1.xml.rels", "<a/>"),
        ]);
        let path = Path::new("deck.pptx");
        let pkg = Package::open(&bytes, path, "PPTX").unwrap();
        assert_eq!(
            pkg.numbered_parts("ppt/slides/slide", ".xml"),
            vec![
                "ppt/slides/slide1.xml",
                "ppt/slides/slide2.xml",
                "ppt/slides/slide10.xml"
            ]
        );
    }

    #[test]
    fn missing_part_is_parse_error() {
        let bytes = test_support::zip_of(&[("other.xml", "<a/>")]);
        let path = Path::new("doc.docx");
        let mut pkg = Package::open(&bytes, path, "DOCX").unwrap();
        assert!(matches!(
            pkg.read("word/document.xml").unwrap_err(),
            Error::Parse { .. }
        ));
    }
}
