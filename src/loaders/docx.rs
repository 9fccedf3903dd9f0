//! Word documents (`.docx`).
//!
//! Walks `word/document.xml` once. Body paragraphs keep their order; each
//! top-level table is collected into a `TABLE:` block appended after the
//! body text. Paragraphs inside nested tables land in the enclosing cell.

use std::path::Path;

use quick_xml::events::Event;

use crate::error::Result;
use crate::models::RawRecord;

use super::ooxml::{unescaped, Package, TableBuilder};
use super::{file_name, read_source};

const DOCUMENT_PART: &str = "word/document.xml";

/// Load a `.docx` as one record; a document with no text yields none.
pub fn load_docx_file(path: &Path) -> Result<Vec<RawRecord>> {
    let bytes = read_source(path)?;
    let mut package = Package::open(&bytes, path, "DOCX")?;
    let xml = package.read(DOCUMENT_PART)?;
    let body = parse_document(&xml).map_err(|e| package.error(e))?;

    let mut parts: Vec<String> = body
        .paragraphs
        .iter()
        .filter(|p| !p.trim().is_empty())
        .cloned()
        .collect();
    parts.extend(body.tables.iter().cloned());
    let content = parts.join("\n\n");

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![RawRecord::new(content, &file_name(path), "docx")
        .with("paragraphs", body.paragraphs.len())
        .with("tables", body.tables.len())])
}

#[derive(Debug, Default)]
struct DocumentBody {
    /// Every body-level paragraph, blank ones included.
    paragraphs: Vec<String>,
    /// Rendered `TABLE:` blocks, one per top-level table.
    tables: Vec<String>,
}

fn parse_document(xml: &[u8]) -> std::result::Result<DocumentBody, quick_xml::Error> {
    let mut body = DocumentBody::default();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut table_depth = 0usize;
    let mut table = TableBuilder::default();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        table = TableBuilder::default();
                    }
                }
                b"tr" if table_depth == 1 => table.start_row(),
                b"tc" if table_depth == 1 => table.start_cell(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                b"p" if table_depth == 0 => body.paragraphs.push(String::new()),
                b"tc" if table_depth == 1 => table.start_cell(),
                _ => {}
            },
            Event::Text(te) if in_text => paragraph.push_str(&unescaped(&te)),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = std::mem::take(&mut paragraph);
                    if table_depth == 0 {
                        body.paragraphs.push(text);
                    } else {
                        table.push_paragraph(&text);
                    }
                }
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        if let Some(block) = std::mem::take(&mut table).render() {
                            body.tables.push(block);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(body)
}
