//! XML documents, rendered as an indented element outline.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::models::RawRecord;

use super::{file_name, read_source};

#[derive(Debug, Default)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    /// Text before the first child element.
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn count(&self) -> usize {
        1 + self.children.iter().map(Element::count).sum::<usize>()
    }

    fn render(&self, level: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(level);
        if self.attrs.is_empty() {
            lines.push(format!("{}<{}>", indent, self.tag));
        } else {
            let attrs: Vec<String> = self
                .attrs
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, v))
                .collect();
            lines.push(format!("{}<{} {}>", indent, self.tag, attrs.join(" ")));
        }

        let text = self.text.trim();
        if !text.is_empty() {
            lines.push(format!("{}  {}", indent, text));
        }

        for child in &self.children {
            child.render(level + 1, lines);
        }

        lines.push(format!("{}</{}>", indent, self.tag));
    }
}

pub fn load_xml_file(path: &Path) -> Result<Vec<RawRecord>> {
    let bytes = read_source(path)?;
    let root = parse_tree(&bytes).map_err(|e| Error::parse("XML", path, e))?;

    let mut lines = Vec::new();
    root.render(0, &mut lines);

    Ok(vec![RawRecord::new(lines.join("\n"), &file_name(path), "xml")
        .with("root_tag", root.tag.clone())
        .with("element_count", root.count())])
}

fn open_element(e: &BytesStart<'_>) -> std::result::Result<Element, String> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(|e| e.to_string())?.to_string();
        attrs.push((key, value));
    }
    Ok(Element {
        tag: String::from_utf8_lossy(e.name().as_ref()).to_string(),
        attrs,
        ..Default::default()
    })
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => return Err("multiple root elements".to_string()),
        None => *root = Some(element),
    }
    Ok(())
}

/// Build the element tree, rejecting anything that is not exactly one
/// well-formed root element.
fn parse_tree(xml: &[u8]) -> std::result::Result<Element, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err("multiple root elements".to_string());
                }
                stack.push(open_element(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = open_element(&e)?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or("unexpected closing tag")?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(te)) => {
                let text = te.unescape().map_err(|e| e.to_string())?;
                match stack.last_mut() {
                    Some(current) if current.children.is_empty() => current.text.push_str(&text),
                    Some(_) => {}
                    None if text.trim().is_empty() => {}
                    None => return Err("text outside the root element".to_string()),
                }
            }
            Ok(Event::CData(cd)) => {
                if let Some(current) = stack.last_mut() {
                    if current.children.is_empty() {
                        current.text.push_str(&String::from_utf8_lossy(&cd));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.tag));
    }
    root.ok_or_else(|| "no root element".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn renders_indented_outline() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            tmp.path(),
            "catalog.xml",
            r#"<?xml version="1.0"?>
<catalog region="eu">
  <book id="b1" lang="en">
    <title>Cell &amp; Tissue</title>
  </book>
  <empty/>
</catalog>"#,
        );
        let records = load_xml_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(
            rec.content,
            "<catalog region=\"eu\">\n\
             \x20 <book id=\"b1\" lang=\"en\">\n\
             \x20   <title>\n\
             \x20     Cell & Tissue\n\
             \x20   </title>\n\
             \x20 </book>\n\
             \x20 <empty>\n\
             \x20 </empty>\n\
             </catalog>"
        );
        assert_eq!(rec.metadata["root_tag"], "catalog");
        assert_eq!(rec.metadata["element_count"], 4);
        assert_eq!(rec.kind(), Some("xml"));
    }

    #[test]
    fn malformed_documents_are_parse_errors() {
        let tmp = TempDir::new().unwrap();
        for (name, body) in [
            ("mismatch.xml", "<a><b></a></b>"),
            ("unclosed.xml", "<a><b></b>"),
            ("empty.xml", ""),
            ("two_roots.xml", "<a/><b/>"),
        ] {
            let path = write(tmp.path(), name, body);
            assert!(
                matches!(load_xml_file(&path).unwrap_err(), Error::Parse { .. }),
                "{}",
                name
            );
        }
    }
}
