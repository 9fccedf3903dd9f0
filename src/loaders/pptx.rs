//! PowerPoint decks (`.pptx`), one record per slide with text.

use std::path::Path;

use quick_xml::events::Event;

use crate::error::Result;
use crate::models::RawRecord;

use super::ooxml::{unescaped, Package, TableBuilder};
use super::{file_name, read_source};

pub fn load_pptx_file(path: &Path) -> Result<Vec<RawRecord>> {
    let bytes = read_source(path)?;
    let mut package = Package::open(&bytes, path, "PPTX")?;
    let slides = package.numbered_parts("ppt/slides/slide", ".xml");
    let total = slides.len();
    let source = file_name(path);

    let mut records = Vec::new();
    for (i, name) in slides.iter().enumerate() {
        let xml = package.read(name)?;
        let blocks = parse_slide(&xml).map_err(|e| package.error(format!("{}: {}", name, e)))?;
        if blocks.is_empty() {
            continue;
        }
        records.push(
            RawRecord::new(blocks.join("\n\n"), &source, "pptx")
                .with("slide", i + 1)
                .with("total_slides", total),
        );
    }
    Ok(records)
}

/// Text blocks of one slide in document order: one per shape with text,
/// one `TABLE:` block per table.
fn parse_slide(xml: &[u8]) -> std::result::Result<Vec<String>, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut blocks = Vec::new();
    let mut shape: Option<Vec<String>> = None;
    let mut table: Option<TableBuilder> = None;
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" => shape = Some(Vec::new()),
                b"tbl" => table = Some(TableBuilder::default()),
                b"tr" => {
                    if let Some(t) = table.as_mut() {
                        t.start_row();
                    }
                }
                b"tc" => {
                    if let Some(t) = table.as_mut() {
                        t.start_cell();
                    }
                }
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"br" {
                    paragraph.push('\n');
                }
            }
            Event::Text(te) if in_text => paragraph.push_str(&unescaped(&te)),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = std::mem::take(&mut paragraph);
                    if let Some(t) = table.as_mut() {
                        t.push_paragraph(&text);
                    } else if let Some(s) = shape.as_mut() {
                        s.push(text);
                    }
                }
                b"sp" => {
                    if let Some(paragraphs) = shape.take() {
                        let text = paragraphs.join("\n");
                        if !text.trim().is_empty() {
                            blocks.push(text);
                        }
                    }
                }
                b"tbl" => {
                    if let Some(block) = table.take().and_then(TableBuilder::render) {
                        blocks.push(block);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(blocks)
}
