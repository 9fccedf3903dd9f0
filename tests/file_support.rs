//! Multi-format loading through the public loader API.
//!
//! One well-formed sample per format is generated into a temp directory and
//! loaded in a single batch; every record must carry the file name as
//! `source` and the format tag as `type`. Broken files are skipped without
//! aborting the batch.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use docqa::config::DatabaseConfig;
use docqa::loaders::{load_directory, load_file};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::ConnectOptions;
use tempfile::TempDir;

fn zip_of(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, body) in parts {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

fn docx_sample() -> Vec<u8> {
    let xml = format!(
        r#"<?xml version="1.0"?><w:document xmlns:w="{W_NS}"><w:body>
<w:p><w:r><w:t>Photosynthesis converts light into chemical energy.</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Stage</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Site</w:t></w:r></w:p></w:tc></w:tr>
<w:tr><w:tc><w:p><w:r><w:t>Light</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Thylakoid</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#
    );
    zip_of(&[("word/document.xml", &xml)])
}

fn slide(text: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><p:sld xmlns:p="{P_NS}" xmlns:a="{A_NS}"><p:cSld><p:spTree>
<p:sp><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:sld>"#
    )
}

fn pptx_sample() -> Vec<u8> {
    let s1 = slide("Cell Biology");
    let s2 = slide("Mitochondria are the powerhouse of the cell");
    zip_of(&[("ppt/slides/slide1.xml", &s1), ("ppt/slides/slide2.xml", &s2)])
}

fn csv_sample() -> String {
    let mut out = String::from("species,legs\n");
    for i in 0..60 {
        out.push_str(&format!("bug{},{}\n", i, 6 + i % 3));
    }
    out
}

/// Two-page PDF: text on page one, an empty content stream on page two.
/// Objects are laid out first so the xref can point at their byte offsets.
fn two_page_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 5 0 R /Resources << /Font << /F1 7 0 R >> >> >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 6 0 R /Resources << /Font << /F1 7 0 R >> >> >>".to_string(),
        format!("<< /Length {} >> stream\n{}\nendstream", content.len(), content),
        "<< /Length 0 >> stream\n\nendstream".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!("trailer << /Size {} /Root 1 0 R >>\nstartxref\n", objects.len() + 1).as_bytes(),
    );
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

async fn create_sqlite(path: &Path) {
    let mut conn = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
        .unwrap()
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete)
        .connect()
        .await
        .unwrap();
    sqlx::query("CREATE TABLE elements (symbol TEXT, number INTEGER, mass REAL)")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::query("INSERT INTO elements VALUES ('H', 1, 1.008), ('He', 2, 4.0026), ('Li', 3, NULL)")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE notes (body TEXT)")
        .execute(&mut conn)
        .await
        .unwrap();
    drop(conn);
}

async fn sample_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a_notes.txt"), "Plain notes about osmosis.").unwrap();
    fs::write(dir.join("b_readme.md"), "# Readme\n\nMarkdown body.").unwrap();
    fs::write(dir.join("c_report.docx"), docx_sample()).unwrap();
    fs::write(dir.join("d_deck.pptx"), pptx_sample()).unwrap();
    fs::write(
        dir.join("e_data.json"),
        r#"{"name": "lab", "samples": [1, 2, 3], "meta": {"owner": "ana"}}"#,
    )
    .unwrap();
    fs::write(
        dir.join("f_catalog.xml"),
        r#"<catalog><book id="1"><title>Genetics</title></book></catalog>"#,
    )
    .unwrap();
    fs::write(dir.join("g_table.csv"), csv_sample()).unwrap();
    create_sqlite(&dir.join("h_chem.db")).await;
    tmp
}

#[tokio::test]
async fn every_format_yields_tagged_records() {
    let tmp = sample_dir().await;
    let report = load_directory(tmp.path(), &DatabaseConfig::default()).await;

    assert!(report.failures.is_empty(), "failures: {:?}", report.failures);
    assert_eq!(report.loaded.len(), 8);

    let expected = [
        ("a_notes.txt", "text"),
        ("b_readme.md", "text"),
        ("c_report.docx", "docx"),
        ("d_deck.pptx", "pptx"),
        ("e_data.json", "json"),
        ("f_catalog.xml", "xml"),
        ("g_table.csv", "csv"),
    ];
    for (source, kind) in expected {
        let record = report
            .records
            .iter()
            .find(|r| r.source() == Some(source))
            .unwrap_or_else(|| panic!("no record for {}", source));
        assert_eq!(record.kind(), Some(kind), "{}", source);
        assert!(!record.content.trim().is_empty(), "{}", source);
    }

    let tables: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.kind() == Some("database_table"))
        .collect();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].source(), Some("h_chem.db::elements"));
    assert_eq!(tables[1].source(), Some("h_chem.db::notes"));
    assert!(tables[0].content.contains("symbol: Li | number: 3 | mass: NULL"));
}

#[tokio::test]
async fn format_specific_content() {
    let tmp = sample_dir().await;
    let db = DatabaseConfig::default();

    let docx = load_file(&tmp.path().join("c_report.docx"), &db).await.unwrap();
    assert!(docx[0].content.contains("TABLE:\nStage | Site\nLight | Thylakoid"));

    let pptx = load_file(&tmp.path().join("d_deck.pptx"), &db).await.unwrap();
    assert_eq!(pptx.len(), 2);
    assert_eq!(pptx[1].metadata["slide"], 2);
    assert_eq!(pptx[1].metadata["total_slides"], 2);

    let csv = load_file(&tmp.path().join("g_table.csv"), &db).await.unwrap();
    let content = &csv[0].content;
    assert_eq!(content.lines().filter(|l| l.starts_with("Row ")).count(), 50);
    assert!(content.contains("... and 10 more rows"));
    assert!(content.contains("DATASET SUMMARY:"));
    assert!(content.contains("Min: 6"));

    let xml = load_file(&tmp.path().join("f_catalog.xml"), &db).await.unwrap();
    assert_eq!(xml[0].metadata["root_tag"], "catalog");
    assert!(xml[0].content.contains("<book id=\"1\">"));
}

#[tokio::test]
async fn pdf_keeps_text_pages_only() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("osmosis.pdf");
    fs::write(&path, two_page_pdf("Osmosis moves water across membranes")).unwrap();

    let records = load_file(&path, &DatabaseConfig::default()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source(), Some("osmosis.pdf"));
    assert_eq!(records[0].kind(), Some("pdf"));
    assert_eq!(records[0].metadata["page"], 1);
    assert!(records[0].content.contains("Osmosis moves water"));

    let report = load_directory(tmp.path(), &DatabaseConfig::default()).await;
    assert!(report.failures.is_empty(), "failures: {:?}", report.failures);
    assert_eq!(report.loaded, vec![("osmosis.pdf".to_string(), 1)]);
}

#[tokio::test]
async fn broken_files_are_skipped() {
    let tmp = sample_dir().await;
    fs::write(tmp.path().join("x_broken.pdf"), b"not a valid pdf").unwrap();
    fs::write(tmp.path().join("y_broken.docx"), b"not a zip").unwrap();
    fs::write(tmp.path().join("z_broken.xml"), "<a><b></a>").unwrap();
    fs::write(tmp.path().join("ignored.png"), [0u8; 8]).unwrap();

    let report = load_directory(tmp.path(), &DatabaseConfig::default()).await;
    assert_eq!(report.loaded.len(), 8);
    let failed: Vec<&str> = report.failures.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(failed, vec!["x_broken.pdf", "y_broken.docx", "z_broken.xml"]);
    assert_eq!(report.ignored, 1);
}

#[tokio::test]
async fn missing_directory_warns() {
    let tmp = TempDir::new().unwrap();
    let report = load_directory(&tmp.path().join("absent"), &DatabaseConfig::default()).await;
    assert!(report.records.is_empty());
    assert!(report.warning.is_some());
}
