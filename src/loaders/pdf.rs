//! PDF, one record per page.

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::RawRecord;

use super::{file_name, read_source};

/// Extract text page by page; pages whose text is blank are skipped.
///
/// Extraction runs on a blocking worker so that a panic inside the PDF
/// library surfaces as a parse error instead of tearing down the batch.
pub async fn load_pdf_file(path: &Path) -> Result<Vec<RawRecord>> {
    let bytes = read_source(path)?;

    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| Error::parse("PDF", path, format!("extractor aborted: {}", e)))?
    .map_err(|e| Error::parse("PDF", path, e))?;

    Ok(page_records(&file_name(path), pages))
}

/// Build one record per non-blank page, numbered from 1.
pub fn page_records(source: &str, pages: Vec<String>) -> Vec<RawRecord> {
    pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| RawRecord::new(text, source, "pdf").with("page", i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn blank_pages_are_skipped() {
        let pages = vec![
            "Parthenogenesis is asexual reproduction.".to_string(),
            "  \n\t ".to_string(),
        ];
        let records = page_records("bio.pdf", pages);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata["page"], 1);
        assert_eq!(records[0].source(), Some("bio.pdf"));
        assert_eq!(records[0].kind(), Some("pdf"));
    }

    #[test]
    fn page_numbers_follow_original_position() {
        let pages = vec![String::new(), "second".to_string(), "third".to_string()];
        let records = page_records("x.pdf", pages);
        let numbers: Vec<u64> = records
            .iter()
            .map(|r| r.metadata["page"].as_u64().unwrap())
            .collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[tokio::test]
    async fn garbage_bytes_are_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.pdf");
        std::fs::write(&path, b"not a valid pdf").unwrap();
        let err = load_pdf_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = load_pdf_file(Path::new("/nonexistent/a.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
