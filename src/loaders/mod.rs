//! Format adapters and the directory loader.
//!
//! Each adapter turns one file into one or more [`RawRecord`]s whose
//! metadata always carries `source` (file name) and `type` (format tag).
//! [`Format`] maps a file extension to its adapter; [`load_directory`]
//! runs the matching adapter over every file in the ingestion root and
//! isolates per-file failures so one bad upload never aborts a batch.
//!
//! | Extension | Format | Records |
//! |-----------|--------|---------|
//! | `.txt`, `.md` | [`Format::Text`] | one per file |
//! | `.pdf` | [`Format::Pdf`] | one per non-blank page |
//! | `.docx` | [`Format::Docx`] | one per file |
//! | `.pptx` | [`Format::Pptx`] | one per slide with text |
//! | `.json` | [`Format::Json`] | one per file |
//! | `.xml` | [`Format::Xml`] | one per file |
//! | `.csv` | [`Format::Csv`] | one per file |
//! | `.db`, `.sqlite`, `.sqlite3` | [`Format::Database`] | one per table |

pub mod csv;
pub mod database;
pub mod docx;
pub mod json;
mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod text;
pub mod xml;

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::models::RawRecord;

/// Supported input formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Pdf,
    Docx,
    Pptx,
    Json,
    Xml,
    Csv,
    Database,
}

/// Recognized extensions, lowercase and without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "md", "pdf", "docx", "pptx", "json", "xml", "csv", "db", "sqlite", "sqlite3",
];

impl Format {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "md" => Some(Format::Text),
            "pdf" => Some(Format::Pdf),
            "docx" => Some(Format::Docx),
            "pptx" => Some(Format::Pptx),
            "json" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            "csv" => Some(Format::Csv),
            "db" | "sqlite" | "sqlite3" => Some(Format::Database),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// The `type` tag written into record metadata.
    pub fn tag(self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Pptx => "pptx",
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Csv => "csv",
            Format::Database => "database_table",
        }
    }

    /// Run this format's adapter on one file.
    pub async fn load(self, path: &Path, db: &DatabaseConfig) -> Result<Vec<RawRecord>> {
        match self {
            Format::Text => text::load_text_file(path).map(|r| vec![r]),
            Format::Pdf => pdf::load_pdf_file(path).await,
            Format::Docx => docx::load_docx_file(path),
            Format::Pptx => pptx::load_pptx_file(path),
            Format::Json => json::load_json_file(path),
            Format::Xml => xml::load_xml_file(path),
            Format::Csv => csv::load_csv_file(path),
            Format::Database => {
                database::load_database_file(path, db.all_tables_row_limit).await
            }
        }
    }
}

/// Load a single file, choosing the adapter from its extension.
pub async fn load_file(path: &Path, db: &DatabaseConfig) -> Result<Vec<RawRecord>> {
    let format = Format::from_path(path).ok_or_else(|| {
        Error::parse("file", path, "unsupported file extension")
    })?;
    format.load(path, db).await
}

/// A file that failed to load, with the reason.
#[derive(Debug)]
pub struct FileFailure {
    pub file: String,
    pub error: Error,
}

/// Outcome of loading every file in a directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<RawRecord>,
    /// `(file name, records produced)` for each successfully loaded file.
    pub loaded: Vec<(String, usize)>,
    pub failures: Vec<FileFailure>,
    /// Files skipped because their extension is not recognized.
    pub ignored: usize,
    /// Set when the directory is missing or holds no recognized files.
    pub warning: Option<String>,
}

/// Load all recognized files directly inside `dir` (subdirectories skipped).
///
/// Files are visited in name order. A failing file is logged and recorded in
/// [`LoadReport::failures`]; the remaining files are still loaded.
pub async fn load_directory(dir: &Path, db: &DatabaseConfig) -> LoadReport {
    let mut report = LoadReport::default();

    if !dir.is_dir() {
        let msg = format!("Data directory '{}' not found", dir.display());
        warn!("{}", msg);
        report.warning = Some(msg);
        return report;
    }

    for entry in list_files(dir) {
        let name = file_name(&entry);
        let Some(format) = Format::from_path(&entry) else {
            report.ignored += 1;
            continue;
        };

        match format.load(&entry, db).await {
            Ok(records) => {
                info!(file = %name, format = format.tag(), records = records.len(), "loaded");
                report.loaded.push((name, records.len()));
                report.records.extend(records);
            }
            Err(error) => {
                warn!(file = %name, %error, "failed to load file, skipping");
                report.failures.push(FileFailure { file: name, error });
            }
        }
    }

    if report.loaded.is_empty() && report.failures.is_empty() {
        let msg = format!("No documents found in '{}'", dir.display());
        warn!("{}", msg);
        report.warning = Some(msg);
    }

    report
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Read a source file, mapping a missing path to [`Error::NotFound`].
pub(crate) fn read_source(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read(path)?)
}
