//! Plain text and Markdown.

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::RawRecord;

use super::{file_name, read_source};

/// Load a UTF-8 text file as a single record.
pub fn load_text_file(path: &Path) -> Result<RawRecord> {
    let bytes = read_source(path)?;
    let content = String::from_utf8(bytes).map_err(|e| Error::parse("UTF-8 text", path, e))?;
    Ok(RawRecord::new(content, &file_name(path), "text"))
}
