//! Error taxonomy for the ingestion and answering pipeline.
//!
//! Library code returns [`Error`]; the command layer wraps it in
//! `anyhow::Error` with context. Per-file errors are caught by the document
//! loader and never abort a batch; query-time errors are rendered as text by
//! [`crate::answer`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A file or directory the caller asked for does not exist.
    #[error("{} not found", .path.display())]
    NotFound { path: PathBuf },

    /// File bytes are not valid for the format they claim to be.
    #[error("invalid {format} in {}: {message}", .path.display())]
    Parse {
        format: &'static str,
        path: PathBuf,
        message: String,
    },

    /// The vector store (or another backing service) could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The generative model call failed.
    #[error("model error ({kind}): {message}")]
    Model { kind: ModelFailure, message: String },

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn parse(format: &'static str, path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Error::Parse {
            format,
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn model(kind: ModelFailure, message: impl fmt::Display) -> Self {
        Error::Model {
            kind,
            message: message.to_string(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Connection(e.to_string())
    }
}

/// Why a generative model call failed. Rendered in the user-visible
/// model-error message, so the names are short and stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFailure {
    MissingApiKey,
    Disabled,
    QuotaExceeded,
    ModelNotFound,
    Network,
    Http(u16),
    InvalidResponse,
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFailure::MissingApiKey => write!(f, "MissingApiKey"),
            ModelFailure::Disabled => write!(f, "ModelDisabled"),
            ModelFailure::QuotaExceeded => write!(f, "QuotaExceeded"),
            ModelFailure::ModelNotFound => write!(f, "ModelNotFound"),
            ModelFailure::Network => write!(f, "NetworkError"),
            ModelFailure::Http(status) => write!(f, "HttpError {}", status),
            ModelFailure::InvalidResponse => write!(f, "InvalidResponse"),
        }
    }
}
