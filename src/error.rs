//! Error types for txtbook operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building, packaging, patching or downloading.
///
/// Missing images are not errors: the compiler skips them silently.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to read source {}: {reason}", path.display())]
    SourceRead { path: PathBuf, reason: String },

    #[error("failed to package {}: {reason}", path.display())]
    Packaging { path: PathBuf, reason: String },

    #[error("download failed: {0}")]
    Download(String),

    #[error("invalid image URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("unknown text encoding: {0}")]
    UnknownEncoding(String),

    #[error("input is not valid {0}")]
    MalformedText(&'static str),
}

impl Error {
    pub(crate) fn source_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn packaging(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Packaging {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
