//! Error taxonomy for the submission pipeline
//!
//! Formatter-level errors abort a single folder; connection-setup errors
//! (`MissingCredentials`, `ExternalStore` during connect) abort the whole
//! submission before any folder is processed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// No timestamp pattern could be found in a folder or file name.
    #[error("no timestamp found in '{0}'")]
    MalformedTimestamp(String),

    /// File extension outside of json/csv/xlsx/xlsm.
    #[error("unsupported file format: .{extension}")]
    UnsupportedFormat { extension: String },

    /// The file exists but could not be read or parsed (missing sheet,
    /// malformed content, unreadable cell).
    #[error("failed to read {}: {reason}", .path.display())]
    FileRead { path: PathBuf, reason: String },

    /// Neither a file nor a directory exists at the resolved location.
    #[error("file or folder not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// A required object-store credential field is blank.
    #[error("missing object-store credentials: {0}")]
    MissingCredentials(&'static str),

    /// The bucket could not be reached or accessed before uploading.
    #[error("bucket '{bucket}' not accessible: {reason}")]
    BucketUnreachable { bucket: String, reason: String },

    /// Any failure surfaced by the metadata-store or object-store client.
    #[error("external store error: {0}")]
    ExternalStore(String),

    /// A folder-level failure tagged with the pipeline stage it happened in.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<SubmitError>,
    },
}

impl SubmitError {
    /// Wrap a collaborator failure, keeping only its display form.
    pub fn external(err: impl std::fmt::Display) -> Self {
        SubmitError::ExternalStore(err.to_string())
    }

    /// Tag this error with the pipeline stage that produced it.
    pub fn at_stage(self, stage: &'static str) -> Self {
        SubmitError::Stage {
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T, E = SubmitError> = std::result::Result<T, E>;
