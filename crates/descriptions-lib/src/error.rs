//! Error taxonomy for the sync pipeline.
//!
//! Every variant is fatal: nothing in the pipeline recovers locally. A failed run
//! leaves the next run to redo whatever the hash comparisons say is still missing.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A reconcile was handed data describing a different artifact than the stored record.
    #[error("Identity mismatch on {field}: stored {existing:?}, incoming {incoming:?}")]
    IdentityMismatch {
        field: &'static str,
        existing: String,
        incoming: String,
    },

    #[error("{path:?} META-INF/versions.list names {count} versions, expected one:\n---\n{listing}\n---")]
    MultiVersionBundle {
        path: PathBuf,
        count: usize,
        listing: String,
    },

    #[error("{path:?} is not a usable bundle: {reason}")]
    InvalidBundle { path: PathBuf, reason: String },

    #[error("Mapping conversion of {input:?} failed with exit code {code:?}: {stderr}")]
    Conversion {
        input: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("No release time known for version {version}")]
    NotFound { version: String },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("`git {command}` failed with exit code {code:?}: {stderr}")]
    SourceControl {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
