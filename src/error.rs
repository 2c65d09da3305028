//! Crate-wide error type
//!
//! Errors from the analysis pipeline are caught at the job boundary and
//! stored on the analysis record as a plain string, so every variant's
//! `Display` output is written to read well in a status response.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::db::{AnalysisStatus, DbError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Database(#[from] DbError),

    #[error("invalid archive: {0}")]
    Archive(String),

    #[error("No C/C++ source files found in the uploaded archive")]
    NoSources,

    #[error("failed to launch {tool}: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {}s", .after.as_secs())]
    Timeout { tool: String, after: Duration },

    #[error("analysis {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: AnalysisStatus,
        to: AnalysisStatus,
    },

    #[error("analysis not found: {0}")]
    NotFound(String),

    #[error("failed to write report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Archive(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
