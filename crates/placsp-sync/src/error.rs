//! Error types for the sync pipeline

use std::path::PathBuf;
use thiserror::Error;

/// A feed page could not be turned into records; fatal for that page's chain only
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read feed page {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed feed page {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Feed page {path} has an entry without a valid <{field}>")]
    MissingField { path: PathBuf, field: &'static str },
}

impl DecodeError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            DecodeError::Io { path, .. }
            | DecodeError::Malformed { path, .. }
            | DecodeError::MissingField { path, .. } => path,
        }
    }
}

/// Appending rows to the output failed; the run cannot continue
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table '{0}' is not part of this workbook")]
    UnknownTable(String),

    #[error("Sink lock poisoned by a panicking writer")]
    Poisoned,
}

/// Errors raised while preparing a channel's source files
#[derive(Error, Debug)]
pub enum AccumulateError {
    #[error("No baseline feed file left for channel {channel} in {dir}")]
    MissingBaseline { channel: String, dir: PathBuf },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },
}

/// Run-level failures; per-source problems never surface here
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Tombstone tracker lock poisoned by a panicking worker")]
    TrackerPoisoned,
}
