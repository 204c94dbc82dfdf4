//! Error taxonomy for the pipeline.
//!
//! Field-level defects never surface here: they degrade to sentinels inside
//! the normalizer and are only visible in the log stream. This enum covers
//! the failures that abort a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    /// A required input column is absent from the batch schema entirely.
    #[error("required field '{field}' missing from the batch schema")]
    Schema { field: &'static str },

    /// Nothing survived the transform phase.
    #[error("no records remained after transformation")]
    EmptyDataset,

    /// The warehouse could not be opened.
    #[error("failed to open warehouse at {path}: {source}")]
    Connection {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Unexpected storage failure that escaped a phase.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Input file could not be read as delimited text.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
