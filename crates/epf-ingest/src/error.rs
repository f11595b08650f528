//! Error types for parsing, conversion and the sync pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::ais::{ProductFamily, RecordType};

/// Result type alias for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown record type '{tag}' for {family}")]
    UnknownRecordType { family: ProductFamily, tag: char },

    /// A record of another type reached an emitter bound to `expected`
    #[error("Schema mismatch: emitter expects '{expected}' records, got '{found}'")]
    SchemaMismatch { expected: RecordType, found: char },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Problem unpacking downloaded file: {0}")]
    Extraction(String),

    #[error("Error applying statements: {0}")]
    Apply(String),

    #[error("Error sending report: {0}")]
    Notify(String),

    #[error(transparent)]
    Client(#[from] epf_client::EpfError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn apply(msg: impl Into<String>) -> Self {
        Self::Apply(msg.into())
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Extraction(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        Self::Apply(err.to_string())
    }
}
