//! Error taxonomy for the export pipeline.
//!
//! Every error here is fatal for the call that raised it: nothing is retried
//! and no partially exported row is kept.

use std::fmt;
use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors raised by the exporter, the column materializer and the sinks.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A mapping or run call was made before `initialize()`.
    #[error("event exporter is not initialized")]
    NotInitialized,

    /// `initialize()` was called twice, or a geometry manager was bound late.
    #[error("event exporter is already initialized")]
    AlreadyInitialized,

    /// `initialize()` was called before any geometry manager was bound.
    #[error("no geometry manager is bound to the event exporter")]
    NoGeometryManager,

    /// The geometry manager does not declare an expected category or axis.
    #[error("geometry category '{category}': {reason}")]
    Geometry { category: String, reason: String },

    /// A source bank required by an enabled topic is absent.
    #[error("missing {kind} bank '{label}'")]
    MissingBank { label: String, kind: &'static str },

    /// A column refers to a record, bank or field the schema does not declare.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A column descriptor was used in a way its declaration forbids.
    #[error("branch '{name}': {reason}")]
    Branch { name: String, reason: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("text formatting failed")]
    Format(#[from] fmt::Error),

    #[error("sink write failed: {0}")]
    SinkIo(#[from] io::Error),

    #[error("parquet sink failed: {0}")]
    Parquet(#[from] ParquetError),

    #[error("arrow batch assembly failed: {0}")]
    Arrow(#[from] ArrowError),
}

impl ExportError {
    pub(crate) fn branch(name: &str, reason: impl Into<String>) -> Self {
        ExportError::Branch {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
