//! Flattened export model.
//!
//! This module provides the plain row types produced by the exporter and
//! consumed identically by the text and columnar sinks.
//!
//! # Module Organization
//!
//! - [`constants`]: Sentinels, type codes, units and default bank labels
//! - [`schema`]: Field descriptor tables and the process-wide schema registry
//! - [`models`]: Record structs, one per flattened record type
//! - [`event`]: The export container and its bank table

pub mod constants;
pub mod event;
pub mod models;
pub mod schema;

pub use event::{BankSpec, BankView, ExportEvent, BANKS};
pub use models::*;
pub use schema::{registry, CType, ExportRecord, FieldDescriptor, RecordSchema, Value};
