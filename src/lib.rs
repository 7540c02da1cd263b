//! snexport library - flattened export of reconstructed detector events.
//!
//! A banked source event ([`source::EventRecord`]) is mapped by the
//! [`exporter::EventExporter`] onto a flat [`export::ExportEvent`] under a
//! topic bitmask, then written by a sink: line-oriented text records or one
//! row per event in a Parquet table.
//!
//! # Modules
//!
//! - [`export`] - flattened record model and schema registry
//! - [`source`] - source event model, property bags and geometry
//! - [`exporter`] - topic flags, geometry index resolver and the mapper
//! - [`branch`] - typed column descriptors for the columnar sink
//! - [`text`] / [`parquet`] - the two output formats
//! - [`output`] - format-agnostic sink trait
//! - [`processing`] - export module with output file rotation
//!
//! # Example
//!
//! ```no_run
//! use snexport::exporter::EventExporter;
//! use snexport::export::ExportEvent;
//! use snexport::source::{EventRecord, GeometrySetup, Properties};
//! use snexport::text::TextEventWriter;
//!
//! let geometry = GeometrySetup::snemo();
//! let mut exporter = EventExporter::new();
//! exporter.set_geom_manager(&geometry)?;
//! exporter.initialize(&Properties::new())?;
//!
//! let mut ee = ExportEvent::new();
//! exporter.run(&EventRecord::new(), &mut ee)?;
//! print!("{}", TextEventWriter::new(false).render(&ee, exporter.export_flags())?);
//! # Ok::<(), snexport::error::ExportError>(())
//! ```

pub mod branch;
pub mod error;
pub mod export;
pub mod exporter;
pub mod output;
pub mod parquet;
pub mod processing;
pub mod source;
pub mod text;

// Re-export for convenience
pub use error::{ExportError, Result};
pub use export::ExportEvent;
pub use exporter::{EventExporter, ExportFlags};
pub use processing::{ExportModule, ProcessStatus, Services};
