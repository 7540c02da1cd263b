//! Source side of the export: event records, property bags and geometry.
//!
//! - [`properties`]: flat key/value bags for configuration and auxiliaries
//! - [`geom`]: geometry identifiers, category catalogue, geometry manager
//! - [`data`]: the banked event record read by the exporter

pub mod data;
pub mod geom;
pub mod properties;

pub use data::{Bank, EventRecord};
pub use geom::{CategoryInfo, GeomId, GeometryManager, GeometrySetup, IdManager};
pub use properties::{Properties, PropertyValue};
