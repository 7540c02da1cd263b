//! Columnar sink: event columns and the Parquet table they are written to.

pub mod event;
pub mod writer;

pub use event::ColumnarExportEvent;
pub use writer::{ColumnSpec, ParquetTable, DEFAULT_FLUSH_ROWS};
