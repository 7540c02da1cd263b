//! Column descriptors for the columnar sink.
//!
//! A [`BranchManager`] holds one [`BranchEntry`] per output column, built from
//! the record schema registry bank by bank. Each entry owns a typed buffer
//! holding the values of the row being assembled.

pub mod entry;
pub mod manager;

pub use entry::{BranchEntry, Buffer, ARRAY_NO_FIXED_SIZE};
pub use manager::{size_column, version_column, BranchManager, SIZE_SUFFIX, VERSION_SUFFIX};
