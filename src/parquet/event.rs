//! Columnar export event: column construction, per-row materialization and
//! binding to a Parquet table.
//!
//! Lifecycle: [`construct`](ColumnarExportEvent::construct) once, then
//! [`setup_table`](ColumnarExportEvent::setup_table) per output file, then per
//! event [`fill_memory`](ColumnarExportEvent::fill_memory) and
//! [`commit_row`](ColumnarExportEvent::commit_row). Columns are detached
//! before the table is finished.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, trace};

use super::writer::{ColumnSpec, ParquetTable};
use crate::branch::{BranchEntry, BranchManager, SIZE_SUFFIX, VERSION_SUFFIX};
use crate::error::{ExportError, Result};
use crate::export::constants::TopicLevel;
use crate::export::event::BANKS;
use crate::export::schema::Value;
use crate::export::ExportEvent;
use crate::exporter::flags::ExportFlags;

#[derive(Debug, Default)]
pub struct ColumnarExportEvent {
    store_bits: ExportFlags,
    constructed: bool,
    branches: BranchManager,
    /// Indices of the bound columns, in table order.
    bound: Vec<usize>,
}

impl ColumnarExportEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    pub fn store_bits(&self) -> ExportFlags {
        self.store_bits
    }

    pub fn branches(&self) -> &BranchManager {
        &self.branches
    }

    /// Declare the columns of every bank selected by `store_bits`.
    pub fn construct(
        &mut self,
        store_bits: ExportFlags,
        topics: &BTreeMap<String, TopicLevel>,
    ) -> Result<()> {
        if self.constructed {
            return Err(ExportError::Config(
                "columns are already constructed".to_string(),
            ));
        }
        self.store_bits = store_bits;
        for (label, level) in topics {
            self.branches.add_topic(label, *level)?;
        }
        for spec in BANKS.iter().filter(|b| b.columnar) {
            if store_bits.contains(spec.store_bit) {
                self.branches.init_bank(spec)?;
            }
        }
        self.constructed = true;
        debug!(
            bits = %store_bits,
            columns = self.branches.len(),
            active = self.branches.active_count(),
            "constructed export columns"
        );
        Ok(())
    }

    /// Declarations of the columns bound by [`setup_table`](Self::setup_table).
    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        self.branches
            .entries()
            .iter()
            .filter(|e| e.is_activated())
            .map(|e| ColumnSpec {
                name: e.name().to_string(),
                ctype: e.ctype(),
                array: e.is_array(),
                unit: (!e.unit().is_empty()).then(|| e.unit().to_string()),
            })
            .collect()
    }

    /// Bind every activated column to a new table at `path`.
    pub fn setup_table(&mut self, path: &Path, flush_rows: usize) -> Result<ParquetTable> {
        if !self.constructed {
            return Err(ExportError::Config(
                "columns must be constructed before a table is set up".to_string(),
            ));
        }
        if !self.bound.is_empty() {
            return Err(ExportError::Config(
                "columns are still bound to a table".to_string(),
            ));
        }
        let specs = self.column_specs();
        let table = ParquetTable::create(path, &specs, flush_rows)?;
        for (i, entry) in self.branches.entries_mut().iter_mut().enumerate() {
            if entry.is_activated() {
                entry.bind()?;
                self.bound.push(i);
            }
        }
        Ok(table)
    }

    /// Copy the values of `ee` into the column buffers.
    pub fn fill_memory(&mut self, ee: &ExportEvent) -> Result<()> {
        let store_bits = self.store_bits;
        for entry in self.branches.entries_mut() {
            if !entry.store_bit().intersects(store_bits) {
                trace!(column = entry.name(), "column is not stored");
                continue;
            }
            fill_branch_memory(entry, ee)?;
        }
        Ok(())
    }

    /// Append the current buffers to `table` as one row.
    pub fn commit_row(&self, table: &mut ParquetTable) -> Result<()> {
        let entries = self.branches.entries();
        table.append_row(self.bound.iter().map(|&i| entries[i].buffer()))
    }

    pub fn detach_branches(&mut self) {
        for entry in self.branches.entries_mut() {
            entry.detach();
        }
        self.bound.clear();
    }

    pub fn print<W: fmt::Write>(&self, out: &mut W, title: &str, indent: &str) -> fmt::Result {
        if !title.is_empty() {
            writeln!(out, "{indent}{title}:")?;
        }
        let entries = self.branches.entries();
        for (i, entry) in entries.iter().enumerate() {
            let (tag, tag2) = if i + 1 == entries.len() {
                ("`-- ", "    ")
            } else {
                ("|-- ", "|   ")
            };
            writeln!(out, "{indent}{tag}Branch '{}'", entry.name())?;
            entry.print(out, "", &format!("{indent}{tag2}"))?;
        }
        Ok(())
    }

    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ColumnarExportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, "Columnar export event", "")
    }
}

fn schema_mismatch(entry: &BranchEntry, what: &str) -> ExportError {
    ExportError::SchemaMismatch(format!("column '{}': {what}", entry.name()))
}

/// Materialize one column from the container.
fn fill_branch_memory(entry: &mut BranchEntry, ee: &ExportEvent) -> Result<()> {
    if entry.is_inhibited() {
        return Ok(());
    }
    let name = entry.name();
    if name.ends_with(VERSION_SUFFIX) {
        return Ok(());
    }
    if let Some(bank) = name.strip_suffix(SIZE_SUFFIX) {
        let view = ee
            .bank(bank)
            .ok_or_else(|| schema_mismatch(entry, "no container bank for size column"))?;
        let size = view.len() as u32;
        return entry.set_value(Value::UInt32(size), 0);
    }

    let view = ee
        .bank(entry.parent_name())
        .ok_or_else(|| schema_mismatch(entry, "no container bank for parent"))?;
    let leaf = entry
        .leaf_index()
        .ok_or_else(|| schema_mismatch(entry, "no leaf declared"))?;

    if entry.is_array() {
        let size = view.len();
        entry.set_size(size as u32)?;
        for rank in 0..size {
            let value = view
                .value(rank, leaf)
                .ok_or_else(|| schema_mismatch(entry, "leaf is not in the record schema"))?;
            entry.set_value(value, rank)?;
        }
    } else {
        let value = view
            .value(0, leaf)
            .ok_or_else(|| schema_mismatch(entry, "leaf is not in the record schema"))?;
        entry.set_value(value, 0)?;
    }
    Ok(())
}
