//! Row-at-a-time Parquet table writer.
//!
//! Rows are accumulated column by column and written as one record batch
//! every `flush_rows` rows, so each flush lands in the file as a new row
//! group. Array columns are stored as `List<item>` of their primitive type.
//!
//! `ParquetTable` is NOT thread-safe. Use from a single thread.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    Int8Array, ListArray, RecordBatch, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, info};

use crate::branch::Buffer;
use crate::error::{ExportError, Result};
use crate::export::constants::TABLE_NAME;
use crate::export::schema::CType;

/// Default number of rows buffered before a row group is written.
pub const DEFAULT_FLUSH_ROWS: usize = 1_000;

/// Schema metadata key holding the table name.
pub const TABLE_NAME_KEY: &str = "table";
/// Field metadata key holding the unit of a column.
pub const UNIT_KEY: &str = "unit";

/// Declaration of one table column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub ctype: CType,
    pub array: bool,
    pub unit: Option<String>,
}

pub fn arrow_type(ctype: CType) -> DataType {
    match ctype {
        CType::Bool => DataType::Boolean,
        CType::Char => DataType::Int8,
        CType::UChar => DataType::UInt8,
        CType::Int16 => DataType::Int16,
        CType::UInt16 => DataType::UInt16,
        CType::Int32 => DataType::Int32,
        CType::UInt32 => DataType::UInt32,
        CType::Int64 => DataType::Int64,
        CType::UInt64 => DataType::UInt64,
        CType::Float => DataType::Float32,
        CType::Double => DataType::Float64,
    }
}

fn item_field(ctype: CType) -> FieldRef {
    Arc::new(Field::new("item", arrow_type(ctype), false))
}

/// Arrow schema of the table: one field per column, units as field metadata.
pub fn table_schema(columns: &[ColumnSpec]) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| {
            let data_type = if c.array {
                DataType::List(item_field(c.ctype))
            } else {
                arrow_type(c.ctype)
            };
            let field = Field::new(&c.name, data_type, false);
            match &c.unit {
                Some(unit) => field.with_metadata(HashMap::from([(
                    UNIT_KEY.to_string(),
                    unit.clone(),
                )])),
                None => field,
            }
        })
        .collect();
    let metadata = HashMap::from([(TABLE_NAME_KEY.to_string(), TABLE_NAME.to_string())]);
    Arc::new(Schema::new_with_metadata(fields, metadata))
}

fn buffer_array(buffer: &Buffer) -> ArrayRef {
    match buffer {
        Buffer::Bool(v) => Arc::new(BooleanArray::from(v.clone())),
        Buffer::Char(v) => Arc::new(Int8Array::from(v.clone())),
        Buffer::UChar(v) => Arc::new(UInt8Array::from(v.clone())),
        Buffer::Int16(v) => Arc::new(Int16Array::from(v.clone())),
        Buffer::UInt16(v) => Arc::new(UInt16Array::from(v.clone())),
        Buffer::Int32(v) => Arc::new(Int32Array::from(v.clone())),
        Buffer::UInt32(v) => Arc::new(UInt32Array::from(v.clone())),
        Buffer::Int64(v) => Arc::new(Int64Array::from(v.clone())),
        Buffer::UInt64(v) => Arc::new(UInt64Array::from(v.clone())),
        Buffer::Float(v) => Arc::new(Float32Array::from(v.clone())),
        Buffer::Double(v) => Arc::new(Float64Array::from(v.clone())),
    }
}

/// Pending values of one column.
struct PendingColumn {
    ctype: CType,
    values: Buffer,
    /// Element count of each pending row, for array columns.
    lengths: Option<Vec<usize>>,
}

impl PendingColumn {
    fn new(spec: &ColumnSpec) -> Self {
        Self {
            ctype: spec.ctype,
            values: Buffer::new(spec.ctype),
            lengths: spec.array.then(Vec::new),
        }
    }

    fn push(&mut self, row: &Buffer) -> Result<()> {
        if let Some(lengths) = &mut self.lengths {
            lengths.push(row.len());
        }
        self.values.extend_from(row)
    }

    fn take_array(&mut self) -> Result<ArrayRef> {
        let values = buffer_array(&self.values);
        self.values.clear();
        match &mut self.lengths {
            None => Ok(values),
            Some(lengths) => {
                let offsets = OffsetBuffer::<i32>::from_lengths(lengths.drain(..));
                let list = ListArray::try_new(item_field(self.ctype), offsets, values, None)?;
                Ok(Arc::new(list))
            }
        }
    }
}

/// A single-table Parquet file written one row at a time.
pub struct ParquetTable {
    path: PathBuf,
    schema: SchemaRef,
    writer: ArrowWriter<File>,
    columns: Vec<PendingColumn>,
    flush_rows: usize,
    pending_rows: usize,
    total_rows: usize,
}

impl ParquetTable {
    /// Create the file and write its schema.
    pub fn create(path: &Path, columns: &[ColumnSpec], flush_rows: usize) -> Result<Self> {
        let schema = table_schema(columns);
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(Default::default()))
            .build();
        let file = File::create(path)?;
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        info!(path = %path.display(), columns = columns.len(), "opened parquet table");
        Ok(Self {
            path: path.to_path_buf(),
            schema,
            writer,
            columns: columns.iter().map(PendingColumn::new).collect(),
            flush_rows: flush_rows.max(1),
            pending_rows: 0,
            total_rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Rows appended so far, written or pending.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Append one row; `row` yields one buffer per column in declaration order.
    pub fn append_row<'a>(&mut self, row: impl IntoIterator<Item = &'a Buffer>) -> Result<()> {
        let mut count = 0;
        for (column, values) in self.columns.iter_mut().zip(row) {
            column.push(values)?;
            count += 1;
        }
        if count != self.columns.len() {
            return Err(ExportError::SchemaMismatch(format!(
                "row holds {count} columns, table '{}' declares {}",
                self.path.display(),
                self.columns.len()
            )));
        }
        self.pending_rows += 1;
        self.total_rows += 1;
        if self.pending_rows >= self.flush_rows {
            self.flush()?;
        }
        Ok(())
    }

    /// Write pending rows as one record batch.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending_rows == 0 {
            return Ok(());
        }
        let arrays = self
            .columns
            .iter_mut()
            .map(PendingColumn::take_array)
            .collect::<Result<Vec<_>>>()?;
        let batch = RecordBatch::try_new(self.schema.clone(), arrays)?;
        self.writer.write(&batch)?;
        self.writer.flush()?;
        debug!(rows = self.pending_rows, "flushed parquet row group");
        self.pending_rows = 0;
        Ok(())
    }

    /// Flush pending rows and write the file footer.
    pub fn finish(mut self) -> Result<()> {
        let flush_result = self.flush();
        let close_result = self.writer.close().map(|_| ()).map_err(ExportError::from);
        info!(path = %self.path.display(), rows = self.total_rows, "closed parquet table");
        flush_result?;
        close_result
    }
}
