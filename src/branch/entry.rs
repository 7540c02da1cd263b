//! Column descriptor with a typed value buffer.

use std::fmt;

use crate::error::{ExportError, Result};
use crate::export::schema::{CType, Value};
use crate::exporter::flags::ExportFlags;

/// `array_fixed_size` value of a variable-length array column.
pub const ARRAY_NO_FIXED_SIZE: u32 = 0;

/// Typed storage of one column, one slot per array rank.
///
/// New slots are filled with the sentinel of the type: `-1` for signed
/// integers, all ones for unsigned integers, NaN for reals, `false` for
/// booleans.
#[derive(Clone, Debug, PartialEq)]
pub enum Buffer {
    Bool(Vec<bool>),
    Char(Vec<i8>),
    UChar(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

macro_rules! with_buffer {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            Buffer::Bool($v) => $body,
            Buffer::Char($v) => $body,
            Buffer::UChar($v) => $body,
            Buffer::Int16($v) => $body,
            Buffer::UInt16($v) => $body,
            Buffer::Int32($v) => $body,
            Buffer::UInt32($v) => $body,
            Buffer::Int64($v) => $body,
            Buffer::UInt64($v) => $body,
            Buffer::Float($v) => $body,
            Buffer::Double($v) => $body,
        }
    };
}

impl Buffer {
    pub fn new(ctype: CType) -> Self {
        match ctype {
            CType::Bool => Buffer::Bool(Vec::new()),
            CType::Char => Buffer::Char(Vec::new()),
            CType::UChar => Buffer::UChar(Vec::new()),
            CType::Int16 => Buffer::Int16(Vec::new()),
            CType::UInt16 => Buffer::UInt16(Vec::new()),
            CType::Int32 => Buffer::Int32(Vec::new()),
            CType::UInt32 => Buffer::UInt32(Vec::new()),
            CType::Int64 => Buffer::Int64(Vec::new()),
            CType::UInt64 => Buffer::UInt64(Vec::new()),
            CType::Float => Buffer::Float(Vec::new()),
            CType::Double => Buffer::Double(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        with_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resize to `len` slots. Existing slots keep their value.
    fn resize(&mut self, len: usize) {
        match self {
            Buffer::Bool(v) => v.resize(len, false),
            Buffer::Char(v) => v.resize(len, -1),
            Buffer::UChar(v) => v.resize(len, u8::MAX),
            Buffer::Int16(v) => v.resize(len, -1),
            Buffer::UInt16(v) => v.resize(len, u16::MAX),
            Buffer::Int32(v) => v.resize(len, -1),
            Buffer::UInt32(v) => v.resize(len, u32::MAX),
            Buffer::Int64(v) => v.resize(len, -1),
            Buffer::UInt64(v) => v.resize(len, u64::MAX),
            Buffer::Float(v) => v.resize(len, f32::NAN),
            Buffer::Double(v) => v.resize(len, f64::NAN),
        }
    }

    /// Replace the contents with `len` sentinel slots.
    fn assign_sentinels(&mut self, len: usize) {
        self.clear();
        self.resize(len);
    }

    /// Store `value` at `rank`, converted to the buffer type.
    fn set(&mut self, rank: usize, value: Value) {
        if rank >= self.len() {
            self.resize(rank + 1);
        }
        match self {
            Buffer::Bool(v) => v[rank] = value.as_bool(),
            Buffer::Char(v) => v[rank] = value.as_i64() as i8,
            Buffer::UChar(v) => v[rank] = value.as_u64() as u8,
            Buffer::Int16(v) => v[rank] = value.as_i64() as i16,
            Buffer::UInt16(v) => v[rank] = value.as_u64() as u16,
            Buffer::Int32(v) => v[rank] = value.as_i64() as i32,
            Buffer::UInt32(v) => v[rank] = value.as_u64() as u32,
            Buffer::Int64(v) => v[rank] = value.as_i64(),
            Buffer::UInt64(v) => v[rank] = value.as_u64(),
            Buffer::Float(v) => v[rank] = value.as_f64() as f32,
            Buffer::Double(v) => v[rank] = value.as_f64(),
        }
    }

    pub fn get(&self, rank: usize) -> Option<Value> {
        with_buffer!(self, v => v.get(rank).map(|x| Value::from(*x)))
    }

    pub fn clear(&mut self) {
        with_buffer!(self, v => v.clear());
    }

    /// Append every value of `other`, which must hold the same type.
    pub fn extend_from(&mut self, other: &Buffer) -> Result<()> {
        match (self, other) {
            (Buffer::Bool(a), Buffer::Bool(b)) => a.extend_from_slice(b),
            (Buffer::Char(a), Buffer::Char(b)) => a.extend_from_slice(b),
            (Buffer::UChar(a), Buffer::UChar(b)) => a.extend_from_slice(b),
            (Buffer::Int16(a), Buffer::Int16(b)) => a.extend_from_slice(b),
            (Buffer::UInt16(a), Buffer::UInt16(b)) => a.extend_from_slice(b),
            (Buffer::Int32(a), Buffer::Int32(b)) => a.extend_from_slice(b),
            (Buffer::UInt32(a), Buffer::UInt32(b)) => a.extend_from_slice(b),
            (Buffer::Int64(a), Buffer::Int64(b)) => a.extend_from_slice(b),
            (Buffer::UInt64(a), Buffer::UInt64(b)) => a.extend_from_slice(b),
            (Buffer::Float(a), Buffer::Float(b)) => a.extend_from_slice(b),
            (Buffer::Double(a), Buffer::Double(b)) => a.extend_from_slice(b),
            _ => {
                return Err(ExportError::SchemaMismatch(
                    "cannot append values of a different type".to_string(),
                ))
            }
        }
        Ok(())
    }
}

/// One output column: identity, type, array shape, activation and buffer.
///
/// Identity and shape may only change before [`lock`](Self::lock); afterwards
/// only the buffer contents and the inhibit flag move.
#[derive(Clone, Debug)]
pub struct BranchEntry {
    name: String,
    parent_name: String,
    leaf_name: String,
    leaf_index: Option<usize>,
    title: String,
    unit: String,
    topic: String,
    store_bit: ExportFlags,
    ctype: CType,
    array: bool,
    array_fixed_size: u32,
    array_size_name: String,
    inhibit: bool,
    locked: bool,
    bound: bool,
    buffer: Buffer,
}

impl BranchEntry {
    pub fn new(name: &str, ctype: CType, array: bool) -> Result<Self> {
        if name.is_empty() {
            return Err(ExportError::branch(name, "empty name is not allowed"));
        }
        let mut buffer = Buffer::new(ctype);
        if !array {
            buffer.assign_sentinels(1);
        }
        Ok(Self {
            name: name.to_string(),
            parent_name: String::new(),
            leaf_name: String::new(),
            leaf_index: None,
            title: String::new(),
            unit: String::new(),
            topic: String::new(),
            store_bit: ExportFlags::NONE,
            ctype,
            array,
            array_fixed_size: ARRAY_NO_FIXED_SIZE,
            array_size_name: String::new(),
            inhibit: false,
            locked: false,
            bound: false,
            buffer,
        })
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(ExportError::branch(&self.name, "entry is locked"));
        }
        Ok(())
    }

    pub fn set_parent_name(&mut self, parent_name: &str) -> Result<&mut Self> {
        self.check_unlocked()?;
        if parent_name.is_empty() {
            return Err(ExportError::branch(&self.name, "empty parent name is not allowed"));
        }
        self.parent_name = parent_name.to_string();
        Ok(self)
    }

    /// Name and declaration index of the record field this column reads.
    pub fn set_leaf(&mut self, leaf_name: &str, leaf_index: usize) -> Result<&mut Self> {
        self.check_unlocked()?;
        if leaf_name.is_empty() {
            return Err(ExportError::branch(&self.name, "empty leaf name is not allowed"));
        }
        self.leaf_name = leaf_name.to_string();
        self.leaf_index = Some(leaf_index);
        Ok(self)
    }

    pub fn set_title(&mut self, title: &str) -> Result<&mut Self> {
        self.check_unlocked()?;
        self.title = title.to_string();
        Ok(self)
    }

    pub fn set_unit(&mut self, unit: &str) -> Result<&mut Self> {
        self.check_unlocked()?;
        self.unit = unit.to_string();
        Ok(self)
    }

    pub fn set_topic(&mut self, topic: &str) -> Result<&mut Self> {
        self.check_unlocked()?;
        self.topic = topic.to_string();
        Ok(self)
    }

    pub fn set_store_bit(&mut self, store_bit: ExportFlags) -> Result<&mut Self> {
        self.check_unlocked()?;
        self.store_bit = store_bit;
        Ok(self)
    }

    pub fn set_array_size_name(&mut self, size_name: &str) -> Result<&mut Self> {
        self.check_unlocked()?;
        if size_name.is_empty() {
            return Err(ExportError::branch(&self.name, "empty size name is not allowed"));
        }
        self.array_size_name = size_name.to_string();
        Ok(self)
    }

    /// Turn the column into an array of exactly `fixed_size` ranks.
    pub fn set_array_fixed_size(&mut self, fixed_size: u32) -> Result<&mut Self> {
        self.check_unlocked()?;
        self.array = true;
        if fixed_size > 0 {
            self.array_fixed_size = fixed_size;
            self.buffer.assign_sentinels(fixed_size as usize);
        }
        Ok(self)
    }

    pub fn set_inhibit(&mut self, inhibit: bool) {
        self.inhibit = inhibit;
    }

    pub fn is_inhibited(&self) -> bool {
        self.inhibit
    }

    pub fn is_activated(&self) -> bool {
        !self.inhibit
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_name(&self) -> &str {
        &self.parent_name
    }

    pub fn leaf_name(&self) -> &str {
        &self.leaf_name
    }

    pub fn leaf_index(&self) -> Option<usize> {
        self.leaf_index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn store_bit(&self) -> ExportFlags {
        self.store_bit
    }

    pub fn ctype(&self) -> CType {
        self.ctype
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn array_fixed_size(&self) -> u32 {
        self.array_fixed_size
    }

    pub fn is_array_fixed_size(&self) -> bool {
        self.array_fixed_size != ARRAY_NO_FIXED_SIZE
    }

    /// Scalars always have a fixed size of one.
    pub fn has_fixed_size(&self) -> bool {
        !self.array || self.is_array_fixed_size()
    }

    pub fn array_size_name(&self) -> &str {
        &self.array_size_name
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn value(&self, rank: usize) -> Option<Value> {
        self.buffer.get(rank)
    }

    /// Store one value. Growing the buffer keeps the ranks already assigned.
    pub fn set_value(&mut self, value: Value, rank: usize) -> Result<()> {
        if self.inhibit {
            return Err(ExportError::branch(&self.name, "entry is inhibited, cannot set value"));
        }
        if !self.locked {
            return Err(ExportError::branch(&self.name, "entry is not locked, cannot set value"));
        }
        if !self.array && rank > 0 {
            return Err(ExportError::branch(
                &self.name,
                format!("rank {rank} is not allowed for a scalar value"),
            ));
        }
        if self.is_array_fixed_size() && rank >= self.array_fixed_size as usize {
            return Err(ExportError::branch(
                &self.name,
                format!("array rank overflow ({rank} >= {})", self.array_fixed_size),
            ));
        }
        self.buffer.set(rank, value);
        Ok(())
    }

    /// Size the array buffer for the current row, every slot at its sentinel.
    pub fn set_size(&mut self, size: u32) -> Result<()> {
        if !self.locked {
            return Err(ExportError::branch(&self.name, "entry is not locked, cannot set size"));
        }
        if !self.array {
            return Err(ExportError::branch(&self.name, "entry is not an array"));
        }
        if self.is_array_fixed_size() && size != self.array_fixed_size {
            return Err(ExportError::branch(
                &self.name,
                format!("cannot resize fixed size array to {size}"),
            ));
        }
        self.buffer.assign_sentinels(size as usize);
        Ok(())
    }

    /// Mark the column as bound to an output table.
    pub fn bind(&mut self) -> Result<()> {
        if !self.is_valid() {
            return Err(ExportError::branch(&self.name, "invalid entry, cannot bind"));
        }
        if self.inhibit {
            return Err(ExportError::branch(&self.name, "entry is inhibited, cannot bind"));
        }
        if !self.locked {
            return Err(ExportError::branch(&self.name, "entry is not locked, cannot bind"));
        }
        if self.array && !self.has_fixed_size() && self.array_size_name.is_empty() {
            return Err(ExportError::branch(&self.name, "missing array size name"));
        }
        self.bound = true;
        Ok(())
    }

    pub fn detach(&mut self) {
        self.bound = false;
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn print<W: fmt::Write>(&self, out: &mut W, title: &str, indent: &str) -> fmt::Result {
        if !title.is_empty() {
            writeln!(out, "{indent}{title} :")?;
        }
        writeln!(out, "{indent}|-- Valid       : '{}'", self.is_valid())?;
        writeln!(out, "{indent}|-- Activated   : '{}'", self.is_activated())?;
        writeln!(out, "{indent}|-- Name        : '{}'", self.name)?;
        writeln!(out, "{indent}|-- Parent name : '{}'", self.parent_name)?;
        writeln!(out, "{indent}|-- Leaf name   : '{}'", self.leaf_name)?;
        writeln!(out, "{indent}|-- Title       : '{}'", self.title)?;
        writeln!(out, "{indent}|-- Unit        : '{}'", self.unit)?;
        writeln!(out, "{indent}|-- Topic       : '{}'", self.topic)?;
        writeln!(out, "{indent}|-- Store bit   : {}", self.store_bit.bits())?;
        writeln!(out, "{indent}|-- Type        : '{}'", self.ctype)?;
        writeln!(
            out,
            "{indent}|-- Array       : '{}'",
            if self.array { "Yes" } else { "No" }
        )?;
        if self.array {
            if self.is_array_fixed_size() {
                writeln!(out, "{indent}|-- Array fixed size : {}", self.array_fixed_size)?;
            } else {
                writeln!(out, "{indent}|-- Array size name  : '{}'", self.array_size_name)?;
            }
        }
        writeln!(out, "{indent}|-- Values      : {}", self.buffer.len())?;
        writeln!(out, "{indent}`-- Bound       : '{}'", self.bound)
    }
}

impl fmt::Display for BranchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, "", "")
    }
}
