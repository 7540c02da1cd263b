//! Schema descriptor tables for the flattened export records.
//!
//! Each record type declares an ordered list of [`FieldDescriptor`]s: exported
//! name, primitive type, optional unit and optional sub-topic, plus an accessor
//! returning the field as a [`Value`]. The same table drives the text sink
//! (field enumeration and description strings) and the column materializer
//! (one column per descriptor), so the two sinks cannot drift apart.
//!
//! The process-wide [`SchemaRegistry`] is built once on first use and is
//! immutable afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{ExportError, Result};
use crate::export::models::{
    CalibCalorimeterHit, CalibTrackerHit, EventHeader, Helix, Polyline, TrackerCluster,
    TrackerClusteredHit, TrackerTrajectory, TrackerTrajectoryOrphanHit, TrackerTrajectoryPattern,
    TrueGgHit, TrueParticle, TrueScinHit, TrueStepHit, TrueVertex, Vertex,
};

/// Primitive storage type of an exported field.
///
/// Discriminants are the numeric type codes used by column descriptors
/// (0 is reserved for "undefined").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CType {
    Bool = 1,
    Char = 2,
    UChar = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
}

impl CType {
    pub const ALL: [CType; 11] = [
        CType::Bool,
        CType::Char,
        CType::UChar,
        CType::Int16,
        CType::UInt16,
        CType::Int32,
        CType::UInt32,
        CType::Int64,
        CType::UInt64,
        CType::Float,
        CType::Double,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// C type label used in description strings.
    pub fn label(self) -> &'static str {
        match self {
            CType::Bool => "bool",
            CType::Char => "int8_t",
            CType::UChar => "uint8_t",
            CType::Int16 => "int16_t",
            CType::UInt16 => "uint16_t",
            CType::Int32 => "int32_t",
            CType::UInt32 => "uint32_t",
            CType::Int64 => "int64_t",
            CType::UInt64 => "uint64_t",
            CType::Float => "float",
            CType::Double => "double",
        }
    }

    /// Parse a C type label. `char` and `uchar` are accepted as aliases.
    pub fn from_label(label: &str) -> Option<CType> {
        match label {
            "bool" => Some(CType::Bool),
            "int8_t" | "char" => Some(CType::Char),
            "uint8_t" | "uchar" => Some(CType::UChar),
            "int16_t" => Some(CType::Int16),
            "uint16_t" => Some(CType::UInt16),
            "int32_t" => Some(CType::Int32),
            "uint32_t" => Some(CType::UInt32),
            "int64_t" => Some(CType::Int64),
            "uint64_t" => Some(CType::UInt64),
            "float" => Some(CType::Float),
            "double" => Some(CType::Double),
            _ => None,
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single field value read off a record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Char(i8),
    UChar(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
}

impl Value {
    pub fn ctype(&self) -> CType {
        match self {
            Value::Bool(_) => CType::Bool,
            Value::Char(_) => CType::Char,
            Value::UChar(_) => CType::UChar,
            Value::Int16(_) => CType::Int16,
            Value::UInt16(_) => CType::UInt16,
            Value::Int32(_) => CType::Int32,
            Value::UInt32(_) => CType::UInt32,
            Value::Int64(_) => CType::Int64,
            Value::UInt64(_) => CType::UInt64,
            Value::Float(_) => CType::Float,
            Value::Double(_) => CType::Double,
        }
    }

    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(v) => v,
            Value::Float(v) => v != 0.0,
            Value::Double(v) => v != 0.0,
            _ => self.as_i64() != 0,
        }
    }

    /// Integer view of the value; reals are truncated toward zero.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::Bool(v) => i64::from(v),
            Value::Char(v) => i64::from(v),
            Value::UChar(v) => i64::from(v),
            Value::Int16(v) => i64::from(v),
            Value::UInt16(v) => i64::from(v),
            Value::Int32(v) => i64::from(v),
            Value::UInt32(v) => i64::from(v),
            Value::Int64(v) => v,
            Value::UInt64(v) => v as i64,
            Value::Float(v) => v as i64,
            Value::Double(v) => v as i64,
        }
    }

    pub fn as_u64(&self) -> u64 {
        match *self {
            Value::UInt64(v) => v,
            _ => self.as_i64() as u64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Float(v) => f64::from(v),
            Value::Double(v) => v,
            Value::UInt64(v) => v as f64,
            _ => self.as_i64() as f64,
        }
    }
}

/// Text form used by the text sink: booleans as `1`/`0`, reals in shortest
/// round-trip decimal form (`1`, `0.5`, `NaN`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", u8::from(*v)),
            Value::Char(v) => write!(f, "{v}"),
            Value::UChar(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! value_from {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$native> for Value {
                fn from(v: $native) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Char,
    u8 => UChar,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
}

/// Declared schema entry of one exported field.
pub struct FieldDescriptor<T: 'static> {
    pub name: &'static str,
    pub ctype: CType,
    pub unit: Option<&'static str>,
    pub topic: Option<&'static str>,
    pub get: fn(&T) -> Value,
}

/// A flattened record type with a declared, versioned schema.
pub trait ExportRecord: Default + Clone + 'static {
    /// Registry key of the record type (e.g. `true_vertex_type`).
    const TYPE_NAME: &'static str;

    const EXPORT_VERSION: u32 = 0;

    /// Ordered field descriptors.
    fn fields() -> &'static [FieldDescriptor<Self>];

    /// Restore every field to its invalid sentinel.
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Value of the field at `leaf` in declaration order.
    fn value(&self, leaf: usize) -> Option<Value> {
        Self::fields().get(leaf).map(|field| (field.get)(self))
    }
}

/// Build a static descriptor table for a record type.
///
/// ```ignore
/// static FIELDS: &[FieldDescriptor<TrueVertex>] = descriptors![TrueVertex;
///     "vertexId": Int32 => vertex_id,
///     "x": Double ["mm"] => x,
///     "catX": Double in CAT_TOPIC => cat_x,
/// ];
/// ```
macro_rules! descriptors {
    (@unit) => { None };
    (@unit $unit:literal) => { Some($unit) };
    (@topic) => { None };
    (@topic $topic:expr) => { Some($topic) };
    ($record:ty; $( $name:literal : $ctype:ident $( [$unit:literal] )? $( in $topic:expr )? => $field:ident ),* $(,)?) => {
        &[
            $(
                $crate::export::schema::FieldDescriptor::<$record> {
                    name: $name,
                    ctype: $crate::export::schema::CType::$ctype,
                    unit: $crate::export::schema::descriptors!(@unit $($unit)?),
                    topic: $crate::export::schema::descriptors!(@topic $($topic)?),
                    get: |r: &$record| $crate::export::schema::Value::from(r.$field),
                },
            )*
        ]
    };
}

pub(crate) use descriptors;

/// Owned description of one declared field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: &'static str,
    pub ctype: CType,
    pub unit: Option<&'static str>,
    pub topic: Option<&'static str>,
}

/// Declared schema of one record type.
#[derive(Clone, Debug)]
pub struct RecordSchema {
    pub type_name: &'static str,
    pub version: u32,
    pub fields: Vec<FieldInfo>,
    description: String,
    check: fn() -> Result<()>,
}

impl RecordSchema {
    pub fn of<T: ExportRecord>() -> Self {
        let fields: Vec<FieldInfo> = T::fields()
            .iter()
            .map(|f| FieldInfo {
                name: f.name,
                ctype: f.ctype,
                unit: f.unit,
                topic: f.topic,
            })
            .collect();
        let description = describe_fields(&fields);
        Self {
            type_name: T::TYPE_NAME,
            version: T::EXPORT_VERSION,
            fields,
            description,
            check: validate_record::<T>,
        }
    }

    /// Check the record's accessors against the declared types.
    pub fn validate(&self) -> Result<()> {
        (self.check)()
    }

    /// Layout string `name/ctype[unit];...` used by the text sink comments.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

fn describe_fields(fields: &[FieldInfo]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(field.name);
        out.push('/');
        out.push_str(field.ctype.label());
        if let Some(unit) = field.unit {
            out.push('[');
            out.push_str(unit);
            out.push(']');
        }
    }
    out
}

/// Check that every accessor of `T` produces the declared primitive type.
pub fn validate_record<T: ExportRecord>() -> Result<()> {
    let sample = T::default();
    for field in T::fields() {
        let produced = (field.get)(&sample).ctype();
        if produced != field.ctype {
            return Err(ExportError::SchemaMismatch(format!(
                "{}.{} is declared {} but reads as {}",
                T::TYPE_NAME,
                field.name,
                field.ctype,
                produced
            )));
        }
    }
    Ok(())
}

/// Immutable catalogue of every record schema, keyed by type name.
pub struct SchemaRegistry {
    schemas: Vec<RecordSchema>,
    index: HashMap<&'static str, usize>,
}

impl SchemaRegistry {
    fn build() -> Self {
        let schemas = vec![
            RecordSchema::of::<EventHeader>(),
            RecordSchema::of::<TrueVertex>(),
            RecordSchema::of::<TrueParticle>(),
            RecordSchema::of::<TrueStepHit>(),
            RecordSchema::of::<TrueGgHit>(),
            RecordSchema::of::<TrueScinHit>(),
            RecordSchema::of::<CalibTrackerHit>(),
            RecordSchema::of::<CalibCalorimeterHit>(),
            RecordSchema::of::<TrackerClusteredHit>(),
            RecordSchema::of::<TrackerCluster>(),
            RecordSchema::of::<Vertex>(),
            RecordSchema::of::<Polyline>(),
            RecordSchema::of::<Helix>(),
            RecordSchema::of::<TrackerTrajectory>(),
            RecordSchema::of::<TrackerTrajectoryOrphanHit>(),
            RecordSchema::of::<TrackerTrajectoryPattern>(),
        ];
        let index = schemas
            .iter()
            .enumerate()
            .map(|(i, s)| (s.type_name, i))
            .collect();
        Self { schemas, index }
    }

    pub fn get(&self, type_name: &str) -> Result<&RecordSchema> {
        self.index
            .get(type_name)
            .map(|&i| &self.schemas[i])
            .ok_or_else(|| {
                ExportError::SchemaMismatch(format!("no record schema named '{type_name}'"))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordSchema> {
        self.schemas.iter()
    }

    /// Validate every registered accessor against its declared type.
    pub fn validate(&self) -> Result<()> {
        self.schemas.iter().try_for_each(RecordSchema::validate)
    }
}

static REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::build);

/// The process-wide schema registry.
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctype_labels_round_trip() {
        for ctype in CType::ALL {
            assert_eq!(CType::from_label(ctype.label()), Some(ctype));
        }
        assert_eq!(CType::from_label("char"), Some(CType::Char));
        assert_eq!(CType::from_label("uchar"), Some(CType::UChar));
        assert_eq!(CType::from_label("string"), None);
    }

    #[test]
    fn test_value_text_form() {
        assert_eq!(Value::Bool(true).to_string(), "1");
        assert_eq!(Value::Bool(false).to_string(), "0");
        assert_eq!(Value::Double(1.0).to_string(), "1");
        assert_eq!(Value::Double(0.5).to_string(), "0.5");
        assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Int32(-1).to_string(), "-1");
        assert_eq!(Value::UInt32(u32::MAX).to_string(), "4294967295");
    }

    #[test]
    fn test_registry_is_consistent() {
        let registry = registry();
        registry.validate().unwrap();
        assert_eq!(registry.iter().count(), 16);
        assert!(registry.get("true_vertex_type").is_ok());
        assert!(matches!(
            registry.get("no_such_type"),
            Err(ExportError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_description_string() {
        let schema = registry().get("true_vertex_type").unwrap();
        assert_eq!(
            schema.description(),
            "vertexId/int32_t;x/double[mm];y/double[mm];z/double[mm];time/double[ns]"
        );
        assert_eq!(schema.field_index("time"), Some(4));
        assert_eq!(schema.version, 0);
    }

    #[test]
    fn test_field_names_are_unique() {
        for schema in registry().iter() {
            let mut names: Vec<_> = schema.fields.iter().map(|f| f.name).collect();
            names.sort_unstable();
            let before = names.len();
            names.dedup();
            assert_eq!(before, names.len(), "duplicate field in {}", schema.type_name);
        }
    }
}
