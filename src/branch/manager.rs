//! Branch manager: the ordered column list of the columnar sink.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use super::entry::BranchEntry;
use crate::error::{ExportError, Result};
use crate::export::constants::TopicLevel;
use crate::export::event::BankSpec;
use crate::export::schema::{registry, CType, Value};

/// Suffix of the per-bank element count column.
pub const SIZE_SUFFIX: &str = "@size";
/// Suffix of the per-bank record version column.
pub const VERSION_SUFFIX: &str = "@version";

pub fn size_column(bank: &str) -> String {
    format!("{bank}{SIZE_SUFFIX}")
}

pub fn version_column(bank: &str) -> String {
    format!("{bank}{VERSION_SUFFIX}")
}

/// Column descriptors in declaration order, with O(1) lookup by full name.
#[derive(Debug, Default)]
pub struct BranchManager {
    entries: Vec<BranchEntry>,
    index: HashMap<String, usize>,
    topics: BTreeMap<String, TopicLevel>,
}

impl BranchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[BranchEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [BranchEntry] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of columns that will be bound to the output table.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_activated()).count()
    }

    pub fn add_branch_entry(
        &mut self,
        name: &str,
        ctype: CType,
        array: bool,
    ) -> Result<&mut BranchEntry> {
        if self.index.contains_key(name) {
            return Err(ExportError::branch(name, "a branch with this name already exists"));
        }
        let entry = BranchEntry::new(name, ctype, array)?;
        let position = self.entries.len();
        self.index.insert(name.to_string(), position);
        self.entries.push(entry);
        Ok(&mut self.entries[position])
    }

    /// Drop every column and topic.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.topics.clear();
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn branch(&self, name: &str) -> Result<&BranchEntry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ExportError::SchemaMismatch(format!("no branch named '{name}'")))
    }

    pub fn branch_mut(&mut self, name: &str) -> Result<&mut BranchEntry> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(ExportError::SchemaMismatch(format!("no branch named '{name}'"))),
        }
    }

    pub fn add_topic(&mut self, label: &str, level: TopicLevel) -> Result<()> {
        if label.is_empty() {
            return Err(ExportError::Config("empty topic label is not allowed".to_string()));
        }
        self.topics.insert(label.to_string(), level);
        Ok(())
    }

    pub fn is_active_topic(&self, label: &str) -> bool {
        self.topics.get(label) == Some(&TopicLevel::Include)
    }

    /// Declare the columns of one bank: `<bank>@size` for arrays,
    /// `<bank>@version` pre-filled with the record version, then one
    /// `<bank>.<field>` column per declared field. Fields tagged with a
    /// sub-topic that is not active are declared inhibited.
    pub fn init_bank(&mut self, spec: &BankSpec) -> Result<()> {
        let schema = registry().get(spec.record_type)?;
        schema.validate()?;

        let size_name = size_column(spec.name);
        if spec.array {
            let size = self.add_branch_entry(&size_name, CType::UInt32, false)?;
            size.set_title(&format!("Number of {} records", spec.name))?;
            size.set_store_bit(spec.store_bit)?;
            size.lock();
        }

        let version = self.add_branch_entry(&version_column(spec.name), CType::UInt32, false)?;
        version.set_title(&format!("Version of {}", spec.record_type))?;
        version.set_store_bit(spec.store_bit)?;
        version.lock();
        version.set_value(Value::UInt32(schema.version), 0)?;

        for (leaf, field) in schema.fields.iter().enumerate() {
            let column = format!("{}.{}", spec.name, field.name);
            let active = field.topic.map_or(true, |t| self.is_active_topic(t));
            let entry = self.add_branch_entry(&column, field.ctype, spec.array)?;
            entry.set_title(&format!("{}::{}", spec.record_type, field.name))?;
            if spec.array {
                entry.set_array_size_name(&size_name)?;
            }
            if let Some(unit) = field.unit {
                entry.set_unit(unit)?;
            }
            if let Some(topic) = field.topic {
                entry.set_topic(topic)?;
                entry.set_inhibit(!active);
            }
            entry.set_store_bit(spec.store_bit)?;
            entry.set_parent_name(spec.name)?;
            entry.set_leaf(field.name, leaf)?;
            entry.lock();
            trace!(column = %column, ctype = %field.ctype, active, "declared column");
        }
        debug!(
            bank = spec.name,
            record = spec.record_type,
            fields = schema.fields.len(),
            "declared bank columns"
        );
        Ok(())
    }
}
