//! Geometry identifiers and the geometry manager interface.
//!
//! A geometry identifier is a category type code plus an ordered tuple of
//! sub-addresses. The meaning of each address position is declared per
//! category by the identifier manager.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Address value of an unset sub-address.
pub const INVALID_ADDRESS: u32 = u32::MAX;

/// Category type of an unset identifier.
pub const INVALID_TYPE: u32 = u32::MAX;

/// Composite detector part identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeomId {
    #[serde(rename = "type")]
    pub category_type: u32,
    pub addresses: Vec<u32>,
}

impl GeomId {
    pub fn new(category_type: u32, addresses: Vec<u32>) -> Self {
        Self {
            category_type,
            addresses,
        }
    }

    pub fn get_type(&self) -> u32 {
        self.category_type
    }

    /// Address at `index`; out of range reads as [`INVALID_ADDRESS`].
    pub fn get(&self, index: usize) -> u32 {
        self.addresses
            .get(index)
            .copied()
            .unwrap_or(INVALID_ADDRESS)
    }

    /// Address at `index` as an export integer (`-1` when invalid).
    pub fn axis(&self, index: Option<usize>) -> i32 {
        match index.map(|i| self.get(i)) {
            Some(address) if address != INVALID_ADDRESS => address as i32,
            _ => -1,
        }
    }
}

/// Declared layout of one geometry category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    #[serde(rename = "type")]
    pub category_type: u32,
    pub addresses: Vec<String>,
}

impl CategoryInfo {
    pub fn new(category_type: u32, addresses: &[&str]) -> Self {
        Self {
            category_type,
            addresses: addresses.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn get_type(&self) -> u32 {
        self.category_type
    }

    /// Position of the named sub-address.
    pub fn subaddress_index(&self, name: &str) -> Option<usize> {
        self.addresses.iter().position(|a| a == name)
    }

    /// Build an identifier of this category from `(axis, value)` pairs;
    /// axes not given are left invalid.
    pub fn make_id(&self, values: &[(&str, u32)]) -> GeomId {
        let addresses = self
            .addresses
            .iter()
            .map(|axis| {
                values
                    .iter()
                    .find(|(name, _)| name == axis)
                    .map(|(_, v)| *v)
                    .unwrap_or(INVALID_ADDRESS)
            })
            .collect();
        GeomId::new(self.category_type, addresses)
    }
}

/// Category catalogue keyed by category name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdManager {
    categories: BTreeMap<String, CategoryInfo>,
}

impl IdManager {
    pub fn add_category(&mut self, name: impl Into<String>, info: CategoryInfo) {
        self.categories.insert(name.into(), info);
    }

    pub fn has_category_info(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    pub fn category_info(&self, name: &str) -> Option<&CategoryInfo> {
        self.categories.get(name)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryInfo)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Read-only view of the detector geometry used by the exporter.
pub trait GeometryManager {
    fn setup_label(&self) -> &str;
    fn setup_version(&self) -> &str;
    fn id_manager(&self) -> &IdManager;
}

/// Concrete geometry setup: a label, a version and a category catalogue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometrySetup {
    pub label: String,
    pub version: String,
    pub categories: IdManager,
}

impl GeometrySetup {
    /// The built-in demonstrator layout.
    pub fn snemo() -> Self {
        let mut categories = IdManager::default();
        categories.add_category(
            "calorimeter_block",
            CategoryInfo::new(1302, &["module", "side", "column", "row", "part"]),
        );
        categories.add_category(
            "xcalo_block",
            CategoryInfo::new(1232, &["module", "side", "wall", "column", "row", "part"]),
        );
        categories.add_category(
            "gveto_block",
            CategoryInfo::new(1252, &["module", "side", "wall", "column", "part"]),
        );
        categories.add_category(
            "drift_cell_core",
            CategoryInfo::new(1204, &["module", "side", "layer", "row"]),
        );
        Self {
            label: "snemo::demonstrator".to_string(),
            version: "2.0".to_string(),
            categories,
        }
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read geometry setup: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid geometry setup: {}", path.display()))
    }
}

impl GeometryManager for GeometrySetup {
    fn setup_label(&self) -> &str {
        &self.label
    }

    fn setup_version(&self) -> &str {
        &self.version
    }

    fn id_manager(&self) -> &IdManager {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geom_id_axis() {
        let gid = GeomId::new(1302, vec![0, 1, 12, INVALID_ADDRESS]);
        assert_eq!(gid.get(2), 12);
        assert_eq!(gid.get(9), INVALID_ADDRESS);
        assert_eq!(gid.axis(Some(1)), 1);
        assert_eq!(gid.axis(Some(3)), -1);
        assert_eq!(gid.axis(None), -1);
    }

    #[test]
    fn test_builtin_setup() {
        let setup = GeometrySetup::snemo();
        let ids = setup.id_manager();
        let calo = ids.category_info("calorimeter_block").unwrap();
        assert_eq!(calo.get_type(), 1302);
        assert_eq!(calo.subaddress_index("row"), Some(3));
        let gveto = ids.category_info("gveto_block").unwrap();
        assert_eq!(gveto.subaddress_index("row"), None);
        assert!(ids.has_category_info("drift_cell_core"));
    }

    #[test]
    fn test_make_id() {
        let setup = GeometrySetup::snemo();
        let xcalo = setup.id_manager().category_info("xcalo_block").unwrap();
        let gid = xcalo.make_id(&[("module", 0), ("side", 1), ("wall", 0), ("column", 3), ("row", 7)]);
        assert_eq!(gid.category_type, 1232);
        assert_eq!(gid.addresses, vec![0, 1, 0, 3, 7, INVALID_ADDRESS]);
    }

    #[test]
    fn test_setup_json_round_trip() {
        let setup = GeometrySetup::snemo();
        let text = serde_json::to_string(&setup).unwrap();
        assert!(text.contains(r#""calorimeter_block":{"type":1302"#));
        let back: GeometrySetup = serde_json::from_str(&text).unwrap();
        assert_eq!(back, setup);
    }
}
