//! Flat key/value property bag.
//!
//! Used both for configuration (exporter and module keys) and for the
//! auxiliary properties carried by source hits and clusters.

use std::collections::BTreeMap;
use std::fs;
use std::ops::Bound;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A single property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Flag(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    List(Vec<String>),
}

/// Ordered map of named properties.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flat JSON object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse properties")
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read properties: {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Invalid properties file: {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// True only for a boolean property set to `true`.
    pub fn has_flag(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(PropertyValue::Flag(true)))
    }

    /// True when `key` is present and not a `false` flag.
    pub fn is_set(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(PropertyValue::Flag(v)) => *v,
            Some(_) => true,
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    pub fn fetch_boolean(&self, key: &str) -> Option<bool> {
        match self.entries.get(key)? {
            PropertyValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn fetch_integer(&self, key: &str) -> Option<i64> {
        match self.entries.get(key)? {
            PropertyValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Real value; integers are widened.
    pub fn fetch_real(&self, key: &str) -> Option<f64> {
        match self.entries.get(key)? {
            PropertyValue::Real(v) => Some(*v),
            PropertyValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn fetch_string(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            PropertyValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// String list; a single string reads as a one-element list.
    pub fn fetch_strings(&self, key: &str) -> Option<Vec<String>> {
        match self.entries.get(key)? {
            PropertyValue::List(v) => Some(v.clone()),
            PropertyValue::Text(v) => Some(vec![v.clone()]),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.insert(key, PropertyValue::Flag(true));
    }

    pub fn set_integer(&mut self, key: impl Into<String>, value: i64) {
        self.insert(key, PropertyValue::Integer(value));
    }

    pub fn set_real(&mut self, key: impl Into<String>, value: f64) {
        self.insert(key, PropertyValue::Real(value));
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key, PropertyValue::Text(value.into()));
    }

    pub fn set_strings(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.insert(key, PropertyValue::List(values));
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn keys_starting_with<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
    }

    /// Copy of every entry whose key starts with `prefix`, keys unchanged.
    pub fn export_starting_with(&self, prefix: &str) -> Properties {
        let entries = self
            .keys_starting_with(prefix)
            .filter_map(|k| self.entries.get(k).map(|v| (k.to_string(), v.clone())))
            .collect();
        Properties { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_value_kinds() {
        let props = Properties::from_json_str(
            r#"{
                "export.cat_infos": true,
                "max_files": 3,
                "scale": 0.5,
                "files.mode": "list",
                "files.list.filenames": ["a.txt", "b.txt"]
            }"#,
        )
        .unwrap();
        assert!(props.has_flag("export.cat_infos"));
        assert_eq!(props.fetch_integer("max_files"), Some(3));
        assert_eq!(props.fetch_real("max_files"), Some(3.0));
        assert_eq!(props.fetch_real("scale"), Some(0.5));
        assert_eq!(props.fetch_string("files.mode"), Some("list"));
        assert_eq!(
            props.fetch_strings("files.list.filenames").unwrap(),
            vec!["a.txt", "b.txt"]
        );
        assert_eq!(props.fetch_strings("files.mode").unwrap(), vec!["list"]);
        assert!(!props.has_flag("max_files"));
    }

    #[test]
    fn test_flag_versus_key() {
        let mut props = Properties::new();
        props.insert("a", PropertyValue::Flag(false));
        props.set_real("b", 1.5);
        assert!(props.has_key("a"));
        assert!(!props.has_flag("a"));
        assert!(!props.is_set("a"));
        assert!(props.is_set("b"));
        assert!(!props.has_flag("b"));
        assert!(!props.is_set("c"));
    }

    #[test]
    fn test_prefix_selection() {
        let mut props = Properties::new();
        props.set_string("export.bank.label.CD", "CD2");
        props.set_string("export.bank.label.EH", "HEADER");
        props.set_flag("export.true_hits");
        props.set_flag("exporter");
        props.set_integer("max_files", 2);

        let labels: Vec<_> = props.keys_starting_with("export.bank.label.").collect();
        assert_eq!(labels, vec!["export.bank.label.CD", "export.bank.label.EH"]);

        let exported = props.export_starting_with("export.");
        assert_eq!(exported.len(), 3);
        assert!(exported.has_flag("export.true_hits"));
        assert!(!exported.has_key("max_files"));
        assert!(!exported.has_key("exporter"));
    }
}
