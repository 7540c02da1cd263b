//! Exporter configuration read from a property bag.
//!
//! Recognized keys:
//! - `export.bank.label.<logical>`: physical label of a source bank
//! - `export.cat_infos`: enable the `CAT` sub-topic
//! - `export.<topic>`: enable one topic (see [`TOPIC_KEYS`])
//!
//! The trajectories topic has no key of its own: it is only selected through
//! the "nothing selected means everything" default.

use std::collections::BTreeMap;

use crate::error::{ExportError, Result};
use crate::export::constants::bank_labels;
use crate::source::properties::Properties;

use super::flags::ExportFlags;

pub const BANK_LABEL_PREFIX: &str = "export.bank.label.";
pub const CAT_INFOS_KEY: &str = "export.cat_infos";

/// Topic switches, in bit order.
pub const TOPIC_KEYS: [(&str, ExportFlags); 7] = [
    ("export.event_header", ExportFlags::EVENT_HEADER),
    ("export.true_particles", ExportFlags::TRUE_PARTICLES),
    ("export.true_step_hits", ExportFlags::TRUE_STEP_HITS),
    ("export.true_hits", ExportFlags::TRUE_HITS),
    ("export.calib_calorimeter_hits", ExportFlags::CALIB_CALORIMETER_HITS),
    ("export.calib_tracker_hits", ExportFlags::CALIB_TRACKER_HITS),
    ("export.tracker_clustering", ExportFlags::TRACKER_CLUSTERING),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Logical bank name -> label in the source event record.
    pub bank_labels: BTreeMap<String, String>,
    pub flags: ExportFlags,
    pub export_cat_infos: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            bank_labels: bank_labels::ALL
                .iter()
                .map(|l| (l.to_string(), l.to_string()))
                .collect(),
            flags: ExportFlags::NONE,
            export_cat_infos: false,
        }
    }
}

impl ExporterConfig {
    /// Defaults overlaid with `setup`, topics defaulting to all.
    pub fn from_properties(setup: &Properties) -> Result<Self> {
        let mut config = Self::default();
        config.apply(setup)?;
        config.flags = config.flags.or_all();
        Ok(config)
    }

    /// Overlay `setup` onto the current values. Flags are only ever added.
    pub fn apply(&mut self, setup: &Properties) -> Result<()> {
        for key in setup.keys_starting_with(BANK_LABEL_PREFIX) {
            let logical = &key[BANK_LABEL_PREFIX.len()..];
            if logical.is_empty() {
                return Err(ExportError::Config(format!("empty bank name in key '{key}'")));
            }
            let label = setup.fetch_string(key).ok_or_else(|| {
                ExportError::Config(format!("bank label key '{key}' must be a string"))
            })?;
            self.bank_labels
                .insert(logical.to_string(), label.to_string());
        }

        if setup.has_flag(CAT_INFOS_KEY) {
            self.export_cat_infos = true;
        }

        for (key, flag) in TOPIC_KEYS {
            if setup.has_flag(key) {
                self.flags.insert(flag);
            }
        }
        Ok(())
    }

    /// Physical label for a logical bank name (identity when not remapped).
    pub fn bank_label<'a>(&'a self, logical: &'a str) -> &'a str {
        self.bank_labels
            .get(logical)
            .map(String::as_str)
            .unwrap_or(logical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::from_properties(&Properties::new()).unwrap();
        assert_eq!(config.flags, ExportFlags::ALL);
        assert!(!config.export_cat_infos);
        for label in bank_labels::ALL {
            assert_eq!(config.bank_label(label), label);
        }
    }

    #[test]
    fn test_topic_keys_select_bits() {
        let mut setup = Properties::new();
        setup.set_flag("export.calib_tracker_hits");
        setup.set_flag("export.tracker_clustering");
        setup.set_flag("export.cat_infos");
        let config = ExporterConfig::from_properties(&setup).unwrap();
        assert_eq!(
            config.flags,
            ExportFlags::CALIB_TRACKER_HITS | ExportFlags::TRACKER_CLUSTERING
        );
        assert!(config.export_cat_infos);
    }

    #[test]
    fn test_no_trajectory_key() {
        let mut setup = Properties::new();
        setup.set_flag("export.tracker_trajectories");
        let config = ExporterConfig::from_properties(&setup).unwrap();
        // Unrecognized: falls back to every topic.
        assert_eq!(config.flags, ExportFlags::ALL);
    }

    #[test]
    fn test_bank_label_remap() {
        let mut setup = Properties::new();
        setup.set_string("export.bank.label.CD", "CD2");
        let config = ExporterConfig::from_properties(&setup).unwrap();
        assert_eq!(config.bank_label("CD"), "CD2");
        assert_eq!(config.bank_label("EH"), "EH");

        setup.set_integer("export.bank.label.EH", 3);
        assert!(matches!(
            ExporterConfig::from_properties(&setup),
            Err(ExportError::Config(_))
        ));
    }
}
