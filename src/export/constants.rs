//! Shared constants for the flattened export model.

/// Invalid identifier sentinel for 32-bit id fields.
pub const INVALID_ID: i32 = -1;

/// Invalid sentinel for 16-bit integer fields.
pub const INVALID_INTEGER16: i16 = -1;

/// Invalid sentinel for 32-bit integer fields.
pub const INVALID_INTEGER: i32 = -1;

/// Invalid sentinel for 64-bit integer fields.
pub const INVALID_INTEGER64: i64 = -1;

/// Invalid sentinel for real fields.
pub const INVALID_DOUBLE: f64 = f64::NAN;

/// Version of the whole export event layout (first token of a text record).
pub const EXPORT_EVENT_VERSION: u32 = 0;

/// Name of the table written by the columnar sink.
pub const TABLE_NAME: &str = "snemodata";

/// Label of the extended reconstruction-annotation sub-topic.
pub const CAT_TOPIC: &str = "CAT";

/// Scintillator block family stored in the `type` field of scintillator hits.
///
/// - `Calo`: geometry id has module/side/column/row
/// - `Xcalo`: geometry id has module/side/wall/column/row
/// - `Gveto`: geometry id has module/side/wall/column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScinBlockType {
    Calo = 0,
    Xcalo = 1,
    Gveto = 2,
}

impl ScinBlockType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Shape of a one-dimensional trajectory pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternType {
    None = -1,
    Line = 0,
    Polyline = 1,
    Helix = 2,
}

impl PatternType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Activity level of an optional sub-topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TopicLevel {
    Exclude = -1,
    NoInclude = 0,
    Include = 1,
}

/// Internal unit system: lengths in mm, times in ns, energies in MeV.
///
/// Exported quantities are divided by the unit declared in their schema entry.
pub mod units {
    pub const MM: f64 = 1.0;
    pub const NS: f64 = 1.0;
    pub const MEV: f64 = 1.0;
    pub const KEV: f64 = 1.0e-3 * MEV;
}

/// Default labels of the source banks read by the exporter.
pub mod bank_labels {
    pub const EVENT_HEADER: &str = "EH";
    pub const SIMULATED_DATA: &str = "SD";
    pub const CALIBRATED_DATA: &str = "CD";
    pub const TRACKER_CLUSTERING_DATA: &str = "TCD";
    pub const TRACKER_TRAJECTORY_DATA: &str = "TTD";

    pub const ALL: [&str; 5] = [
        EVENT_HEADER,
        SIMULATED_DATA,
        CALIBRATED_DATA,
        TRACKER_CLUSTERING_DATA,
        TRACKER_TRAJECTORY_DATA,
    ];
}

/// Names of the step-hit collections inside simulated data.
pub mod step_hit_categories {
    pub const CALO: &str = "calo";
    pub const XCALO: &str = "xcalo";
    pub const GVETO: &str = "gveto";
    pub const GG: &str = "gg";
}

/// Auxiliary property keys read off source hits and clusters.
pub mod aux_keys {
    pub const MC_HIT_ID: &str = "hit.mc_hit_id";

    pub const CAT_TANGENCY: &str = "CAT_tangency_x";
    pub const CAT_HELIX: &str = "CAT_helix_x";

    pub const CAT_HAS_MOMENTUM: &str = "CAT_has_momentum";
    pub const CAT_CHARGE: &str = "CAT_charge";
    pub const CAT_HAS_HELIX_VERTEX: &str = "CAT_has_helix_vertex";
    pub const CAT_HAS_HELIX_DECAY_VERTEX: &str = "CAT_has_helix_decay_vertex";
    pub const CAT_HAS_TANGENT_VERTEX: &str = "CAT_has_tangent_vertex";
    pub const CAT_HAS_TANGENT_DECAY_VERTEX: &str = "CAT_has_tangent_decay_vertex";
}
