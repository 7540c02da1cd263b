//! Topic selection bitmask.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Set of exported topics, one bit per topic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ExportFlags(u32);

impl ExportFlags {
    pub const NONE: ExportFlags = ExportFlags(0);
    pub const EVENT_HEADER: ExportFlags = ExportFlags(0x1);
    pub const TRUE_PARTICLES: ExportFlags = ExportFlags(0x2);
    pub const TRUE_STEP_HITS: ExportFlags = ExportFlags(0x4);
    pub const TRUE_HITS: ExportFlags = ExportFlags(0x8);
    pub const CALIB_CALORIMETER_HITS: ExportFlags = ExportFlags(0x10);
    pub const CALIB_TRACKER_HITS: ExportFlags = ExportFlags(0x20);
    pub const TRACKER_CLUSTERING: ExportFlags = ExportFlags(0x40);
    pub const TRACKER_TRAJECTORIES: ExportFlags = ExportFlags(0x80);
    pub const ALL: ExportFlags = ExportFlags(0xFF);

    /// Every single-topic bit with its label, in bit order.
    pub const LABELED: [(ExportFlags, &'static str); 8] = [
        (Self::EVENT_HEADER, "event_header"),
        (Self::TRUE_PARTICLES, "true_particles"),
        (Self::TRUE_STEP_HITS, "true_step_hits"),
        (Self::TRUE_HITS, "true_hits"),
        (Self::CALIB_CALORIMETER_HITS, "calib_calorimeter_hits"),
        (Self::CALIB_TRACKER_HITS, "calib_tracker_hits"),
        (Self::TRACKER_CLUSTERING, "tracker_clustering"),
        (Self::TRACKER_TRAJECTORIES, "tracker_trajectories"),
    ];

    /// Build from raw bits; bits beyond the eight topics are dropped.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        ExportFlags(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: ExportFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: ExportFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: ExportFlags) {
        self.0 |= other.0;
    }

    /// Zero means "nothing selected explicitly", which selects every topic.
    pub const fn or_all(self) -> Self {
        if self.0 == 0 {
            Self::ALL
        } else {
            self
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::LABELED
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(flag, _)| *flag)
    }

    /// Labels of the bits set, in bit order.
    pub fn labels(self) -> Vec<&'static str> {
        Self::LABELED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, label)| *label)
            .collect()
    }
}

impl BitOr for ExportFlags {
    type Output = ExportFlags;

    fn bitor(self, rhs: ExportFlags) -> ExportFlags {
        ExportFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ExportFlags {
    fn bitor_assign(&mut self, rhs: ExportFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ExportFlags {
    type Output = ExportFlags;

    fn bitand(self, rhs: ExportFlags) -> ExportFlags {
        ExportFlags(self.0 & rhs.0)
    }
}

impl fmt::Display for ExportFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&self.labels().join("|"))
    }
}
