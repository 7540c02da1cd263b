//! The export container: one event header plus one ordered sequence per
//! flattened record type.
//!
//! Records reference each other only through integer ids, so sinks can walk
//! each sequence independently.

use std::fmt;

use tracing::trace;

use super::models::{
    CalibCalorimeterHit, CalibTrackerHit, EventHeader, Helix, Polyline, TrackerCluster,
    TrackerClusteredHit, TrackerTrajectory, TrackerTrajectoryOrphanHit, TrackerTrajectoryPattern,
    TrueGgHit, TrueParticle, TrueScinHit, TrueStepHit, TrueVertex, Vertex,
};
use super::schema::{ExportRecord, Value};
use crate::exporter::flags::ExportFlags;

/// Static description of one container bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BankSpec {
    /// Exported bank name, prefix of every column of the bank.
    pub name: &'static str,
    /// Registry key of the record type stored in the bank.
    pub record_type: &'static str,
    /// Topic bit selecting the bank.
    pub store_bit: ExportFlags,
    /// False only for the event header.
    pub array: bool,
    /// Declared as columns by the columnar sink.
    pub columnar: bool,
}

const fn bank(
    name: &'static str,
    record_type: &'static str,
    store_bit: ExportFlags,
    array: bool,
    columnar: bool,
) -> BankSpec {
    BankSpec {
        name,
        record_type,
        store_bit,
        array,
        columnar,
    }
}

/// All banks in canonical order.
pub const BANKS: [BankSpec; 18] = [
    bank("header", "event_header_type", ExportFlags::EVENT_HEADER, false, true),
    bank("trueVertices", "true_vertex_type", ExportFlags::TRUE_PARTICLES, true, true),
    bank("trueParticles", "true_particle_type", ExportFlags::TRUE_PARTICLES, true, true),
    bank("trueStepHits", "true_step_hit_type", ExportFlags::TRUE_STEP_HITS, true, true),
    bank("trueCaloHits", "true_scin_hit_type", ExportFlags::TRUE_HITS, true, true),
    bank("trueXcaloHits", "true_scin_hit_type", ExportFlags::TRUE_HITS, true, true),
    bank("trueGvetoHits", "true_scin_hit_type", ExportFlags::TRUE_HITS, true, true),
    bank("trueGgHits", "true_gg_hit_type", ExportFlags::TRUE_HITS, true, true),
    bank("calibScinHits", "calib_calorimeter_hit_type", ExportFlags::CALIB_CALORIMETER_HITS, true, true),
    bank("calibTrackerHits", "calib_tracker_hit_type", ExportFlags::CALIB_TRACKER_HITS, true, true),
    bank("trackerClusters", "tracker_cluster_type", ExportFlags::TRACKER_CLUSTERING, true, true),
    bank("trackerClusteredHits", "tracker_clustered_hit_type", ExportFlags::TRACKER_CLUSTERING, true, true),
    bank("trackerTrajectories", "tracker_trajectory_type", ExportFlags::TRACKER_TRAJECTORIES, true, true),
    bank("trackerTrajectoryOrphanHits", "tracker_trajectory_orphan_hit_type", ExportFlags::TRACKER_TRAJECTORIES, true, true),
    bank("trackerTrajectoryPatterns", "tracker_trajectory_pattern_type", ExportFlags::TRACKER_TRAJECTORIES, true, true),
    bank("trackerTrajectoryVertices", "vertex_type", ExportFlags::TRACKER_TRAJECTORIES, true, false),
    bank("trackerTrajectoryPolyline", "polyline_type", ExportFlags::TRACKER_TRAJECTORIES, true, false),
    bank("trackerTrajectoryHelix", "helix_type", ExportFlags::TRACKER_TRAJECTORIES, true, false),
];

pub fn bank_spec(name: &str) -> Option<&'static BankSpec> {
    BANKS.iter().find(|b| b.name == name)
}

/// Element access instrumentation point. Compiled to nothing in release builds.
#[inline(always)]
fn audit_vector(bank: &str, index: usize, len: usize) {
    if cfg!(debug_assertions) && index >= len {
        trace!(bank, index, len, "out of range element access");
    }
}

/// Type-erased read access to one bank's records.
trait RecordSeq {
    fn count(&self) -> usize;
    fn field(&self, index: usize, leaf: usize) -> Option<Value>;
}

impl<T: ExportRecord> RecordSeq for Vec<T> {
    fn count(&self) -> usize {
        self.len()
    }

    fn field(&self, index: usize, leaf: usize) -> Option<Value> {
        self.get(index).and_then(|record| record.value(leaf))
    }
}

impl RecordSeq for EventHeader {
    fn count(&self) -> usize {
        1
    }

    fn field(&self, index: usize, leaf: usize) -> Option<Value> {
        if index == 0 {
            ExportRecord::value(self, leaf)
        } else {
            None
        }
    }
}

/// Borrowed view of one bank, used by the column materializer.
pub struct BankView<'a> {
    spec: &'static BankSpec,
    records: &'a dyn RecordSeq,
}

impl<'a> BankView<'a> {
    pub fn spec(&self) -> &'static BankSpec {
        self.spec
    }

    /// Number of records; always 1 for the header.
    pub fn len(&self) -> usize {
        self.records.count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.count() == 0
    }

    /// Field `leaf` of record `index`.
    pub fn value(&self, index: usize, leaf: usize) -> Option<Value> {
        audit_vector(self.spec.name, index, self.records.count());
        self.records.field(index, leaf)
    }
}

/// Flattened view of one physics event.
#[derive(Clone, Debug, Default)]
pub struct ExportEvent {
    pub event_header: EventHeader,
    pub true_vertices: Vec<TrueVertex>,
    pub true_particles: Vec<TrueParticle>,
    pub true_step_hits: Vec<TrueStepHit>,
    pub true_calo_hits: Vec<TrueScinHit>,
    pub true_xcalo_hits: Vec<TrueScinHit>,
    pub true_gveto_hits: Vec<TrueScinHit>,
    pub true_gg_hits: Vec<TrueGgHit>,
    pub calib_scin_hits: Vec<CalibCalorimeterHit>,
    pub calib_gg_hits: Vec<CalibTrackerHit>,
    pub tracker_clusters: Vec<TrackerCluster>,
    pub tracker_clustered_hits: Vec<TrackerClusteredHit>,
    pub tracker_trajectories: Vec<TrackerTrajectory>,
    pub tracker_trajectory_vertices: Vec<Vertex>,
    pub tracker_trajectory_polylines: Vec<Polyline>,
    pub tracker_trajectory_helices: Vec<Helix>,
    pub tracker_trajectory_orphan_hits: Vec<TrackerTrajectoryOrphanHit>,
    pub tracker_trajectory_patterns: Vec<TrackerTrajectoryPattern>,
}

macro_rules! element_getters {
    ($($getter:ident: $field:ident => $record:ty, $bank:literal;)*) => {
        $(
            pub fn $getter(&self, index: usize) -> Option<&$record> {
                audit_vector($bank, index, self.$field.len());
                self.$field.get(index)
            }
        )*
    };
}

impl ExportEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the header and empty every sequence. Capacity is kept.
    pub fn clear_data(&mut self) {
        self.event_header.reset();
        self.true_vertices.clear();
        self.true_particles.clear();
        self.true_step_hits.clear();
        self.true_calo_hits.clear();
        self.true_xcalo_hits.clear();
        self.true_gveto_hits.clear();
        self.true_gg_hits.clear();
        self.calib_scin_hits.clear();
        self.calib_gg_hits.clear();
        self.tracker_clusters.clear();
        self.tracker_clustered_hits.clear();
        self.tracker_trajectories.clear();
        self.tracker_trajectory_vertices.clear();
        self.tracker_trajectory_polylines.clear();
        self.tracker_trajectory_helices.clear();
        self.tracker_trajectory_orphan_hits.clear();
        self.tracker_trajectory_patterns.clear();
    }

    element_getters! {
        true_vertex: true_vertices => TrueVertex, "trueVertices";
        true_particle: true_particles => TrueParticle, "trueParticles";
        true_step_hit: true_step_hits => TrueStepHit, "trueStepHits";
        true_calo_hit: true_calo_hits => TrueScinHit, "trueCaloHits";
        true_xcalo_hit: true_xcalo_hits => TrueScinHit, "trueXcaloHits";
        true_gveto_hit: true_gveto_hits => TrueScinHit, "trueGvetoHits";
        true_gg_hit: true_gg_hits => TrueGgHit, "trueGgHits";
        calib_scin_hit: calib_scin_hits => CalibCalorimeterHit, "calibScinHits";
        calib_gg_hit: calib_gg_hits => CalibTrackerHit, "calibTrackerHits";
        tracker_cluster: tracker_clusters => TrackerCluster, "trackerClusters";
        tracker_clustered_hit: tracker_clustered_hits => TrackerClusteredHit, "trackerClusteredHits";
        tracker_trajectory: tracker_trajectories => TrackerTrajectory, "trackerTrajectories";
        tracker_trajectory_vertex: tracker_trajectory_vertices => Vertex, "trackerTrajectoryVertices";
        tracker_trajectory_polyline: tracker_trajectory_polylines => Polyline, "trackerTrajectoryPolyline";
        tracker_trajectory_helix: tracker_trajectory_helices => Helix, "trackerTrajectoryHelix";
        tracker_trajectory_orphan_hit: tracker_trajectory_orphan_hits => TrackerTrajectoryOrphanHit, "trackerTrajectoryOrphanHits";
        tracker_trajectory_pattern: tracker_trajectory_patterns => TrackerTrajectoryPattern, "trackerTrajectoryPatterns";
    }

    /// View of the bank exported under `name`.
    pub fn bank(&self, name: &str) -> Option<BankView<'_>> {
        let spec = bank_spec(name)?;
        let records: &dyn RecordSeq = match spec.name {
            "header" => &self.event_header,
            "trueVertices" => &self.true_vertices,
            "trueParticles" => &self.true_particles,
            "trueStepHits" => &self.true_step_hits,
            "trueCaloHits" => &self.true_calo_hits,
            "trueXcaloHits" => &self.true_xcalo_hits,
            "trueGvetoHits" => &self.true_gveto_hits,
            "trueGgHits" => &self.true_gg_hits,
            "calibScinHits" => &self.calib_scin_hits,
            "calibTrackerHits" => &self.calib_gg_hits,
            "trackerClusters" => &self.tracker_clusters,
            "trackerClusteredHits" => &self.tracker_clustered_hits,
            "trackerTrajectories" => &self.tracker_trajectories,
            "trackerTrajectoryOrphanHits" => &self.tracker_trajectory_orphan_hits,
            "trackerTrajectoryPatterns" => &self.tracker_trajectory_patterns,
            "trackerTrajectoryVertices" => &self.tracker_trajectory_vertices,
            "trackerTrajectoryPolyline" => &self.tracker_trajectory_polylines,
            "trackerTrajectoryHelix" => &self.tracker_trajectory_helices,
            _ => return None,
        };
        Some(BankView { spec, records })
    }

    /// True when no sequence holds a record.
    pub fn is_empty(&self) -> bool {
        BANKS
            .iter()
            .filter(|b| b.array)
            .filter_map(|b| self.bank(b.name))
            .all(|view| view.is_empty())
    }

    /// Render a summary tree.
    pub fn print<W: fmt::Write>(&self, out: &mut W, title: &str, indent: &str) -> fmt::Result {
        if !title.is_empty() {
            writeln!(out, "{indent}{title}:")?;
        }
        let h = &self.event_header;
        writeln!(
            out,
            "{indent}|-- header: run={} event={} simulated={} time={}s+{}ps",
            h.run_number, h.event_number, h.simulated, h.seconds, h.picoseconds
        )?;
        let arrays: Vec<_> = BANKS.iter().filter(|b| b.array).collect();
        for (i, spec) in arrays.iter().enumerate() {
            let tag = if i + 1 == arrays.len() { "`-- " } else { "|-- " };
            let len = self.bank(spec.name).map(|v| v.len()).unwrap_or(0);
            writeln!(out, "{indent}{tag}{}: {len}", spec.name)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, "Export event", "")
    }
}
