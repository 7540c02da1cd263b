//! Source event model consumed read-only by the exporter.
//!
//! An event record is a set of named banks. Quantities are stored in the
//! internal unit system (mm, ns, MeV). Cross references between hits,
//! clusters and trajectories are by hit id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::geom::GeomId;
use super::properties::Properties;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Event identification and timestamp.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventHeaderData {
    pub run_number: i32,
    pub event_number: i32,
    #[serde(default)]
    pub simulated: bool,
    #[serde(default)]
    pub seconds: i64,
    #[serde(default)]
    pub picoseconds: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryParticle {
    pub particle_type: i32,
    pub momentum: Vector3,
    #[serde(default)]
    pub time: f64,
}

/// Generator output: emission time and primary particles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryEvent {
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub particles: Vec<PrimaryParticle>,
}

/// Monte Carlo energy deposit step in one detector part.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepHit {
    pub hit_id: i32,
    pub geom_id: GeomId,
    pub time_start: f64,
    pub time_stop: f64,
    pub position_start: Vector3,
    pub position_stop: Vector3,
    pub momentum_start: Vector3,
    pub momentum_stop: Vector3,
    pub energy_deposit: f64,
    pub auxiliaries: Properties,
}

/// Monte Carlo truth of one event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedData {
    pub vertex: Vector3,
    pub primary_event: PrimaryEvent,
    /// Step hits keyed by detector category (`calo`, `xcalo`, `gveto`, `gg`, ...).
    pub step_hits: BTreeMap<String, Vec<StepHit>>,
}

impl SimulatedData {
    pub fn has_step_hits(&self, category: &str) -> bool {
        self.step_hits.contains_key(category)
    }

    pub fn step_hits(&self, category: &str) -> &[StepHit] {
        self.step_hits
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibratedCalorimeterHit {
    pub hit_id: i32,
    pub geom_id: GeomId,
    pub time: f64,
    pub sigma_time: f64,
    pub energy: f64,
    pub sigma_energy: f64,
    pub auxiliaries: Properties,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibratedTrackerHit {
    pub hit_id: i32,
    pub geom_id: GeomId,
    pub noisy: bool,
    pub delayed: bool,
    pub bottom_cathode_missing: bool,
    pub top_cathode_missing: bool,
    pub delayed_time: Option<f64>,
    pub delayed_time_error: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub sigma_z: f64,
    pub r: f64,
    pub sigma_r: f64,
    pub auxiliaries: Properties,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibratedData {
    pub calorimeter_hits: Vec<CalibratedCalorimeterHit>,
    pub tracker_hits: Vec<CalibratedTrackerHit>,
}

/// Group of tracker hits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub cluster_id: i32,
    pub geom_id: Option<GeomId>,
    pub delayed: bool,
    /// Ids of the member tracker hits.
    pub hits: Vec<i32>,
    pub auxiliaries: Properties,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSolution {
    pub solution_id: i32,
    pub clusters: Vec<Cluster>,
    pub unclustered_hits: Vec<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerClusteringData {
    pub solutions: Vec<ClusteringSolution>,
    pub default_index: Option<usize>,
}

impl TrackerClusteringData {
    pub fn default_solution(&self) -> Option<&ClusteringSolution> {
        self.solutions.get(self.default_index?)
    }
}

/// Fitted track candidate built on one cluster.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trajectory {
    pub trajectory_id: i32,
    pub geom_id: Option<GeomId>,
    pub cluster_id: i32,
    pub cluster_delayed: bool,
    /// Ids of the cluster hits the fit left out.
    pub orphans: Vec<i32>,
    pub auxiliaries: Properties,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectorySolution {
    pub solution_id: i32,
    pub trajectories: Vec<Trajectory>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerTrajectoryData {
    pub solutions: Vec<TrajectorySolution>,
    pub default_index: Option<usize>,
}

impl TrackerTrajectoryData {
    pub fn default_solution(&self) -> Option<&TrajectorySolution> {
        self.solutions.get(self.default_index?)
    }
}

/// A typed data block of an event record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bank {
    EventHeader(EventHeaderData),
    SimulatedData(SimulatedData),
    CalibratedData(CalibratedData),
    TrackerClusteringData(TrackerClusteringData),
    TrackerTrajectoryData(TrackerTrajectoryData),
}

impl Bank {
    pub fn kind(&self) -> &'static str {
        match self {
            Bank::EventHeader(_) => "event header",
            Bank::SimulatedData(_) => "simulated data",
            Bank::CalibratedData(_) => "calibrated data",
            Bank::TrackerClusteringData(_) => "tracker clustering data",
            Bank::TrackerTrajectoryData(_) => "tracker trajectory data",
        }
    }
}

/// One physics event: banks keyed by label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRecord {
    banks: BTreeMap<String, Bank>,
}

macro_rules! bank_accessor {
    ($($getter:ident => $variant:ident($data:ty);)*) => {
        $(
            /// Bank under `label` if it exists and has the expected kind.
            pub fn $getter(&self, label: &str) -> Option<&$data> {
                match self.banks.get(label)? {
                    Bank::$variant(data) => Some(data),
                    _ => None,
                }
            }
        )*
    };
}

impl EventRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: impl Into<String>, bank: Bank) {
        self.banks.insert(label.into(), bank);
    }

    pub fn has(&self, label: &str) -> bool {
        self.banks.contains_key(label)
    }

    pub fn get(&self, label: &str) -> Option<&Bank> {
        self.banks.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.banks.keys().map(String::as_str)
    }

    bank_accessor! {
        event_header => EventHeader(EventHeaderData);
        simulated_data => SimulatedData(SimulatedData);
        calibrated_data => CalibratedData(CalibratedData);
        tracker_clustering_data => TrackerClusteringData(TrackerClusteringData);
        tracker_trajectory_data => TrackerTrajectoryData(TrackerTrajectoryData);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_record_from_json() {
        let record: EventRecord = serde_json::from_str(
            r#"{
                "EH": {"kind": "event_header", "run_number": 7, "event_number": 42, "simulated": true},
                "TCD": {"kind": "tracker_clustering_data",
                        "solutions": [{"solution_id": 3, "clusters": [{"cluster_id": 0, "hits": [1, 2]}],
                                       "unclustered_hits": [5]}],
                        "default_index": 0}
            }"#,
        )
        .unwrap();
        let eh = record.event_header("EH").unwrap();
        assert_eq!(eh.run_number, 7);
        assert!(eh.simulated);
        assert_eq!(eh.seconds, 0);

        let tcd = record.tracker_clustering_data("TCD").unwrap();
        let solution = tcd.default_solution().unwrap();
        assert_eq!(solution.solution_id, 3);
        assert_eq!(solution.clusters[0].hits, vec![1, 2]);
        assert!(solution.clusters[0].geom_id.is_none());

        assert!(record.simulated_data("EH").is_none());
        assert!(record.calibrated_data("CD").is_none());
        assert_eq!(record.get("EH").unwrap().kind(), "event header");
    }

    #[test]
    fn test_default_solution_absent() {
        let tcd = TrackerClusteringData {
            solutions: vec![ClusteringSolution::default()],
            default_index: None,
        };
        assert!(tcd.default_solution().is_none());
        let ttd = TrackerTrajectoryData {
            solutions: vec![],
            default_index: Some(0),
        };
        assert!(ttd.default_solution().is_none());
    }

    #[test]
    fn test_step_hit_categories() {
        let mut sd = SimulatedData::default();
        sd.step_hits.insert("calo".into(), vec![StepHit::default()]);
        assert!(sd.has_step_hits("calo"));
        assert!(!sd.has_step_hits("gg"));
        assert_eq!(sd.step_hits("calo").len(), 1);
        assert!(sd.step_hits("gg").is_empty());
    }
}
