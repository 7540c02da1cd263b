//! Flattened export records.
//!
//! Every record is a plain row type whose fields are either ids, geometry axes,
//! flags or physical quantities already divided by their export unit. A fresh
//! (or reset) record holds only invalid sentinels: `-1` for signed integers,
//! `0` for unsigned counters, `NaN` for reals and `false` for flags.
//!
//! The exported name, type, unit and sub-topic of each field are declared once
//! in the record's [`ExportRecord::fields`] table.

use super::constants::{CAT_TOPIC, INVALID_DOUBLE, INVALID_ID, INVALID_INTEGER, INVALID_INTEGER64};
use super::schema::{descriptors, ExportRecord, FieldDescriptor};

/// Event header.
///
/// # Fields
/// - `run_number`, `event_number`: event identification
/// - `simulated`: the event comes from the Monte Carlo chain
/// - `seconds`, `picoseconds`: event timestamp
/// - `export_cat_infos`: extended reconstruction columns are present downstream
#[derive(Clone, Debug, PartialEq)]
pub struct EventHeader {
    pub run_number: i32,
    pub event_number: i32,
    pub simulated: bool,
    pub seconds: i64,
    pub picoseconds: i64,
    pub export_cat_infos: bool,
}

impl Default for EventHeader {
    fn default() -> Self {
        Self {
            run_number: INVALID_INTEGER,
            event_number: INVALID_INTEGER,
            simulated: false,
            seconds: INVALID_INTEGER64,
            picoseconds: INVALID_INTEGER64,
            export_cat_infos: false,
        }
    }
}

impl ExportRecord for EventHeader {
    const TYPE_NAME: &'static str = "event_header_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<EventHeader>] = descriptors![EventHeader;
            "runNumber": Int32 => run_number,
            "eventNumber": Int32 => event_number,
            "simulated": Bool => simulated,
            "seconds": Int64 => seconds,
            "picoseconds": Int64 => picoseconds,
            "export_cat_infos": Bool => export_cat_infos,
        ];
        FIELDS
    }
}

/// Monte Carlo primary vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct TrueVertex {
    pub vertex_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub time: f64,
}

impl Default for TrueVertex {
    fn default() -> Self {
        Self {
            vertex_id: INVALID_ID,
            x: INVALID_DOUBLE,
            y: INVALID_DOUBLE,
            z: INVALID_DOUBLE,
            time: INVALID_DOUBLE,
        }
    }
}

impl ExportRecord for TrueVertex {
    const TYPE_NAME: &'static str = "true_vertex_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrueVertex>] = descriptors![TrueVertex;
            "vertexId": Int32 => vertex_id,
            "x": Double ["mm"] => x,
            "y": Double ["mm"] => y,
            "z": Double ["mm"] => z,
            "time": Double ["ns"] => time,
        ];
        FIELDS
    }
}

/// Monte Carlo primary particle.
///
/// # Fields
/// - `track_id`: rank of the particle in the primary event
/// - `particle_type`: generator particle code
/// - `px`, `py`, `pz`: momentum in keV
/// - `time`: emission time in ns
/// - `vertex_id`: owning vertex (references `TrueVertex.vertex_id`)
#[derive(Clone, Debug, PartialEq)]
pub struct TrueParticle {
    pub track_id: i32,
    pub particle_type: i32,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub time: f64,
    pub vertex_id: i32,
}

impl Default for TrueParticle {
    fn default() -> Self {
        Self {
            track_id: INVALID_ID,
            particle_type: INVALID_INTEGER,
            px: INVALID_DOUBLE,
            py: INVALID_DOUBLE,
            pz: INVALID_DOUBLE,
            time: INVALID_DOUBLE,
            vertex_id: INVALID_ID,
        }
    }
}

impl ExportRecord for TrueParticle {
    const TYPE_NAME: &'static str = "true_particle_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrueParticle>] = descriptors![TrueParticle;
            "trackId": Int32 => track_id,
            "particle_type": Int32 => particle_type,
            "px": Double ["keV"] => px,
            "py": Double ["keV"] => py,
            "pz": Double ["keV"] => pz,
            "time": Double ["ns"] => time,
            "vertexId": Int32 => vertex_id,
        ];
        FIELDS
    }
}

/// Raw Monte Carlo step.
#[derive(Clone, Debug, PartialEq)]
pub struct TrueStepHit {
    pub hit_id: i32,
    pub t_start: f64,
    pub x_start: f64,
    pub y_start: f64,
    pub z_start: f64,
    pub px_start: f64,
    pub py_start: f64,
    pub pz_start: f64,
    pub t_stop: f64,
    pub x_stop: f64,
    pub y_stop: f64,
    pub z_stop: f64,
    pub px_stop: f64,
    pub py_stop: f64,
    pub pz_stop: f64,
    pub delta_energy: f64,
}

impl Default for TrueStepHit {
    fn default() -> Self {
        Self {
            hit_id: INVALID_ID,
            t_start: INVALID_DOUBLE,
            x_start: INVALID_DOUBLE,
            y_start: INVALID_DOUBLE,
            z_start: INVALID_DOUBLE,
            px_start: INVALID_DOUBLE,
            py_start: INVALID_DOUBLE,
            pz_start: INVALID_DOUBLE,
            t_stop: INVALID_DOUBLE,
            x_stop: INVALID_DOUBLE,
            y_stop: INVALID_DOUBLE,
            z_stop: INVALID_DOUBLE,
            px_stop: INVALID_DOUBLE,
            py_stop: INVALID_DOUBLE,
            pz_stop: INVALID_DOUBLE,
            delta_energy: INVALID_DOUBLE,
        }
    }
}

impl ExportRecord for TrueStepHit {
    const TYPE_NAME: &'static str = "true_step_hit_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrueStepHit>] = descriptors![TrueStepHit;
            "hitId": Int32 => hit_id,
            "tStart": Double ["ns"] => t_start,
            "xStart": Double ["mm"] => x_start,
            "yStart": Double ["mm"] => y_start,
            "zStart": Double ["mm"] => z_start,
            "pxStart": Double ["keV"] => px_start,
            "pyStart": Double ["keV"] => py_start,
            "pzStart": Double ["keV"] => pz_start,
            "tStop": Double ["ns"] => t_stop,
            "xStop": Double ["mm"] => x_stop,
            "yStop": Double ["mm"] => y_stop,
            "zStop": Double ["mm"] => z_stop,
            "pxStop": Double ["keV"] => px_stop,
            "pyStop": Double ["keV"] => py_stop,
            "pzStop": Double ["keV"] => pz_stop,
            "deltaEnergy": Double ["keV"] => delta_energy,
        ];
        FIELDS
    }
}

/// Monte Carlo drift-cell hit.
///
/// The ionization point is the start of the source step, the anode point its
/// stop position.
#[derive(Clone, Debug, PartialEq)]
pub struct TrueGgHit {
    pub hit_id: i32,
    pub module: i32,
    pub side: i32,
    pub layer: i32,
    pub row: i32,
    pub t_ionization: f64,
    pub x_ionization: f64,
    pub y_ionization: f64,
    pub z_ionization: f64,
    pub px_ionization: f64,
    pub py_ionization: f64,
    pub pz_ionization: f64,
    pub x_anode: f64,
    pub y_anode: f64,
    pub z_anode: f64,
}

impl Default for TrueGgHit {
    fn default() -> Self {
        Self {
            hit_id: INVALID_ID,
            module: INVALID_INTEGER,
            side: INVALID_INTEGER,
            layer: INVALID_INTEGER,
            row: INVALID_INTEGER,
            t_ionization: INVALID_DOUBLE,
            x_ionization: INVALID_DOUBLE,
            y_ionization: INVALID_DOUBLE,
            z_ionization: INVALID_DOUBLE,
            px_ionization: INVALID_DOUBLE,
            py_ionization: INVALID_DOUBLE,
            pz_ionization: INVALID_DOUBLE,
            x_anode: INVALID_DOUBLE,
            y_anode: INVALID_DOUBLE,
            z_anode: INVALID_DOUBLE,
        }
    }
}

impl ExportRecord for TrueGgHit {
    const TYPE_NAME: &'static str = "true_gg_hit_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrueGgHit>] = descriptors![TrueGgHit;
            "hitId": Int32 => hit_id,
            "module": Int32 => module,
            "side": Int32 => side,
            "layer": Int32 => layer,
            "row": Int32 => row,
            "tIonization": Double ["ns"] => t_ionization,
            "xIonization": Double ["mm"] => x_ionization,
            "yIonization": Double ["mm"] => y_ionization,
            "zIonization": Double ["mm"] => z_ionization,
            "pxIonization": Double ["keV"] => px_ionization,
            "pyIonization": Double ["keV"] => py_ionization,
            "pzIonization": Double ["keV"] => pz_ionization,
            "xAnode": Double ["mm"] => x_anode,
            "yAnode": Double ["mm"] => y_anode,
            "zAnode": Double ["mm"] => z_anode,
        ];
        FIELDS
    }
}

/// Monte Carlo scintillator hit, shared by the calorimeter, peripheral
/// (xcalo) and gamma-veto families.
///
/// # Fields
/// - `block_type`: `ScinBlockType` code (exported as `type`)
/// - `module`, `side`, `column`, `row`, `wall`: geometry axes; an axis the
///   family does not have stays at `-1`
/// - `t_first`, `t_last`: step time window in ns
/// - `x1`..`z2`: step start and stop positions in mm
/// - `delta_energy`: deposited energy in keV
#[derive(Clone, Debug, PartialEq)]
pub struct TrueScinHit {
    pub hit_id: i32,
    pub block_type: i32,
    pub module: i32,
    pub side: i32,
    pub column: i32,
    pub row: i32,
    pub wall: i32,
    pub t_first: f64,
    pub t_last: f64,
    pub x1: f64,
    pub y1: f64,
    pub z1: f64,
    pub x2: f64,
    pub y2: f64,
    pub z2: f64,
    pub delta_energy: f64,
}

impl Default for TrueScinHit {
    fn default() -> Self {
        Self {
            hit_id: INVALID_ID,
            block_type: INVALID_INTEGER,
            module: INVALID_INTEGER,
            side: INVALID_INTEGER,
            column: INVALID_INTEGER,
            row: INVALID_INTEGER,
            wall: INVALID_INTEGER,
            t_first: INVALID_DOUBLE,
            t_last: INVALID_DOUBLE,
            x1: INVALID_DOUBLE,
            y1: INVALID_DOUBLE,
            z1: INVALID_DOUBLE,
            x2: INVALID_DOUBLE,
            y2: INVALID_DOUBLE,
            z2: INVALID_DOUBLE,
            delta_energy: INVALID_DOUBLE,
        }
    }
}

impl ExportRecord for TrueScinHit {
    const TYPE_NAME: &'static str = "true_scin_hit_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrueScinHit>] = descriptors![TrueScinHit;
            "hitId": Int32 => hit_id,
            "type": Int32 => block_type,
            "module": Int32 => module,
            "side": Int32 => side,
            "column": Int32 => column,
            "row": Int32 => row,
            "wall": Int32 => wall,
            "tFirst": Double ["ns"] => t_first,
            "tLast": Double ["ns"] => t_last,
            "x1": Double ["mm"] => x1,
            "y1": Double ["mm"] => y1,
            "z1": Double ["mm"] => z1,
            "x2": Double ["mm"] => x2,
            "y2": Double ["mm"] => y2,
            "z2": Double ["mm"] => z2,
            "deltaEnergy": Double ["keV"] => delta_energy,
        ];
        FIELDS
    }
}

/// Calibrated drift-cell hit.
///
/// The `cat_*` fields ride in the `CAT` sub-topic and are only filled when
/// the extended topic is enabled and the source hit carries them.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibTrackerHit {
    pub hit_id: i32,
    pub true_hit_id: i32,
    pub module: i32,
    pub side: i32,
    pub layer: i32,
    pub row: i32,
    pub noisy: bool,
    pub missing_bottom_cathode: bool,
    pub missing_top_cathode: bool,
    pub delayed: bool,
    pub delayed_time: f64,
    pub delayed_time_error: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub sigma_z: f64,
    pub r: f64,
    pub sigma_r: f64,

    pub has_cat_infos: bool,
    pub cat_tangency_x: f64,
    pub cat_tangency_y: f64,
    pub cat_tangency_z: f64,
    pub cat_tangency_x_error: f64,
    pub cat_tangency_y_error: f64,
    pub cat_tangency_z_error: f64,
    pub cat_helix_x: f64,
    pub cat_helix_y: f64,
    pub cat_helix_z: f64,
    pub cat_helix_x_error: f64,
    pub cat_helix_y_error: f64,
    pub cat_helix_z_error: f64,
}

impl Default for CalibTrackerHit {
    fn default() -> Self {
        Self {
            hit_id: INVALID_ID,
            true_hit_id: INVALID_ID,
            module: INVALID_INTEGER,
            side: INVALID_INTEGER,
            layer: INVALID_INTEGER,
            row: INVALID_INTEGER,
            noisy: false,
            missing_bottom_cathode: false,
            missing_top_cathode: false,
            delayed: false,
            delayed_time: INVALID_DOUBLE,
            delayed_time_error: INVALID_DOUBLE,
            x: INVALID_DOUBLE,
            y: INVALID_DOUBLE,
            z: INVALID_DOUBLE,
            sigma_z: INVALID_DOUBLE,
            r: INVALID_DOUBLE,
            sigma_r: INVALID_DOUBLE,
            has_cat_infos: false,
            cat_tangency_x: INVALID_DOUBLE,
            cat_tangency_y: INVALID_DOUBLE,
            cat_tangency_z: INVALID_DOUBLE,
            cat_tangency_x_error: INVALID_DOUBLE,
            cat_tangency_y_error: INVALID_DOUBLE,
            cat_tangency_z_error: INVALID_DOUBLE,
            cat_helix_x: INVALID_DOUBLE,
            cat_helix_y: INVALID_DOUBLE,
            cat_helix_z: INVALID_DOUBLE,
            cat_helix_x_error: INVALID_DOUBLE,
            cat_helix_y_error: INVALID_DOUBLE,
            cat_helix_z_error: INVALID_DOUBLE,
        }
    }
}

impl ExportRecord for CalibTrackerHit {
    const TYPE_NAME: &'static str = "calib_tracker_hit_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<CalibTrackerHit>] = descriptors![CalibTrackerHit;
            "hitId": Int32 => hit_id,
            "trueHitId": Int32 => true_hit_id,
            "module": Int32 => module,
            "side": Int32 => side,
            "layer": Int32 => layer,
            "row": Int32 => row,
            "noisy": Bool => noisy,
            "missingBottomCathode": Bool => missing_bottom_cathode,
            "missingTopCathode": Bool => missing_top_cathode,
            "delayed": Bool => delayed,
            "delayedTime": Double ["ns"] => delayed_time,
            "delayedTimeError": Double ["ns"] => delayed_time_error,
            "x": Double ["mm"] => x,
            "y": Double ["mm"] => y,
            "z": Double ["mm"] => z,
            "sigmaZ": Double ["mm"] => sigma_z,
            "r": Double ["mm"] => r,
            "sigmaR": Double ["mm"] => sigma_r,
            "hasCatInfos": Bool in CAT_TOPIC => has_cat_infos,
            "catTangencyX": Double in CAT_TOPIC => cat_tangency_x,
            "catTangencyY": Double in CAT_TOPIC => cat_tangency_y,
            "catTangencyZ": Double in CAT_TOPIC => cat_tangency_z,
            "catTangencyXError": Double in CAT_TOPIC => cat_tangency_x_error,
            "catTangencyYError": Double in CAT_TOPIC => cat_tangency_y_error,
            "catTangencyZError": Double in CAT_TOPIC => cat_tangency_z_error,
            "catHelixX": Double in CAT_TOPIC => cat_helix_x,
            "catHelixY": Double in CAT_TOPIC => cat_helix_y,
            "catHelixZ": Double in CAT_TOPIC => cat_helix_z,
            "catHelixXError": Double in CAT_TOPIC => cat_helix_x_error,
            "catHelixYError": Double in CAT_TOPIC => cat_helix_y_error,
            "catHelixZError": Double in CAT_TOPIC => cat_helix_z_error,
        ];
        FIELDS
    }
}

/// Calibrated scintillator hit (any of the three block families).
#[derive(Clone, Debug, PartialEq)]
pub struct CalibCalorimeterHit {
    pub hit_id: i32,
    pub true_hit_id: i32,
    pub block_type: i32,
    pub module: i32,
    pub side: i32,
    pub column: i32,
    pub row: i32,
    pub wall: i32,
    pub time: f64,
    pub sigma_time: f64,
    pub energy: f64,
    pub sigma_energy: f64,
}

impl Default for CalibCalorimeterHit {
    fn default() -> Self {
        Self {
            hit_id: INVALID_ID,
            true_hit_id: INVALID_ID,
            block_type: INVALID_INTEGER,
            module: INVALID_INTEGER,
            side: INVALID_INTEGER,
            column: INVALID_INTEGER,
            row: INVALID_INTEGER,
            wall: INVALID_INTEGER,
            time: INVALID_DOUBLE,
            sigma_time: INVALID_DOUBLE,
            energy: INVALID_DOUBLE,
            sigma_energy: INVALID_DOUBLE,
        }
    }
}

impl ExportRecord for CalibCalorimeterHit {
    const TYPE_NAME: &'static str = "calib_calorimeter_hit_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<CalibCalorimeterHit>] = descriptors![CalibCalorimeterHit;
            "hitId": Int32 => hit_id,
            "trueHitId": Int32 => true_hit_id,
            "type": Int32 => block_type,
            "module": Int32 => module,
            "side": Int32 => side,
            "column": Int32 => column,
            "row": Int32 => row,
            "wall": Int32 => wall,
            "time": Double ["ns"] => time,
            "sigmaTime": Double ["ns"] => sigma_time,
            "energy": Double ["keV"] => energy,
            "sigmaEnergy": Double ["keV"] => sigma_energy,
        ];
        FIELDS
    }
}

/// Membership of one tracker hit in a clustering solution.
///
/// `cluster_id == -1` marks a hit the solution left unclustered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerClusteredHit {
    pub solution_id: i32,
    pub cluster_id: i32,
    pub hit_id: i32,
}

impl Default for TrackerClusteredHit {
    fn default() -> Self {
        Self {
            solution_id: INVALID_ID,
            cluster_id: INVALID_ID,
            hit_id: INVALID_ID,
        }
    }
}

impl ExportRecord for TrackerClusteredHit {
    const TYPE_NAME: &'static str = "tracker_clustered_hit_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrackerClusteredHit>] = descriptors![TrackerClusteredHit;
            "solutionId": Int32 => solution_id,
            "clusterId": Int32 => cluster_id,
            "hitId": Int32 => hit_id,
        ];
        FIELDS
    }
}

/// Tracker cluster of the default clustering solution.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerCluster {
    pub solution_id: i32,
    pub cluster_id: i32,
    pub module: i32,
    pub side: i32,
    pub delayed: bool,
    pub number_of_hits: u32,

    pub has_cat_infos: bool,
    pub cat_has_charge: bool,
    pub cat_charge: f64,
    pub cat_has_momentum: bool,
    pub cat_momentum_x: f64,
    pub cat_momentum_y: f64,
    pub cat_momentum_z: f64,
    pub cat_has_helix_vertex: bool,
    pub cat_helix_vertex_x: f64,
    pub cat_helix_vertex_y: f64,
    pub cat_helix_vertex_z: f64,
    pub cat_helix_vertex_x_error: f64,
    pub cat_helix_vertex_y_error: f64,
    pub cat_helix_vertex_z_error: f64,
    pub cat_has_helix_decay_vertex: bool,
    pub cat_helix_decay_vertex_x: f64,
    pub cat_helix_decay_vertex_y: f64,
    pub cat_helix_decay_vertex_z: f64,
    pub cat_helix_decay_vertex_x_error: f64,
    pub cat_helix_decay_vertex_y_error: f64,
    pub cat_helix_decay_vertex_z_error: f64,
    pub cat_has_tangent_vertex: bool,
    pub cat_tangent_vertex_x: f64,
    pub cat_tangent_vertex_y: f64,
    pub cat_tangent_vertex_z: f64,
    pub cat_tangent_vertex_x_error: f64,
    pub cat_tangent_vertex_y_error: f64,
    pub cat_tangent_vertex_z_error: f64,
    pub cat_has_tangent_decay_vertex: bool,
    pub cat_tangent_decay_vertex_x: f64,
    pub cat_tangent_decay_vertex_y: f64,
    pub cat_tangent_decay_vertex_z: f64,
    pub cat_tangent_decay_vertex_x_error: f64,
    pub cat_tangent_decay_vertex_y_error: f64,
    pub cat_tangent_decay_vertex_z_error: f64,
}

impl Default for TrackerCluster {
    fn default() -> Self {
        let mut cluster = Self {
            solution_id: INVALID_ID,
            cluster_id: INVALID_ID,
            module: INVALID_INTEGER,
            side: INVALID_INTEGER,
            delayed: false,
            number_of_hits: 0,
            has_cat_infos: false,
            cat_has_charge: false,
            cat_charge: 0.0,
            cat_has_momentum: false,
            cat_momentum_x: 0.0,
            cat_momentum_y: 0.0,
            cat_momentum_z: 0.0,
            cat_has_helix_vertex: false,
            cat_helix_vertex_x: 0.0,
            cat_helix_vertex_y: 0.0,
            cat_helix_vertex_z: 0.0,
            cat_helix_vertex_x_error: 0.0,
            cat_helix_vertex_y_error: 0.0,
            cat_helix_vertex_z_error: 0.0,
            cat_has_helix_decay_vertex: false,
            cat_helix_decay_vertex_x: 0.0,
            cat_helix_decay_vertex_y: 0.0,
            cat_helix_decay_vertex_z: 0.0,
            cat_helix_decay_vertex_x_error: 0.0,
            cat_helix_decay_vertex_y_error: 0.0,
            cat_helix_decay_vertex_z_error: 0.0,
            cat_has_tangent_vertex: false,
            cat_tangent_vertex_x: 0.0,
            cat_tangent_vertex_y: 0.0,
            cat_tangent_vertex_z: 0.0,
            cat_tangent_vertex_x_error: 0.0,
            cat_tangent_vertex_y_error: 0.0,
            cat_tangent_vertex_z_error: 0.0,
            cat_has_tangent_decay_vertex: false,
            cat_tangent_decay_vertex_x: 0.0,
            cat_tangent_decay_vertex_y: 0.0,
            cat_tangent_decay_vertex_z: 0.0,
            cat_tangent_decay_vertex_x_error: 0.0,
            cat_tangent_decay_vertex_y_error: 0.0,
            cat_tangent_decay_vertex_z_error: 0.0,
        };
        cluster.reset_cat();
        cluster
    }
}

impl TrackerCluster {
    /// Clear the `CAT` sub-topic fields only.
    pub fn reset_cat(&mut self) {
        self.has_cat_infos = false;
        self.cat_has_charge = false;
        self.cat_charge = INVALID_DOUBLE;
        self.cat_has_momentum = false;
        for v in [
            &mut self.cat_momentum_x,
            &mut self.cat_momentum_y,
            &mut self.cat_momentum_z,
        ] {
            *v = INVALID_DOUBLE;
        }
        self.cat_has_helix_vertex = false;
        self.cat_has_helix_decay_vertex = false;
        self.cat_has_tangent_vertex = false;
        self.cat_has_tangent_decay_vertex = false;
        for v in [
            &mut self.cat_helix_vertex_x,
            &mut self.cat_helix_vertex_y,
            &mut self.cat_helix_vertex_z,
            &mut self.cat_helix_vertex_x_error,
            &mut self.cat_helix_vertex_y_error,
            &mut self.cat_helix_vertex_z_error,
            &mut self.cat_helix_decay_vertex_x,
            &mut self.cat_helix_decay_vertex_y,
            &mut self.cat_helix_decay_vertex_z,
            &mut self.cat_helix_decay_vertex_x_error,
            &mut self.cat_helix_decay_vertex_y_error,
            &mut self.cat_helix_decay_vertex_z_error,
            &mut self.cat_tangent_vertex_x,
            &mut self.cat_tangent_vertex_y,
            &mut self.cat_tangent_vertex_z,
            &mut self.cat_tangent_vertex_x_error,
            &mut self.cat_tangent_vertex_y_error,
            &mut self.cat_tangent_vertex_z_error,
            &mut self.cat_tangent_decay_vertex_x,
            &mut self.cat_tangent_decay_vertex_y,
            &mut self.cat_tangent_decay_vertex_z,
            &mut self.cat_tangent_decay_vertex_x_error,
            &mut self.cat_tangent_decay_vertex_y_error,
            &mut self.cat_tangent_decay_vertex_z_error,
        ] {
            *v = INVALID_DOUBLE;
        }
    }
}

impl ExportRecord for TrackerCluster {
    const TYPE_NAME: &'static str = "tracker_cluster_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrackerCluster>] = descriptors![TrackerCluster;
            "solutionId": Int32 => solution_id,
            "clusterId": Int32 => cluster_id,
            "module": Int32 => module,
            "side": Int32 => side,
            "delayed": Bool => delayed,
            "numberOfHits": UInt32 => number_of_hits,
            "hasCatInfos": Bool in CAT_TOPIC => has_cat_infos,
            "catHasCharge": Bool in CAT_TOPIC => cat_has_charge,
            "catCharge": Double in CAT_TOPIC => cat_charge,
            "catHasMomentum": Bool in CAT_TOPIC => cat_has_momentum,
            "catMomentumX": Double in CAT_TOPIC => cat_momentum_x,
            "catMomentumY": Double in CAT_TOPIC => cat_momentum_y,
            "catMomentumZ": Double in CAT_TOPIC => cat_momentum_z,
            "catHasHelixVertex": Bool in CAT_TOPIC => cat_has_helix_vertex,
            "catHelixVertexX": Double in CAT_TOPIC => cat_helix_vertex_x,
            "catHelixVertexY": Double in CAT_TOPIC => cat_helix_vertex_y,
            "catHelixVertexZ": Double in CAT_TOPIC => cat_helix_vertex_z,
            "catHelixVertexXError": Double in CAT_TOPIC => cat_helix_vertex_x_error,
            "catHelixVertexYError": Double in CAT_TOPIC => cat_helix_vertex_y_error,
            "catHelixVertexZError": Double in CAT_TOPIC => cat_helix_vertex_z_error,
            "catHasHelixDecayVertex": Bool in CAT_TOPIC => cat_has_helix_decay_vertex,
            "catHelixDecayVertexX": Double in CAT_TOPIC => cat_helix_decay_vertex_x,
            "catHelixDecayVertexY": Double in CAT_TOPIC => cat_helix_decay_vertex_y,
            "catHelixDecayVertexZ": Double in CAT_TOPIC => cat_helix_decay_vertex_z,
            "catHelixDecayVertexXError": Double in CAT_TOPIC => cat_helix_decay_vertex_x_error,
            "catHelixDecayVertexYError": Double in CAT_TOPIC => cat_helix_decay_vertex_y_error,
            "catHelixDecayVertexZError": Double in CAT_TOPIC => cat_helix_decay_vertex_z_error,
            "catHasTangentVertex": Bool in CAT_TOPIC => cat_has_tangent_vertex,
            "catTangentVertexX": Double in CAT_TOPIC => cat_tangent_vertex_x,
            "catTangentVertexY": Double in CAT_TOPIC => cat_tangent_vertex_y,
            "catTangentVertexZ": Double in CAT_TOPIC => cat_tangent_vertex_z,
            "catTangentVertexXError": Double in CAT_TOPIC => cat_tangent_vertex_x_error,
            "catTangentVertexYError": Double in CAT_TOPIC => cat_tangent_vertex_y_error,
            "catTangentVertexZError": Double in CAT_TOPIC => cat_tangent_vertex_z_error,
            "catHasTangentDecayVertex": Bool in CAT_TOPIC => cat_has_tangent_decay_vertex,
            "catTangentDecayVertexX": Double in CAT_TOPIC => cat_tangent_decay_vertex_x,
            "catTangentDecayVertexY": Double in CAT_TOPIC => cat_tangent_decay_vertex_y,
            "catTangentDecayVertexZ": Double in CAT_TOPIC => cat_tangent_decay_vertex_z,
            "catTangentDecayVertexXError": Double in CAT_TOPIC => cat_tangent_decay_vertex_x_error,
            "catTangentDecayVertexYError": Double in CAT_TOPIC => cat_tangent_decay_vertex_y_error,
            "catTangentDecayVertexZError": Double in CAT_TOPIC => cat_tangent_decay_vertex_z_error,
        ];
        FIELDS
    }
}

/// Trajectory vertex (pattern end point).
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub vertex_id: i32,
    pub parent_type: i32,
    pub parent_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub x_error: f64,
    pub y_error: f64,
    pub z_error: f64,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            vertex_id: INVALID_ID,
            parent_type: INVALID_INTEGER,
            parent_id: INVALID_ID,
            x: INVALID_DOUBLE,
            y: INVALID_DOUBLE,
            z: INVALID_DOUBLE,
            x_error: INVALID_DOUBLE,
            y_error: INVALID_DOUBLE,
            z_error: INVALID_DOUBLE,
        }
    }
}

impl ExportRecord for Vertex {
    const TYPE_NAME: &'static str = "vertex_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<Vertex>] = descriptors![Vertex;
            "vertexId": Int32 => vertex_id,
            "parentType": Int32 => parent_type,
            "parentId": Int32 => parent_id,
            "x": Double ["mm"] => x,
            "y": Double ["mm"] => y,
            "z": Double ["mm"] => z,
            "xError": Double ["mm"] => x_error,
            "yError": Double ["mm"] => y_error,
            "zError": Double ["mm"] => z_error,
        ];
        FIELDS
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polyline {
    pub polyline_id: i32,
    pub number_of_vertexes: u32,
}

impl Default for Polyline {
    fn default() -> Self {
        Self {
            polyline_id: INVALID_ID,
            number_of_vertexes: 0,
        }
    }
}

impl ExportRecord for Polyline {
    const TYPE_NAME: &'static str = "polyline_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<Polyline>] = descriptors![Polyline;
            "polylineId": Int32 => polyline_id,
            "numberOfVertexes": UInt32 => number_of_vertexes,
        ];
        FIELDS
    }
}

/// Helix arc: center, radius, pitch and the angular range `[t0, t1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Helix {
    pub helix_id: i32,
    pub x0: f64,
    pub y0: f64,
    pub z0: f64,
    pub r: f64,
    pub step: f64,
    pub t0: f64,
    pub t1: f64,
}

impl Default for Helix {
    fn default() -> Self {
        Self {
            helix_id: INVALID_ID,
            x0: INVALID_DOUBLE,
            y0: INVALID_DOUBLE,
            z0: INVALID_DOUBLE,
            r: INVALID_DOUBLE,
            step: INVALID_DOUBLE,
            t0: INVALID_DOUBLE,
            t1: INVALID_DOUBLE,
        }
    }
}

impl ExportRecord for Helix {
    const TYPE_NAME: &'static str = "helix_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<Helix>] = descriptors![Helix;
            "helixId": Int32 => helix_id,
            "x0": Double => x0,
            "y0": Double => y0,
            "z0": Double => z0,
            "r": Double => r,
            "step": Double => step,
            "t0": Double => t0,
            "t1": Double => t1,
        ];
        FIELDS
    }
}

/// Tracker trajectory of the default trajectory solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerTrajectory {
    pub solution_id: i32,
    pub trajectory_id: i32,
    pub module: i32,
    pub side: i32,
    pub cluster_id: i32,
    pub delayed: bool,
    pub number_of_orphans: u32,
    pub pattern_id: i32,
}

impl Default for TrackerTrajectory {
    fn default() -> Self {
        Self {
            solution_id: INVALID_ID,
            trajectory_id: INVALID_ID,
            module: INVALID_INTEGER,
            side: INVALID_INTEGER,
            cluster_id: INVALID_ID,
            delayed: false,
            number_of_orphans: 0,
            pattern_id: INVALID_ID,
        }
    }
}

impl ExportRecord for TrackerTrajectory {
    const TYPE_NAME: &'static str = "tracker_trajectory_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrackerTrajectory>] = descriptors![TrackerTrajectory;
            "solutionId": Int32 => solution_id,
            "trajectoryId": Int32 => trajectory_id,
            "module": Int32 => module,
            "side": Int32 => side,
            "clusterId": Int32 => cluster_id,
            "delayed": Bool => delayed,
            "numberOfOrphans": UInt32 => number_of_orphans,
            "patternId": Int32 => pattern_id,
        ];
        FIELDS
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerTrajectoryOrphanHit {
    pub solution_id: i32,
    pub trajectory_id: i32,
    pub hit_id: i32,
}

impl Default for TrackerTrajectoryOrphanHit {
    fn default() -> Self {
        Self {
            solution_id: INVALID_ID,
            trajectory_id: INVALID_ID,
            hit_id: INVALID_ID,
        }
    }
}

impl ExportRecord for TrackerTrajectoryOrphanHit {
    const TYPE_NAME: &'static str = "tracker_trajectory_orphan_hit_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrackerTrajectoryOrphanHit>] = descriptors![TrackerTrajectoryOrphanHit;
            "solutionId": Int32 => solution_id,
            "trajectoryId": Int32 => trajectory_id,
            "hitId": Int32 => hit_id,
        ];
        FIELDS
    }
}

/// One-dimensional pattern fitted on a trajectory.
///
/// `pattern_type` holds a `PatternType` code; exactly one of `line_id`,
/// `polyline_id` and `helix_id` is meaningful for a given type.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerTrajectoryPattern {
    pub pattern_id: i32,
    pub solution_id: i32,
    pub trajectory_id: i32,
    pub pattern_type: i32,
    pub length: f64,
    pub vertex0_id: i32,
    pub vertex1_id: i32,
    pub line_id: i32,
    pub helix_id: i32,
    pub polyline_id: i32,
}

impl Default for TrackerTrajectoryPattern {
    fn default() -> Self {
        Self {
            pattern_id: INVALID_ID,
            solution_id: INVALID_ID,
            trajectory_id: INVALID_ID,
            pattern_type: INVALID_INTEGER,
            length: INVALID_DOUBLE,
            vertex0_id: INVALID_ID,
            vertex1_id: INVALID_ID,
            line_id: INVALID_ID,
            helix_id: INVALID_ID,
            polyline_id: INVALID_ID,
        }
    }
}

impl ExportRecord for TrackerTrajectoryPattern {
    const TYPE_NAME: &'static str = "tracker_trajectory_pattern_type";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        static FIELDS: &[FieldDescriptor<TrackerTrajectoryPattern>] = descriptors![TrackerTrajectoryPattern;
            "patternId": Int32 => pattern_id,
            "solutionId": Int32 => solution_id,
            "trajectoryId": Int32 => trajectory_id,
            "patternType": Int32 => pattern_type,
            "length": Double ["mm"] => length,
            "vertex0Id": Int32 => vertex0_id,
            "vertex1Id": Int32 => vertex1_id,
            "lineId": Int32 => line_id,
            "helixId": Int32 => helix_id,
            "polylineId": Int32 => polyline_id,
        ];
        FIELDS
    }
}
