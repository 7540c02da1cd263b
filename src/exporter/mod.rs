//! Event exporter: maps a banked source event onto the flattened export
//! container under a topic bitmask.
//!
//! The exporter is a two-state machine. A geometry manager must be bound
//! (which resolves the geometry index table) before `initialize()`; `run()`
//! is only valid once initialized. A topic whose source bank is missing makes
//! the whole run fail: no sentinel rows are fabricated for it.

pub mod config;
pub mod flags;
pub mod gid;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, trace};

use crate::error::{ExportError, Result};
use crate::export::constants::{
    aux_keys, bank_labels, step_hit_categories, units, ScinBlockType, TopicLevel, CAT_TOPIC,
    INVALID_DOUBLE, INVALID_ID,
};
use crate::export::models::{
    CalibCalorimeterHit, CalibTrackerHit, TrackerCluster, TrackerClusteredHit, TrackerTrajectory,
    TrackerTrajectoryOrphanHit, TrueGgHit, TrueParticle, TrueScinHit, TrueVertex,
};
use crate::export::ExportEvent;
use crate::source::data::{
    CalibratedData, Cluster, EventHeaderData, EventRecord, SimulatedData, StepHit,
    TrackerClusteringData, TrackerTrajectoryData,
};
use crate::source::geom::GeometryManager;
use crate::source::properties::Properties;

pub use config::ExporterConfig;
pub use flags::ExportFlags;
pub use gid::GidInfo;

/// Maps source events onto [`ExportEvent`]s.
///
/// The bound geometry manager is borrowed and must outlive the exporter.
pub struct EventExporter<'g> {
    initialized: bool,
    geom_manager: Option<&'g dyn GeometryManager>,
    gid_info: Option<GidInfo>,
    config: ExporterConfig,
}

impl Default for EventExporter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventExporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventExporter")
            .field("initialized", &self.initialized)
            .field(
                "geometry",
                &self.geom_manager.map(|g| g.setup_label().to_string()),
            )
            .field("config", &self.config)
            .finish()
    }
}

impl fmt::Display for EventExporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_dump(f)
    }
}

impl<'g> EventExporter<'g> {
    pub fn new() -> Self {
        Self {
            initialized: false,
            geom_manager: None,
            gid_info: None,
            config: ExporterConfig::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Bind a geometry manager and resolve the geometry index table.
    pub fn set_geom_manager(&mut self, geom_manager: &'g dyn GeometryManager) -> Result<()> {
        if self.initialized {
            return Err(ExportError::AlreadyInitialized);
        }
        let gid_info = GidInfo::resolve(geom_manager.id_manager())?;
        debug!(
            setup = geom_manager.setup_label(),
            version = geom_manager.setup_version(),
            "bound geometry manager"
        );
        self.geom_manager = Some(geom_manager);
        self.gid_info = Some(gid_info);
        Ok(())
    }

    pub fn has_geom_manager(&self) -> bool {
        self.geom_manager.is_some()
    }

    pub fn geom_manager(&self) -> Option<&'g dyn GeometryManager> {
        self.geom_manager
    }

    pub fn gid_info(&self) -> Option<&GidInfo> {
        self.gid_info.as_ref()
    }

    pub fn initialize(&mut self, setup: &Properties) -> Result<()> {
        if self.initialized {
            return Err(ExportError::AlreadyInitialized);
        }
        if self.gid_info.is_none() {
            return Err(ExportError::NoGeometryManager);
        }
        self.config.apply(setup)?;
        self.config.flags = self.config.flags.or_all();
        self.initialized = true;
        info!(
            flags = %self.config.flags,
            cat_infos = self.config.export_cat_infos,
            "event exporter initialized"
        );
        Ok(())
    }

    /// Back to the uninitialized state with default labels, no topics and no
    /// bound geometry.
    pub fn reset(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(ExportError::NotInitialized);
        }
        self.initialized = false;
        self.config = ExporterConfig::default();
        self.geom_manager = None;
        self.gid_info = None;
        Ok(())
    }

    pub fn export_flags(&self) -> ExportFlags {
        self.config.flags
    }

    pub fn set_exported(&mut self, bit: ExportFlags) {
        self.config.flags.insert(bit);
    }

    pub fn unset_exported(&mut self, bit: ExportFlags) {
        self.config.flags = ExportFlags::from_bits_truncate(self.config.flags.bits() & !bit.bits());
    }

    pub fn is_exported(&self, bit: ExportFlags) -> bool {
        self.config.flags.intersects(bit)
    }

    pub fn are_cat_infos_exported(&self) -> bool {
        self.config.export_cat_infos
    }

    pub fn set_cat_infos_exported(&mut self, enabled: bool) {
        self.config.export_cat_infos = enabled;
    }

    pub fn bank_labels(&self) -> &BTreeMap<String, String> {
        &self.config.bank_labels
    }

    pub fn topic_export_level(&self, topic: &str) -> TopicLevel {
        if topic == CAT_TOPIC && self.config.export_cat_infos {
            TopicLevel::Include
        } else {
            TopicLevel::NoInclude
        }
    }

    /// Sub-topic levels handed to the columnar sink.
    pub fn topics(&self) -> BTreeMap<String, TopicLevel> {
        BTreeMap::from([(CAT_TOPIC.to_string(), self.topic_export_level(CAT_TOPIC))])
    }

    /// Human-readable state tree.
    pub fn dump(&self) -> String {
        self.to_string()
    }

    fn write_dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(out, "Event exporter:")?;
        writeln!(out, "|-- Initialized : {}", self.initialized)?;
        match self.geom_manager {
            Some(gm) => writeln!(
                out,
                "|-- Geometry manager : {} {}",
                gm.setup_label(),
                gm.setup_version()
            )?,
            None => writeln!(out, "|-- Geometry manager : <none>")?,
        }
        writeln!(out, "|-- Bank labels :")?;
        let n = self.config.bank_labels.len();
        for (i, (logical, label)) in self.config.bank_labels.iter().enumerate() {
            let tag = if i + 1 == n { "`-- " } else { "|-- " };
            writeln!(out, "|   {tag}{logical} : '{label}'")?;
        }
        writeln!(out, "|-- CAT infos : {}", self.config.export_cat_infos)?;
        writeln!(out, "`-- Export flags : [{}]", self.config.flags.bits())?;
        let n = ExportFlags::LABELED.len();
        for (i, (bit, label)) in ExportFlags::LABELED.iter().enumerate() {
            let tag = if i + 1 == n { "`-- " } else { "|-- " };
            let yes = if self.config.flags.contains(*bit) { "yes" } else { "no" };
            writeln!(out, "    {tag}Export '{label}' : {yes}")?;
        }
        Ok(())
    }

    /// Clear `ee` and fill it from `record` for every selected topic.
    pub fn run(&self, record: &EventRecord, ee: &mut ExportEvent) -> Result<()> {
        if !self.initialized {
            return Err(ExportError::NotInitialized);
        }
        let gid = self.gid_info.as_ref().ok_or(ExportError::NoGeometryManager)?;

        ee.clear_data();
        let flags = self.config.flags;
        if flags.contains(ExportFlags::EVENT_HEADER) {
            self.export_event_header(self.event_header(record)?, ee);
        }
        if flags.contains(ExportFlags::TRUE_PARTICLES) {
            self.export_true_particles(self.simulated_data(record)?, ee);
        }
        if flags.contains(ExportFlags::TRUE_STEP_HITS) {
            // Bank required; step hits are not exported yet.
            self.simulated_data(record)?;
        }
        if flags.contains(ExportFlags::TRUE_HITS) {
            self.export_true_hits(gid, self.simulated_data(record)?, ee);
        }
        if flags.contains(ExportFlags::CALIB_CALORIMETER_HITS) {
            self.export_calib_calorimeter_hits(gid, self.calibrated_data(record)?, ee);
        }
        if flags.contains(ExportFlags::CALIB_TRACKER_HITS) {
            self.export_calib_tracker_hits(gid, self.calibrated_data(record)?, ee);
        }
        if flags.contains(ExportFlags::TRACKER_CLUSTERING) {
            self.export_tracker_clustering(gid, self.tracker_clustering_data(record)?, ee);
        }
        if flags.contains(ExportFlags::TRACKER_TRAJECTORIES) {
            self.export_tracker_trajectories(gid, self.tracker_trajectory_data(record)?, ee);
        }
        Ok(())
    }

    fn missing(&self, logical: &str, kind: &'static str) -> ExportError {
        ExportError::MissingBank {
            label: self.config.bank_label(logical).to_string(),
            kind,
        }
    }

    fn event_header<'r>(&self, record: &'r EventRecord) -> Result<&'r EventHeaderData> {
        let label = self.config.bank_label(bank_labels::EVENT_HEADER);
        record
            .event_header(label)
            .ok_or_else(|| self.missing(bank_labels::EVENT_HEADER, "event header"))
    }

    fn simulated_data<'r>(&self, record: &'r EventRecord) -> Result<&'r SimulatedData> {
        let label = self.config.bank_label(bank_labels::SIMULATED_DATA);
        record
            .simulated_data(label)
            .ok_or_else(|| self.missing(bank_labels::SIMULATED_DATA, "simulated data"))
    }

    fn calibrated_data<'r>(&self, record: &'r EventRecord) -> Result<&'r CalibratedData> {
        let label = self.config.bank_label(bank_labels::CALIBRATED_DATA);
        record
            .calibrated_data(label)
            .ok_or_else(|| self.missing(bank_labels::CALIBRATED_DATA, "calibrated data"))
    }

    fn tracker_clustering_data<'r>(
        &self,
        record: &'r EventRecord,
    ) -> Result<&'r TrackerClusteringData> {
        let label = self.config.bank_label(bank_labels::TRACKER_CLUSTERING_DATA);
        record.tracker_clustering_data(label).ok_or_else(|| {
            self.missing(bank_labels::TRACKER_CLUSTERING_DATA, "tracker clustering data")
        })
    }

    fn tracker_trajectory_data<'r>(
        &self,
        record: &'r EventRecord,
    ) -> Result<&'r TrackerTrajectoryData> {
        let label = self.config.bank_label(bank_labels::TRACKER_TRAJECTORY_DATA);
        record.tracker_trajectory_data(label).ok_or_else(|| {
            self.missing(bank_labels::TRACKER_TRAJECTORY_DATA, "tracker trajectory data")
        })
    }

    fn export_event_header(&self, eh: &EventHeaderData, ee: &mut ExportEvent) {
        let header = &mut ee.event_header;
        header.run_number = eh.run_number;
        header.event_number = eh.event_number;
        header.simulated = eh.simulated;
        header.seconds = eh.seconds;
        header.picoseconds = eh.picoseconds;
        if self.config.export_cat_infos {
            header.export_cat_infos = true;
        }
    }

    fn export_true_particles(&self, sd: &SimulatedData, ee: &mut ExportEvent) {
        let primary = &sd.primary_event;
        ee.true_vertices.push(TrueVertex {
            vertex_id: 0,
            x: sd.vertex.x / units::MM,
            y: sd.vertex.y / units::MM,
            z: sd.vertex.z / units::MM,
            time: primary.time / units::NS,
        });
        ee.true_particles
            .extend(primary.particles.iter().enumerate().map(|(track_id, p)| TrueParticle {
                track_id: track_id as i32,
                particle_type: p.particle_type,
                px: p.momentum.x / units::KEV,
                py: p.momentum.y / units::KEV,
                pz: p.momentum.z / units::KEV,
                time: p.time / units::NS,
                vertex_id: 0,
            }));
        trace!(particles = ee.true_particles.len(), "exported true particles");
    }

    fn export_true_hits(&self, gid: &GidInfo, sd: &SimulatedData, ee: &mut ExportEvent) {
        let scin_families = [
            (step_hit_categories::CALO, ScinBlockType::Calo, &gid.calo),
            (step_hit_categories::XCALO, ScinBlockType::Xcalo, &gid.xcalo),
            (step_hit_categories::GVETO, ScinBlockType::Gveto, &gid.gveto),
        ];
        for (category, block_type, axes) in scin_families {
            if !sd.has_step_hits(category) {
                continue;
            }
            let rows = sd.step_hits(category).iter().map(|hit| {
                let address = axes.decode(&hit.geom_id);
                true_scin_hit(hit, block_type, address)
            });
            match block_type {
                ScinBlockType::Calo => ee.true_calo_hits.extend(rows),
                ScinBlockType::Xcalo => ee.true_xcalo_hits.extend(rows),
                ScinBlockType::Gveto => ee.true_gveto_hits.extend(rows),
            }
        }

        if sd.has_step_hits(step_hit_categories::GG) {
            ee.true_gg_hits
                .extend(sd.step_hits(step_hit_categories::GG).iter().map(|hit| {
                    let address = gid.gg.decode(&hit.geom_id);
                    TrueGgHit {
                        hit_id: hit.hit_id,
                        module: address.module,
                        side: address.side,
                        layer: address.layer,
                        row: address.row,
                        t_ionization: hit.time_start / units::NS,
                        x_ionization: hit.position_start.x / units::MM,
                        y_ionization: hit.position_start.y / units::MM,
                        z_ionization: hit.position_start.z / units::MM,
                        px_ionization: hit.momentum_start.x / units::KEV,
                        py_ionization: hit.momentum_start.y / units::KEV,
                        pz_ionization: hit.momentum_start.z / units::KEV,
                        x_anode: hit.position_stop.x / units::MM,
                        y_anode: hit.position_stop.y / units::MM,
                        z_anode: hit.position_stop.z / units::MM,
                    }
                }));
        }
    }

    fn export_calib_calorimeter_hits(
        &self,
        gid: &GidInfo,
        cd: &CalibratedData,
        ee: &mut ExportEvent,
    ) {
        for hit in &cd.calorimeter_hits {
            let mut row = CalibCalorimeterHit {
                hit_id: hit.hit_id,
                time: hit.time / units::NS,
                sigma_time: hit.sigma_time / units::NS,
                energy: hit.energy / units::KEV,
                sigma_energy: hit.sigma_energy / units::KEV,
                true_hit_id: INVALID_ID,
                ..Default::default()
            };
            let geom_type = hit.geom_id.get_type();
            let family = [
                (ScinBlockType::Calo, &gid.calo),
                (ScinBlockType::Xcalo, &gid.xcalo),
                (ScinBlockType::Gveto, &gid.gveto),
            ]
            .into_iter()
            .find(|(_, axes)| axes.geom_type == geom_type);
            match family {
                Some((block_type, axes)) => {
                    let address = axes.decode(&hit.geom_id);
                    row.block_type = block_type.code();
                    row.module = address.module;
                    row.side = address.side;
                    row.column = address.column;
                    row.row = address.row;
                    row.wall = address.wall;
                }
                None => trace!(hit_id = hit.hit_id, geom_type, "unmatched scintillator type"),
            }
            ee.calib_scin_hits.push(row);
        }
    }

    fn export_calib_tracker_hits(&self, gid: &GidInfo, cd: &CalibratedData, ee: &mut ExportEvent) {
        let cat = self.config.export_cat_infos;
        for hit in &cd.tracker_hits {
            let address = gid.gg.decode(&hit.geom_id);
            let mut row = CalibTrackerHit {
                hit_id: hit.hit_id,
                module: address.module,
                side: address.side,
                layer: address.layer,
                row: address.row,
                noisy: hit.noisy,
                delayed: hit.delayed,
                missing_bottom_cathode: hit.bottom_cathode_missing,
                missing_top_cathode: hit.top_cathode_missing,
                x: hit.x / units::MM,
                y: hit.y / units::MM,
                z: hit.z / units::MM,
                sigma_z: hit.sigma_z / units::MM,
                r: hit.r / units::MM,
                sigma_r: hit.sigma_r / units::MM,
                ..Default::default()
            };
            if hit.delayed {
                if let Some(delayed_time) = hit.delayed_time {
                    row.delayed_time = delayed_time / units::NS;
                    row.delayed_time_error =
                        hit.delayed_time_error.unwrap_or(INVALID_DOUBLE) / units::NS;
                }
            }
            row.true_hit_id = hit
                .auxiliaries
                .fetch_integer(aux_keys::MC_HIT_ID)
                .and_then(|id| i32::try_from(id).ok())
                .unwrap_or(INVALID_ID);

            if cat {
                let aux = &hit.auxiliaries;
                row.has_cat_infos = true;
                if let Some(v) = vector_group(aux, aux_keys::CAT_TANGENCY, "CAT_tangency") {
                    [
                        row.cat_tangency_x,
                        row.cat_tangency_y,
                        row.cat_tangency_z,
                        row.cat_tangency_x_error,
                        row.cat_tangency_y_error,
                        row.cat_tangency_z_error,
                    ] = v;
                }
                if let Some(v) = vector_group(aux, aux_keys::CAT_HELIX, "CAT_helix") {
                    [
                        row.cat_helix_x,
                        row.cat_helix_y,
                        row.cat_helix_z,
                        row.cat_helix_x_error,
                        row.cat_helix_y_error,
                        row.cat_helix_z_error,
                    ] = v;
                }
            }
            ee.calib_gg_hits.push(row);
        }
    }

    fn export_tracker_clustering(
        &self,
        gid: &GidInfo,
        tcd: &TrackerClusteringData,
        ee: &mut ExportEvent,
    ) {
        let Some(solution) = tcd.default_solution() else {
            trace!("no default clustering solution");
            return;
        };
        let solution_id = solution.solution_id;
        ee.tracker_clusters.reserve(solution.clusters.len());
        for cluster in &solution.clusters {
            let (module, side) = match &cluster.geom_id {
                Some(geom_id) => {
                    let address = gid.gg.decode(geom_id);
                    (address.module, address.side)
                }
                None => (INVALID_ID, INVALID_ID),
            };
            let mut row = TrackerCluster {
                solution_id,
                cluster_id: cluster.cluster_id,
                module,
                side,
                delayed: cluster.delayed,
                number_of_hits: cluster.hits.len() as u32,
                ..Default::default()
            };
            if self.config.export_cat_infos {
                export_cluster_cat(cluster, &mut row);
            }
            ee.tracker_clusters.push(row);
            ee.tracker_clustered_hits
                .extend(cluster.hits.iter().map(|&hit_id| TrackerClusteredHit {
                    solution_id,
                    cluster_id: cluster.cluster_id,
                    hit_id,
                }));
        }
        ee.tracker_clustered_hits
            .extend(solution.unclustered_hits.iter().map(|&hit_id| TrackerClusteredHit {
                solution_id,
                cluster_id: INVALID_ID,
                hit_id,
            }));
        trace!(
            clusters = ee.tracker_clusters.len(),
            hits = ee.tracker_clustered_hits.len(),
            "exported tracker clustering"
        );
    }

    fn export_tracker_trajectories(
        &self,
        gid: &GidInfo,
        ttd: &TrackerTrajectoryData,
        ee: &mut ExportEvent,
    ) {
        let Some(solution) = ttd.default_solution() else {
            trace!("no default trajectory solution");
            return;
        };
        let solution_id = solution.solution_id;
        ee.tracker_trajectories.reserve(solution.trajectories.len());
        for trajectory in &solution.trajectories {
            let mut row = TrackerTrajectory {
                solution_id,
                trajectory_id: trajectory.trajectory_id,
                cluster_id: trajectory.cluster_id,
                delayed: trajectory.cluster_delayed,
                number_of_orphans: trajectory.orphans.len() as u32,
                ..Default::default()
            };
            if let Some(geom_id) = &trajectory.geom_id {
                let address = gid.gg.decode(geom_id);
                row.module = address.module;
                row.side = address.side;
            }
            ee.tracker_trajectories.push(row);
            ee.tracker_trajectory_orphan_hits
                .extend(trajectory.orphans.iter().map(|&hit_id| {
                    TrackerTrajectoryOrphanHit {
                        solution_id,
                        trajectory_id: trajectory.trajectory_id,
                        hit_id,
                    }
                }));
        }
    }
}

fn true_scin_hit(hit: &StepHit, block_type: ScinBlockType, address: gid::ScinAddress) -> TrueScinHit {
    TrueScinHit {
        hit_id: hit.hit_id,
        block_type: block_type.code(),
        module: address.module,
        side: address.side,
        column: address.column,
        row: address.row,
        wall: address.wall,
        t_first: hit.time_start / units::NS,
        t_last: hit.time_stop / units::NS,
        x1: hit.position_start.x / units::MM,
        y1: hit.position_start.y / units::MM,
        z1: hit.position_start.z / units::MM,
        x2: hit.position_stop.x / units::MM,
        y2: hit.position_stop.y / units::MM,
        z2: hit.position_stop.z / units::MM,
        delta_energy: hit.energy_deposit / units::KEV,
    }
}

fn real(aux: &Properties, key: &str) -> f64 {
    aux.fetch_real(key).unwrap_or(INVALID_DOUBLE)
}

/// `<prefix>_{x,y,z}` and their `_error` companions, when `presence` is set.
fn vector_group(aux: &Properties, presence: &str, prefix: &str) -> Option<[f64; 6]> {
    if !aux.is_set(presence) {
        return None;
    }
    Some([
        real(aux, &format!("{prefix}_x")),
        real(aux, &format!("{prefix}_y")),
        real(aux, &format!("{prefix}_z")),
        real(aux, &format!("{prefix}_x_error")),
        real(aux, &format!("{prefix}_y_error")),
        real(aux, &format!("{prefix}_z_error")),
    ])
}

fn export_cluster_cat(cluster: &Cluster, tc: &mut TrackerCluster) {
    let aux = &cluster.auxiliaries;
    tc.has_cat_infos = true;

    if aux.is_set(aux_keys::CAT_HAS_MOMENTUM) {
        tc.cat_has_momentum = true;
        tc.cat_momentum_x = real(aux, "CAT_momentum_x");
        tc.cat_momentum_y = real(aux, "CAT_momentum_y");
        tc.cat_momentum_z = real(aux, "CAT_momentum_z");
    }

    if aux.is_set(aux_keys::CAT_CHARGE) {
        tc.cat_has_charge = true;
        tc.cat_charge = real(aux, aux_keys::CAT_CHARGE);
    }

    if let Some(v) = vector_group(aux, aux_keys::CAT_HAS_HELIX_VERTEX, "CAT_helix_vertex") {
        tc.cat_has_helix_vertex = true;
        [
            tc.cat_helix_vertex_x,
            tc.cat_helix_vertex_y,
            tc.cat_helix_vertex_z,
            tc.cat_helix_vertex_x_error,
            tc.cat_helix_vertex_y_error,
            tc.cat_helix_vertex_z_error,
        ] = v;
    }

    if let Some(v) = vector_group(
        aux,
        aux_keys::CAT_HAS_HELIX_DECAY_VERTEX,
        "CAT_helix_decay_vertex",
    ) {
        tc.cat_has_helix_decay_vertex = true;
        [
            tc.cat_helix_decay_vertex_x,
            tc.cat_helix_decay_vertex_y,
            tc.cat_helix_decay_vertex_z,
            tc.cat_helix_decay_vertex_x_error,
            tc.cat_helix_decay_vertex_y_error,
            tc.cat_helix_decay_vertex_z_error,
        ] = v;
    }

    if let Some(v) = vector_group(aux, aux_keys::CAT_HAS_TANGENT_VERTEX, "CAT_tangent_vertex") {
        tc.cat_has_tangent_vertex = true;
        [
            tc.cat_tangent_vertex_x,
            tc.cat_tangent_vertex_y,
            tc.cat_tangent_vertex_z,
            tc.cat_tangent_vertex_x_error,
            tc.cat_tangent_vertex_y_error,
            tc.cat_tangent_vertex_z_error,
        ] = v;
    }

    if let Some(v) = vector_group(
        aux,
        aux_keys::CAT_HAS_TANGENT_DECAY_VERTEX,
        "CAT_tangent_decay_vertex",
    ) {
        tc.cat_has_tangent_decay_vertex = true;
        [
            tc.cat_tangent_decay_vertex_x,
            tc.cat_tangent_decay_vertex_y,
            tc.cat_tangent_decay_vertex_z,
            tc.cat_tangent_decay_vertex_x_error,
            tc.cat_tangent_decay_vertex_y_error,
            tc.cat_tangent_decay_vertex_z_error,
        ] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::data::{
        Bank, CalibratedCalorimeterHit, CalibratedTrackerHit, ClusteringSolution, PrimaryEvent,
        PrimaryParticle, Trajectory, TrajectorySolution, Vector3,
    };
    use crate::source::geom::{GeomId, GeometrySetup, IdManager, INVALID_ADDRESS};

    fn header_only() -> EventRecord {
        let mut record = EventRecord::new();
        record.add(
            "EH",
            Bank::EventHeader(EventHeaderData {
                run_number: 7,
                event_number: 42,
                simulated: true,
                seconds: 0,
                picoseconds: 0,
            }),
        );
        record
    }

    fn initialized<'g>(geometry: &'g GeometrySetup, setup: &Properties) -> EventExporter<'g> {
        let mut exporter = EventExporter::new();
        exporter.set_geom_manager(geometry).unwrap();
        exporter.initialize(setup).unwrap();
        exporter
    }

    fn only(topics: &[&str]) -> Properties {
        let mut setup = Properties::new();
        for t in topics {
            setup.set_flag(format!("export.{t}"));
        }
        setup
    }

    #[test]
    fn test_state_machine() {
        let geometry = GeometrySetup::snemo();
        let mut exporter = EventExporter::new();
        let mut ee = ExportEvent::new();

        assert!(matches!(
            exporter.run(&header_only(), &mut ee),
            Err(ExportError::NotInitialized)
        ));
        assert!(matches!(
            exporter.initialize(&Properties::new()),
            Err(ExportError::NoGeometryManager)
        ));
        assert!(matches!(exporter.reset(), Err(ExportError::NotInitialized)));

        exporter.set_geom_manager(&geometry).unwrap();
        exporter.initialize(&Properties::new()).unwrap();
        assert!(exporter.is_initialized());
        assert!(matches!(
            exporter.initialize(&Properties::new()),
            Err(ExportError::AlreadyInitialized)
        ));
        assert!(matches!(
            exporter.set_geom_manager(&geometry),
            Err(ExportError::AlreadyInitialized)
        ));

        exporter.reset().unwrap();
        assert!(!exporter.is_initialized());
        assert!(!exporter.has_geom_manager());
        assert_eq!(exporter.export_flags(), ExportFlags::NONE);
    }

    #[test]
    fn test_bad_geometry_rejected_at_bind() {
        let geometry = GeometrySetup {
            label: "empty".into(),
            version: "0".into(),
            categories: IdManager::default(),
        };
        let mut exporter = EventExporter::new();
        assert!(matches!(
            exporter.set_geom_manager(&geometry),
            Err(ExportError::Geometry { .. })
        ));
        assert!(!exporter.has_geom_manager());
    }

    #[test]
    fn test_header_and_missing_bank() {
        let geometry = GeometrySetup::snemo();
        let exporter = initialized(&geometry, &only(&["event_header"]));
        let mut ee = ExportEvent::new();
        exporter.run(&header_only(), &mut ee).unwrap();
        assert_eq!(ee.event_header.run_number, 7);
        assert_eq!(ee.event_header.event_number, 42);
        assert!(ee.event_header.simulated);
        assert!(!ee.event_header.export_cat_infos);

        let exporter = initialized(&geometry, &only(&["event_header", "calib_tracker_hits"]));
        let err = exporter.run(&header_only(), &mut ee).unwrap_err();
        assert!(matches!(err, ExportError::MissingBank { ref label, .. } if label == "CD"));
    }

    #[test]
    fn test_remapped_bank_label() {
        let geometry = GeometrySetup::snemo();
        let mut setup = only(&["event_header"]);
        setup.set_string("export.bank.label.EH", "Header");
        let exporter = initialized(&geometry, &setup);
        let mut ee = ExportEvent::new();
        let err = exporter.run(&header_only(), &mut ee).unwrap_err();
        assert!(matches!(err, ExportError::MissingBank { ref label, .. } if label == "Header"));

        let mut record = EventRecord::new();
        record.add(
            "Header",
            Bank::EventHeader(EventHeaderData {
                run_number: 1,
                ..Default::default()
            }),
        );
        exporter.run(&record, &mut ee).unwrap();
        assert_eq!(ee.event_header.run_number, 1);
    }

    #[test]
    fn test_true_particles_units() {
        let geometry = GeometrySetup::snemo();
        let exporter = initialized(&geometry, &only(&["true_particles"]));
        let mut record = EventRecord::new();
        record.add(
            "SD",
            Bank::SimulatedData(SimulatedData {
                vertex: Vector3::new(1.0, -2.0, 3.5),
                primary_event: PrimaryEvent {
                    time: 0.0,
                    particles: vec![PrimaryParticle {
                        particle_type: 11,
                        momentum: Vector3::new(1.0 * units::KEV, 2.0 * units::KEV, 3.0 * units::KEV),
                        time: 0.5 * units::NS,
                    }],
                },
                ..Default::default()
            }),
        );
        let mut ee = ExportEvent::new();
        exporter.run(&record, &mut ee).unwrap();
        assert_eq!(ee.true_vertices.len(), 1);
        assert_eq!(ee.true_vertices[0].vertex_id, 0);
        assert_eq!(ee.true_vertices[0].z, 3.5);
        let p = &ee.true_particles[0];
        assert_eq!((p.track_id, p.particle_type, p.vertex_id), (0, 11, 0));
        assert_eq!((p.px, p.py, p.pz, p.time), (1.0, 2.0, 3.0, 0.5));
    }

    #[test]
    fn test_calib_calorimeter_geometry_decoding() {
        let geometry = GeometrySetup::snemo();
        let exporter = initialized(&geometry, &only(&["calib_calorimeter_hits"]));
        let ids = geometry.id_manager();
        let calo = ids.category_info("calorimeter_block").unwrap();
        let xcalo = ids.category_info("xcalo_block").unwrap();
        let gveto = ids.category_info("gveto_block").unwrap();

        let hits = vec![
            CalibratedCalorimeterHit {
                hit_id: 0,
                geom_id: calo.make_id(&[("module", 0), ("side", 1), ("column", 12), ("row", 6), ("part", 1)]),
                energy: 1.0,
                ..Default::default()
            },
            CalibratedCalorimeterHit {
                hit_id: 1,
                geom_id: xcalo.make_id(&[("module", 0), ("side", 0), ("wall", 1), ("column", 2), ("row", 9)]),
                ..Default::default()
            },
            CalibratedCalorimeterHit {
                hit_id: 2,
                geom_id: gveto.make_id(&[("module", 0), ("side", 1), ("wall", 0), ("column", 14)]),
                ..Default::default()
            },
            CalibratedCalorimeterHit {
                hit_id: 3,
                geom_id: GeomId::new(9999, vec![1, 2, 3]),
                ..Default::default()
            },
        ];
        let mut record = EventRecord::new();
        record.add(
            "CD",
            Bank::CalibratedData(CalibratedData {
                calorimeter_hits: hits,
                ..Default::default()
            }),
        );
        let mut ee = ExportEvent::new();
        exporter.run(&record, &mut ee).unwrap();

        let rows = &ee.calib_scin_hits;
        assert_eq!(rows.len(), 4);
        assert_eq!(
            (rows[0].block_type, rows[0].module, rows[0].side, rows[0].column, rows[0].row, rows[0].wall),
            (0, 0, 1, 12, 6, -1)
        );
        assert_eq!(rows[0].energy, 1000.0);
        assert_eq!(
            (rows[1].block_type, rows[1].column, rows[1].row, rows[1].wall),
            (1, 2, 9, 1)
        );
        assert_eq!(
            (rows[2].block_type, rows[2].column, rows[2].row, rows[2].wall),
            (2, 14, -1, 0)
        );
        assert_eq!((rows[3].block_type, rows[3].module, rows[3].wall), (-1, -1, -1));
        assert!(rows.iter().all(|r| r.true_hit_id == -1));
    }

    #[test]
    fn test_true_scin_hits_geometry_decoding() {
        let geometry = GeometrySetup::snemo();
        let exporter = initialized(&geometry, &only(&["true_hits"]));
        let ids = geometry.id_manager();
        let calo = ids.category_info("calorimeter_block").unwrap();
        let xcalo = ids.category_info("xcalo_block").unwrap();
        let gveto = ids.category_info("gveto_block").unwrap();

        let step = |hit_id: i32, geom_id: GeomId| StepHit {
            hit_id,
            geom_id,
            time_start: 1.5,
            time_stop: 2.5,
            position_start: Vector3::new(1.0, 2.0, 3.0),
            position_stop: Vector3::new(4.0, 5.0, 6.0),
            energy_deposit: 0.25,
            ..Default::default()
        };
        let mut sd = SimulatedData::default();
        sd.step_hits.insert(
            step_hit_categories::CALO.into(),
            vec![step(
                0,
                calo.make_id(&[("module", 0), ("side", 1), ("column", 12), ("row", 6), ("part", 1)]),
            )],
        );
        sd.step_hits.insert(
            step_hit_categories::XCALO.into(),
            vec![step(
                1,
                xcalo.make_id(&[("module", 0), ("side", 0), ("wall", 1), ("column", 2), ("row", 9)]),
            )],
        );
        sd.step_hits.insert(
            step_hit_categories::GVETO.into(),
            vec![step(
                2,
                gveto.make_id(&[("module", 0), ("side", 1), ("wall", 0), ("column", 14)]),
            )],
        );
        let mut record = EventRecord::new();
        record.add("SD", Bank::SimulatedData(sd));
        let mut ee = ExportEvent::new();
        exporter.run(&record, &mut ee).unwrap();

        assert_eq!(ee.true_calo_hits.len(), 1);
        assert_eq!(ee.true_xcalo_hits.len(), 1);
        assert_eq!(ee.true_gveto_hits.len(), 1);
        assert!(ee.true_gg_hits.is_empty());

        let geo = |h: &TrueScinHit| (h.hit_id, h.block_type, h.module, h.side, h.column, h.row, h.wall);
        assert_eq!(geo(&ee.true_calo_hits[0]), (0, 0, 0, 1, 12, 6, -1));
        assert_eq!(geo(&ee.true_xcalo_hits[0]), (1, 1, 0, 0, 2, 9, 1));
        assert_eq!(geo(&ee.true_gveto_hits[0]), (2, 2, 0, 1, 14, -1, 0));

        let h = &ee.true_gveto_hits[0];
        assert_eq!((h.t_first, h.t_last), (1.5, 2.5));
        assert_eq!((h.x1, h.y1, h.z1, h.x2, h.y2, h.z2), (1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        assert_eq!(h.delta_energy, 250.0);
    }

    #[test]
    fn test_calib_tracker_hits() {
        let geometry = GeometrySetup::snemo();
        let mut setup = only(&["calib_tracker_hits"]);
        setup.set_flag("export.cat_infos");
        let exporter = initialized(&geometry, &setup);

        let mut with_cat = Properties::new();
        with_cat.set_integer(aux_keys::MC_HIT_ID, 17);
        with_cat.set_real("CAT_helix_x", 1.0);
        with_cat.set_real("CAT_helix_y", 2.0);
        with_cat.set_real("CAT_helix_z", 3.0);
        with_cat.set_real("CAT_helix_x_error", 0.1);
        with_cat.set_real("CAT_helix_y_error", 0.2);
        with_cat.set_real("CAT_helix_z_error", 0.3);

        let tracker_hits = vec![
            CalibratedTrackerHit {
                hit_id: 5,
                geom_id: GeomId::new(1204, vec![0, 1, 3, 44]),
                delayed: true,
                delayed_time: Some(120.0),
                delayed_time_error: Some(2.0),
                r: 11.0,
                auxiliaries: with_cat,
                ..Default::default()
            },
            CalibratedTrackerHit {
                hit_id: 6,
                geom_id: GeomId::new(1204, vec![0, 0, 8, INVALID_ADDRESS]),
                delayed: false,
                delayed_time: Some(99.0),
                ..Default::default()
            },
        ];
        let mut record = EventRecord::new();
        record.add(
            "CD",
            Bank::CalibratedData(CalibratedData {
                tracker_hits,
                ..Default::default()
            }),
        );
        let mut ee = ExportEvent::new();
        exporter.run(&record, &mut ee).unwrap();

        let first = &ee.calib_gg_hits[0];
        assert_eq!((first.module, first.side, first.layer, first.row), (0, 1, 3, 44));
        assert_eq!((first.delayed_time, first.delayed_time_error), (120.0, 2.0));
        assert_eq!(first.true_hit_id, 17);
        assert!(first.has_cat_infos);
        assert_eq!(first.cat_helix_y, 2.0);
        assert_eq!(first.cat_helix_z_error, 0.3);
        assert!(first.cat_tangency_x.is_nan());

        let second = &ee.calib_gg_hits[1];
        assert_eq!(second.row, -1);
        assert!(second.delayed_time.is_nan());
        assert_eq!(second.true_hit_id, -1);
        assert!(second.has_cat_infos);
    }

    fn clustering_record() -> EventRecord {
        let mut aux = Properties::new();
        aux.set_flag(aux_keys::CAT_HAS_MOMENTUM);
        aux.set_real("CAT_momentum_x", 0.5);
        aux.set_real("CAT_momentum_y", 0.0);
        aux.set_real("CAT_momentum_z", -0.5);
        aux.set_real(aux_keys::CAT_CHARGE, -1.0);

        let solution = ClusteringSolution {
            solution_id: 2,
            clusters: vec![
                Cluster {
                    cluster_id: 0,
                    geom_id: Some(GeomId::new(1204, vec![0, 1, 0, 0])),
                    delayed: false,
                    hits: vec![10, 11, 12],
                    auxiliaries: aux,
                },
                Cluster {
                    cluster_id: 1,
                    geom_id: None,
                    delayed: true,
                    hits: vec![13],
                    auxiliaries: Properties::new(),
                },
            ],
            unclustered_hits: vec![14, 15],
        };
        let mut record = EventRecord::new();
        record.add(
            "TCD",
            Bank::TrackerClusteringData(TrackerClusteringData {
                solutions: vec![solution],
                default_index: Some(0),
            }),
        );
        record
    }

    #[test]
    fn test_clustering_partition() {
        let geometry = GeometrySetup::snemo();
        let exporter = initialized(&geometry, &only(&["tracker_clustering"]));
        let mut ee = ExportEvent::new();
        exporter.run(&clustering_record(), &mut ee).unwrap();

        assert_eq!(ee.tracker_clusters.len(), 2);
        let first = &ee.tracker_clusters[0];
        assert_eq!((first.solution_id, first.module, first.side), (2, 0, 1));
        assert!(!first.delayed);
        assert!(!first.has_cat_infos);
        let second = &ee.tracker_clusters[1];
        assert_eq!((second.module, second.side), (-1, -1));
        assert!(second.delayed);

        let clustered: Vec<_> = ee
            .tracker_clustered_hits
            .iter()
            .filter(|h| h.cluster_id >= 0)
            .collect();
        let unclustered: Vec<_> = ee
            .tracker_clustered_hits
            .iter()
            .filter(|h| h.cluster_id == -1)
            .collect();
        assert_eq!(clustered.len(), 4);
        assert_eq!(unclustered.len(), 2);
        let total: u32 = ee.tracker_clusters.iter().map(|c| c.number_of_hits).sum();
        assert_eq!(total as usize, clustered.len());
        assert!(ee.tracker_clustered_hits.iter().all(|h| h.solution_id == 2));
    }

    #[test]
    fn test_clustering_cat_groups() {
        let geometry = GeometrySetup::snemo();
        let mut setup = only(&["tracker_clustering"]);
        setup.set_flag("export.cat_infos");
        let exporter = initialized(&geometry, &setup);
        let mut ee = ExportEvent::new();
        exporter.run(&clustering_record(), &mut ee).unwrap();

        let first = &ee.tracker_clusters[0];
        assert!(first.has_cat_infos);
        assert!(first.cat_has_momentum);
        assert_eq!(first.cat_momentum_z, -0.5);
        assert!(first.cat_has_charge);
        assert_eq!(first.cat_charge, -1.0);
        assert!(!first.cat_has_helix_vertex);
        assert!(first.cat_helix_vertex_x.is_nan());

        let second = &ee.tracker_clusters[1];
        assert!(second.has_cat_infos);
        assert!(!second.cat_has_momentum);
        assert!(!second.cat_has_charge);
    }

    #[test]
    fn test_missing_default_solution_is_empty() {
        let geometry = GeometrySetup::snemo();
        let exporter = initialized(&geometry, &only(&["tracker_clustering"]));
        let mut record = EventRecord::new();
        record.add(
            "TCD",
            Bank::TrackerClusteringData(TrackerClusteringData::default()),
        );
        let mut ee = ExportEvent::new();
        exporter.run(&record, &mut ee).unwrap();
        assert!(ee.tracker_clusters.is_empty());
        assert!(ee.tracker_clustered_hits.is_empty());
    }

    #[test]
    fn test_trajectories_through_default_all() {
        let geometry = GeometrySetup::snemo();
        let mut exporter = EventExporter::new();
        exporter.set_geom_manager(&geometry).unwrap();
        exporter.initialize(&Properties::new()).unwrap();
        exporter.unset_exported(ExportFlags::ALL);
        exporter.set_exported(ExportFlags::TRACKER_TRAJECTORIES);

        let mut record = EventRecord::new();
        record.add(
            "TTD",
            Bank::TrackerTrajectoryData(TrackerTrajectoryData {
                solutions: vec![TrajectorySolution {
                    solution_id: 4,
                    trajectories: vec![Trajectory {
                        trajectory_id: 0,
                        geom_id: Some(GeomId::new(1204, vec![0, 0, 0, 0])),
                        cluster_id: 1,
                        cluster_delayed: true,
                        orphans: vec![20, 21],
                        auxiliaries: Properties::new(),
                    }],
                }],
                default_index: Some(0),
            }),
        );
        let mut ee = ExportEvent::new();
        exporter.run(&record, &mut ee).unwrap();
        let t = &ee.tracker_trajectories[0];
        assert_eq!((t.solution_id, t.cluster_id, t.number_of_orphans), (4, 1, 2));
        assert_eq!((t.module, t.side, t.pattern_id), (0, 0, -1));
        assert!(t.delayed);
        assert_eq!(ee.tracker_trajectory_orphan_hits.len(), 2);
        assert!(ee.tracker_trajectory_patterns.is_empty());
    }

    #[test]
    fn test_topics_and_dump() {
        let geometry = GeometrySetup::snemo();
        let mut setup = only(&["event_header"]);
        setup.set_flag("export.cat_infos");
        let exporter = initialized(&geometry, &setup);
        assert_eq!(exporter.topic_export_level("CAT"), TopicLevel::Include);
        assert_eq!(exporter.topic_export_level("OTHER"), TopicLevel::NoInclude);
        assert_eq!(exporter.topics().get("CAT"), Some(&TopicLevel::Include));

        let dump = exporter.dump();
        assert!(dump.starts_with("Event exporter:\n"));
        assert!(dump.contains("|-- Geometry manager : snemo::demonstrator 2.0"));
        assert!(dump.contains("|   |-- CD : 'CD'"));
        assert!(dump.contains("`-- Export flags : [1]"));
        assert!(dump.contains("    |-- Export 'event_header' : yes"));
        assert!(dump.contains("    `-- Export 'tracker_trajectories' : no"));
    }
}
