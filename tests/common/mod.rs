//! Common test utilities for snexport integration tests.

#![allow(dead_code)]

use snexport::source::data::{
    Bank, CalibratedCalorimeterHit, CalibratedData, CalibratedTrackerHit, Cluster,
    ClusteringSolution, EventHeaderData, PrimaryEvent, PrimaryParticle, SimulatedData, StepHit,
    TrackerClusteringData, TrackerTrajectoryData, Trajectory, TrajectorySolution, Vector3,
};
use snexport::source::{EventRecord, GeomId, Properties};

/// Momentum unit of the source model (MeV).
pub const KEV: f64 = 1.0e-3;

/// Banks filled for every topic when exported from [`full_record`].
pub const POPULATED_BANKS: [&str; 12] = [
    "trueVertices",
    "trueParticles",
    "trueCaloHits",
    "trueXcaloHits",
    "trueGvetoHits",
    "trueGgHits",
    "calibScinHits",
    "calibTrackerHits",
    "trackerClusters",
    "trackerClusteredHits",
    "trackerTrajectories",
    "trackerTrajectoryOrphanHits",
];

pub fn header(run_number: i32, event_number: i32) -> Bank {
    Bank::EventHeader(EventHeaderData {
        run_number,
        event_number,
        simulated: true,
        seconds: 0,
        picoseconds: 0,
    })
}

/// The reference event: run 7, event 42, one 11-type primary with
/// momentum (1, 2, 3) keV emitted at 0.5 ns from the origin.
pub fn reference_record() -> EventRecord {
    let mut record = EventRecord::new();
    record.add("EH", header(7, 42));
    record.add(
        "SD",
        Bank::SimulatedData(SimulatedData {
            vertex: Vector3::new(0.0, 0.0, 0.0),
            primary_event: PrimaryEvent {
                time: 0.0,
                particles: vec![PrimaryParticle {
                    particle_type: 11,
                    momentum: Vector3::new(1.0 * KEV, 2.0 * KEV, 3.0 * KEV),
                    time: 0.5,
                }],
            },
            ..Default::default()
        }),
    );
    record
}

fn step(hit_id: i32, geom_id: GeomId) -> StepHit {
    StepHit {
        hit_id,
        geom_id,
        time_start: 1.0,
        time_stop: 2.0,
        energy_deposit: 0.5,
        ..Default::default()
    }
}

/// A source event carrying data for every topic.
pub fn full_record(event_number: i32) -> EventRecord {
    let mut record = reference_record();
    record.add("EH", header(7, event_number));

    if let Some(Bank::SimulatedData(mut sd)) = record.get("SD").cloned() {
        sd.step_hits
            .insert("calo".into(), vec![step(0, GeomId::new(1302, vec![0, 1, 3, 4, 0]))]);
        sd.step_hits
            .insert("xcalo".into(), vec![step(1, GeomId::new(1232, vec![0, 0, 1, 2, 5, 0]))]);
        sd.step_hits
            .insert("gveto".into(), vec![step(2, GeomId::new(1252, vec![0, 1, 0, 7, 0]))]);
        sd.step_hits
            .insert("gg".into(), vec![step(3, GeomId::new(1204, vec![0, 1, 2, 30]))]);
        record.add("SD", Bank::SimulatedData(sd));
    }

    let tracker_hits = (10..14)
        .map(|hit_id| CalibratedTrackerHit {
            hit_id,
            geom_id: GeomId::new(1204, vec![0, 1, 2, hit_id as u32]),
            r: 10.0,
            z: 1.5,
            ..Default::default()
        })
        .collect();
    record.add(
        "CD",
        Bank::CalibratedData(CalibratedData {
            calorimeter_hits: vec![CalibratedCalorimeterHit {
                hit_id: 0,
                geom_id: GeomId::new(1302, vec![0, 1, 3, 4, 0]),
                time: 5.0,
                energy: 1.0,
                ..Default::default()
            }],
            tracker_hits,
        }),
    );

    record.add(
        "TCD",
        Bank::TrackerClusteringData(TrackerClusteringData {
            solutions: vec![ClusteringSolution {
                solution_id: 0,
                clusters: vec![Cluster {
                    cluster_id: 0,
                    geom_id: Some(GeomId::new(1204, vec![0, 1, 0, 0])),
                    delayed: false,
                    hits: vec![10, 11, 12],
                    auxiliaries: Properties::new(),
                }],
                unclustered_hits: vec![13],
            }],
            default_index: Some(0),
        }),
    );

    record.add(
        "TTD",
        Bank::TrackerTrajectoryData(TrackerTrajectoryData {
            solutions: vec![TrajectorySolution {
                solution_id: 0,
                trajectories: vec![Trajectory {
                    trajectory_id: 0,
                    geom_id: Some(GeomId::new(1204, vec![0, 1, 0, 0])),
                    cluster_id: 0,
                    cluster_delayed: false,
                    orphans: vec![12],
                    auxiliaries: Properties::new(),
                }],
            }],
            default_index: Some(0),
        }),
    );
    record
}
