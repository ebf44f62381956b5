//! Black-box end-to-end scenarios from spec.md §8, exercising the fleet
//! tick driver (C8) across the full waypoint/corridor/channel/store stack
//! rather than any single module in isolation.

use fleet_sim::channel_sim::ChannelSimulator;
use fleet_sim::corridor_sim::{CorridorSimulator, CorridorVesselConfig};
use fleet_sim::driver::{FleetDriver, FleetDriverConfig};
use fleet_sim::vessel_store::VesselStore;
use fleet_sim::waypoint_sim::{WaypointSimulator, WaypointVesselConfig};
use fleet_types::{
    ChannelProfile, ClassificationTag, Corridor, GeofenceZone, Route, VesselId, Waypoint,
    ZonePolicy,
};

fn ammonia_route() -> Route {
    Route::new(
        "north-atlantic-shuttle",
        vec![
            Waypoint::new(51.95, 4.14, "rotterdam-anchorage", 6.0),
            Waypoint::new(49.5, -5.0, "channel-exit", 14.0),
            Waypoint::new(43.0, -30.0, "mid-atlantic", 16.0),
        ],
    )
    .unwrap()
}

fn waypoint_config() -> WaypointVesselConfig {
    WaypointVesselConfig {
        id: VesselId::ammonia(1),
        name: "Test Ammonia Carrier".to_string(),
        classification: ClassificationTag::AmmoniaSim,
        route: ammonia_route(),
        cruise_speed_kn: 16.0,
        min_speed_kn: 8.0,
        blackout_probability_per_tick: 0.0,
        blackout_min_duration_s: 60.0,
        blackout_max_duration_s: 600.0,
    }
}

/// (P1, P3, P4) A waypoint vessel ticked repeatedly through the full driver
/// stays within coordinate bounds, keeps non-decreasing timestamps in the
/// store, and the AIS queue (unused here) never exceeds its cap.
#[tokio::test]
async fn driver_advances_waypoint_fleet_into_store_within_invariants() {
    let store = VesselStore::new();
    let waypoint_sim = WaypointSimulator::new(vec![waypoint_config()], 7);
    let mut driver = FleetDriver::new(
        store.clone(),
        FleetDriverConfig {
            gate_with_channel: false,
            ..FleetDriverConfig::default()
        },
    )
    .with_waypoint_simulator(waypoint_sim);

    let mut last_timestamp = None;
    for _ in 0..20 {
        driver.tick().await;
        let state = store.get(&VesselId::ammonia(1)).await.unwrap();
        assert!((-90.0..=90.0).contains(&state.position.lat));
        assert!(state.position.lon > -180.0 && state.position.lon <= 180.0);
        assert!((0.0..360.0).contains(&state.course_deg));
        assert!(state.speed_kn >= 0.0);
        if let Some(prev) = last_timestamp {
            assert!(state.timestamp >= prev);
        }
        last_timestamp = Some(state.timestamp);
    }
}

/// Scenario 6 (geofence): an SMR-style corridor vessel crossing a PROHIBITED
/// zone logs at least one violation while inside and none once it has fully
/// exited, driven end-to-end through `FleetDriver`.
#[tokio::test]
async fn driver_logs_geofence_violations_while_inside_prohibited_zone() {
    let corridor = Corridor::new(
        "strait-transit-corridor",
        vec![
            fleet_types::LatLon::new(0.0, 0.0),
            fleet_types::LatLon::new(0.0, 1.0),
            fleet_types::LatLon::new(0.0, 2.0),
        ],
        4000.0,
        18.0,
    )
    .unwrap();
    let prohibited = GeofenceZone::new(
        "z-prohibited",
        "prohibited naval anchorage",
        ZonePolicy::Prohibited,
        vec![
            fleet_types::LatLon::new(-0.1, 0.9),
            fleet_types::LatLon::new(-0.1, 1.1),
            fleet_types::LatLon::new(0.1, 1.1),
            fleet_types::LatLon::new(0.1, 0.9),
        ],
        None,
        true,
    )
    .unwrap();
    let config = CorridorVesselConfig {
        id: VesselId::smr(),
        name: "Test SMR Carrier".to_string(),
        classification: ClassificationTag::SmrSim,
        corridor,
        geofences: vec![prohibited],
        cruise_speed_kn: 18.0,
        deviation_threshold_m: 2_000.0,
    };

    let store = VesselStore::new();
    let corridor_sim = CorridorSimulator::new(vec![config]);
    let mut driver = FleetDriver::new(
        store.clone(),
        FleetDriverConfig {
            tick_wall_interval: std::time::Duration::from_secs(300),
            ..FleetDriverConfig::default()
        },
    )
    .with_corridor_simulator(corridor_sim);

    // Run well past the prohibited strait (around longitude 1.0) and out
    // the other side: at 18kn and 300s/tick each tick covers ~2.8km, and
    // the centreline spans roughly 222km end to end.
    for _ in 0..90 {
        driver.tick().await;
    }

    let violations = driver.violations();
    assert!(
        violations
            .iter()
            .any(|v| v.kind == fleet_types::ViolationKind::GeofenceViolation),
        "expected at least one geofence violation while crossing the prohibited zone"
    );

    let final_state = store.get(&VesselId::smr()).await.unwrap();
    assert!(
        final_state.position.lon > 1.2,
        "vessel should have exited the prohibited strait by the end of the run, at {:?}",
        final_state.position
    );
}

/// Scenario 5 (channel smoke): gating a waypoint fleet's updates through a
/// heavily degraded channel should visibly suppress most of its updates
/// reaching the store, and the channel's own SAI should reflect that.
#[tokio::test]
async fn driver_gates_updates_through_degraded_channel() {
    let store = VesselStore::new();
    let waypoint_sim = WaypointSimulator::new(vec![waypoint_config()], 11);
    let mut channel = ChannelSimulator::new(ChannelProfile::geostationary(), 99);
    channel.set_degradation_level(0.9);

    let mut driver = FleetDriver::new(
        store.clone(),
        FleetDriverConfig {
            gate_with_channel: true,
            ..FleetDriverConfig::default()
        },
    )
    .with_waypoint_simulator(waypoint_sim)
    .with_channel_simulator(channel);

    let mut gated_drops = 0usize;
    for _ in 0..200 {
        let summary = driver.tick().await;
        gated_drops += summary.gated_drops;
    }

    assert!(gated_drops > 0, "expected the degraded channel to drop some updates");
    let metrics_rx = driver.subscribe_channel_metrics();
    let metrics = metrics_rx.borrow().expect("channel metrics should be populated after ticking");
    assert!((0.0..=100.0).contains(&metrics.reliability_index()));
}
