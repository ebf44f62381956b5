//! Corridor simulator (C6): follows a centreline with cross-track
//! correction, evaluates geofence/speed predicates, and logs violations.
//! Generalises the SMR-carrier simulator.

use chrono::{DateTime, Utc};
use fleet_types::dead_reckoning::AmbientForcing;
use fleet_types::{
    ClassificationTag, Corridor, DataSource, DeadReckoningEngine, GeofenceZone, LatLon, Severity,
    VesselId, ViolationEvent, ViolationKind, ZonePolicy,
};

const MAX_TURN_RATE_DEG_PER_SEC: f64 = 1.5;
const CROSS_TRACK_KP: f64 = 0.05;
const CROSS_TRACK_MAX_CORRECTION_DEG: f64 = 10.0;
const CENTERLINE_ARRIVAL_THRESHOLD_M: f64 = 1_000.0;
const MAX_ACCEL_KN_PER_SEC: f64 = 0.05;

/// Per-vessel configuration for the corridor simulator.
#[derive(Debug, Clone)]
pub struct CorridorVesselConfig {
    pub id: VesselId,
    pub name: String,
    pub classification: ClassificationTag,
    pub corridor: Corridor,
    pub geofences: Vec<GeofenceZone>,
    pub cruise_speed_kn: f64,
    pub deviation_threshold_m: f64,
}

struct CorridorIntegrator {
    config: CorridorVesselConfig,
    centerline_index: usize,
    position: LatLon,
    course_deg: f64,
    speed_kn: f64,
    was_deviating: bool,
    violations: Vec<ViolationEvent>,
}

/// Drives N corridor-following vessels forward in lockstep with the fleet
/// clock.
pub struct CorridorSimulator {
    vessels: Vec<CorridorIntegrator>,
    engine: DeadReckoningEngine,
}

impl CorridorSimulator {
    pub fn new(configs: Vec<CorridorVesselConfig>) -> Self {
        let vessels = configs
            .into_iter()
            .map(|config| {
                let start = config.corridor.point(0);
                CorridorIntegrator {
                    centerline_index: 0,
                    position: start,
                    course_deg: 0.0,
                    speed_kn: config.cruise_speed_kn,
                    was_deviating: false,
                    violations: Vec::new(),
                    config,
                }
            })
            .collect();

        Self {
            vessels,
            engine: DeadReckoningEngine::default(),
        }
    }

    pub fn tick(&mut self, dt_s: f64, ambient: AmbientForcing, now: DateTime<Utc>) -> Vec<TickedVessel> {
        self.vessels
            .iter_mut()
            .map(|v| v.tick(dt_s, ambient, now, &self.engine))
            .collect()
    }

    /// Drain every vessel's accumulated violation log (append-only; this
    /// just copies it out, it does not clear it).
    pub fn violations(&self) -> Vec<ViolationEvent> {
        self.vessels.iter().flat_map(|v| v.violations.clone()).collect()
    }
}

pub struct TickedVessel {
    pub id: VesselId,
    pub name: String,
    pub classification: ClassificationTag,
    pub position: LatLon,
    pub course_deg: f64,
    pub speed_kn: f64,
    pub timestamp: DateTime<Utc>,
    pub data_source: DataSource,
}

impl CorridorIntegrator {
    fn tick(
        &mut self,
        dt_s: f64,
        ambient: AmbientForcing,
        now: DateTime<Utc>,
        engine: &DeadReckoningEngine,
    ) -> TickedVessel {
        self.centerline_index = self.config.corridor.wrap(self.centerline_index);
        let target_point = self.config.corridor.point(self.centerline_index);

        let cross_track_distance = self.config.corridor.distance_from_centerline(self.position);
        let cross_track_sign = self
            .config
            .corridor
            .signed_cross_track(self.position, self.centerline_index);

        let base_bearing = fleet_types::geo::bearing(self.position, target_point);
        let correction = cross_track_sign.signum() * (CROSS_TRACK_KP * cross_track_distance).min(CROSS_TRACK_MAX_CORRECTION_DEG);
        let desired_course = base_bearing + correction;

        self.course_deg = apply_turn_limit(self.course_deg, desired_course, MAX_TURN_RATE_DEG_PER_SEC * dt_s);

        let target_speed = self.config.cruise_speed_kn.min(self.config.corridor.max_speed_kn);
        self.speed_kn = apply_rate_limit(self.speed_kn, target_speed, MAX_ACCEL_KN_PER_SEC * dt_s);

        let prediction = engine.predict_position(self.position, self.course_deg, self.speed_kn, dt_s, ambient);
        self.position = prediction.position;

        let distance_to_target = fleet_types::geo::distance(self.position, target_point);
        if distance_to_target < CENTERLINE_ARRIVAL_THRESHOLD_M {
            self.centerline_index = self.config.corridor.wrap(self.centerline_index + 1);
        }

        self.evaluate_predicates(now, cross_track_distance);

        TickedVessel {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            classification: self.config.classification,
            position: self.position,
            course_deg: self.course_deg,
            speed_kn: self.speed_kn,
            timestamp: now,
            data_source: DataSource::SimulatedSmr,
        }
    }

    /// Geofence & deviation predicates, evaluated after the position update.
    /// (P13): exactly one corridor-deviation is emitted on the rising edge,
    /// not once per tick spent over threshold.
    fn evaluate_predicates(&mut self, now: DateTime<Utc>, cross_track_distance: f64) {
        let deviating = cross_track_distance > self.config.deviation_threshold_m;
        if deviating && !self.was_deviating {
            self.violations.push(ViolationEvent {
                timestamp: now,
                kind: ViolationKind::CorridorDeviation,
                severity: Severity::Critical,
                position: self.position,
                details: format!("cross-track distance {cross_track_distance:.0}m exceeds threshold"),
            });
        }
        self.was_deviating = deviating;

        for zone in &self.config.geofences {
            if !zone.contains(self.position) {
                continue;
            }
            match zone.policy {
                ZonePolicy::Prohibited => {
                    self.violations.push(ViolationEvent {
                        timestamp: now,
                        kind: ViolationKind::GeofenceViolation,
                        severity: Severity::Critical,
                        position: self.position,
                        details: format!("entered prohibited zone {}", zone.name),
                    });
                }
                ZonePolicy::Restricted => {
                    if let Some(max_speed) = zone.max_speed_kn {
                        if self.speed_kn > max_speed {
                            self.violations.push(ViolationEvent {
                                timestamp: now,
                                kind: ViolationKind::SpeedViolation,
                                severity: Severity::Warning,
                                position: self.position,
                                details: format!(
                                    "speed {:.1}kn exceeds {}kn limit in {}",
                                    self.speed_kn, max_speed, zone.name
                                ),
                            });
                        }
                    }
                }
                ZonePolicy::Allowed => {}
            }
        }
    }
}

fn apply_rate_limit(current: f64, target: f64, max_delta: f64) -> f64 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + max_delta * diff.signum()
    }
}

fn apply_turn_limit(current: f64, target: f64, max_delta: f64) -> f64 {
    let mut diff = (target - current + 180.0) % 360.0 - 180.0;
    if diff < -180.0 {
        diff += 360.0;
    }
    let clamped = diff.clamp(-max_delta, max_delta);
    let result = current + clamped;
    ((result % 360.0) + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_corridor() -> Corridor {
        Corridor::new(
            "test-corridor",
            vec![LatLon::new(0.0, 0.0), LatLon::new(0.0, 2.0)],
            5000.0,
            20.0,
        )
        .unwrap()
    }

    fn prohibited_zone() -> GeofenceZone {
        GeofenceZone::new(
            "z1",
            "prohibited strait",
            ZonePolicy::Prohibited,
            vec![
                LatLon::new(-0.1, 0.9),
                LatLon::new(-0.1, 1.1),
                LatLon::new(0.1, 1.1),
                LatLon::new(0.1, 0.9),
            ],
            None,
            false,
        )
        .unwrap()
    }

    fn sample_config(geofences: Vec<GeofenceZone>) -> CorridorVesselConfig {
        CorridorVesselConfig {
            id: VesselId::smr(),
            name: "Test SMR Carrier".to_string(),
            classification: ClassificationTag::SmrSim,
            corridor: straight_corridor(),
            geofences,
            cruise_speed_kn: 22.0,
            deviation_threshold_m: 2_000.0,
        }
    }

    #[test]
    fn tick_advances_without_panicking() {
        let mut sim = CorridorSimulator::new(vec![sample_config(vec![])]);
        let out = sim.tick(60.0, AmbientForcing::default(), Utc::now());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn geofence_violation_logged_while_inside() {
        let mut sim = CorridorSimulator::new(vec![sample_config(vec![prohibited_zone()])]);
        // Run enough ticks at cruise speed to cross the prohibited strait
        // around longitude 1.0.
        for _ in 0..40 {
            sim.tick(300.0, AmbientForcing::default(), Utc::now());
        }
        let violations = sim.violations();
        assert!(violations.iter().any(|v| v.kind == ViolationKind::GeofenceViolation));
    }

    /// (P13) Pushing a vessel off the centreline and holding it there must
    /// emit exactly one corridor-deviation, on the rising edge, not one per
    /// tick spent beyond the threshold.
    #[test]
    fn corridor_deviation_fires_once_on_rising_edge() {
        let mut sim = CorridorSimulator::new(vec![sample_config(vec![])]);
        // Shove the vessel far off the centreline so every subsequent tick
        // starts out beyond the deviation threshold.
        sim.vessels[0].position = LatLon::new(0.5, 0.3);
        for _ in 0..5 {
            sim.tick(60.0, AmbientForcing::default(), Utc::now());
        }
        let deviations = sim
            .violations()
            .into_iter()
            .filter(|v| v.kind == ViolationKind::CorridorDeviation)
            .count();
        assert_eq!(deviations, 1, "expected a single rising-edge deviation, not one per tick");
    }

    #[test]
    fn speed_violation_logged_over_restricted_zone_limit() {
        let restricted = GeofenceZone::new(
            "z2",
            "restricted anchorage",
            ZonePolicy::Restricted,
            vec![
                LatLon::new(-0.1, 0.9),
                LatLon::new(-0.1, 1.1),
                LatLon::new(0.1, 1.1),
                LatLon::new(0.1, 0.9),
            ],
            Some(5.0),
            false,
        )
        .unwrap();
        let mut sim = CorridorSimulator::new(vec![sample_config(vec![restricted])]);
        for _ in 0..40 {
            sim.tick(300.0, AmbientForcing::default(), Utc::now());
        }
        let violations = sim.violations();
        assert!(violations.iter().any(|v| v.kind == ViolationKind::SpeedViolation));
    }
}
