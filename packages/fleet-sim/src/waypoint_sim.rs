//! Waypoint-route simulator (C5): synthetic vessels that head to their next
//! waypoint under bounded turn-rate/acceleration limits, with independent
//! stochastic blackouts. Generalises the ammonia-carrier fleet simulator.

use chrono::{DateTime, Utc};
use fleet_types::dead_reckoning::AmbientForcing;
use fleet_types::{ClassificationTag, DataSource, DeadReckoningEngine, LatLon, Route, VesselId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DECELERATION_DISTANCE_M: f64 = 5_000.0;
const WAYPOINT_ARRIVAL_THRESHOLD_M: f64 = 500.0;
const MAX_ACCEL_KN_PER_SEC: f64 = 0.05;
const MAX_TURN_RATE_DEG_PER_SEC: f64 = 2.0;

/// Per-vessel configuration for the waypoint simulator.
#[derive(Debug, Clone)]
pub struct WaypointVesselConfig {
    pub id: VesselId,
    pub name: String,
    pub classification: ClassificationTag,
    pub route: Route,
    pub cruise_speed_kn: f64,
    pub min_speed_kn: f64,
    pub blackout_probability_per_tick: f64,
    pub blackout_min_duration_s: f64,
    pub blackout_max_duration_s: f64,
}

/// Per-vessel integrator state, owned exclusively by this simulator.
struct VesselIntegrator {
    config: WaypointVesselConfig,
    waypoint_index: usize,
    position: LatLon,
    course_deg: f64,
    speed_kn: f64,
    blackout: bool,
    blackout_ends_at_s: f64,
    elapsed_s: f64,
    rng: StdRng,
}

/// Drives N waypoint-following vessels forward in lockstep with the fleet
/// clock.
pub struct WaypointSimulator {
    vessels: Vec<VesselIntegrator>,
    engine: DeadReckoningEngine,
}

impl WaypointSimulator {
    pub fn new(configs: Vec<WaypointVesselConfig>, seed: u64) -> Self {
        let vessels = configs
            .into_iter()
            .enumerate()
            .map(|(i, config)| {
                let start = config.route.waypoint(0).position;
                VesselIntegrator {
                    waypoint_index: 0,
                    position: start,
                    course_deg: 0.0,
                    speed_kn: config.cruise_speed_kn,
                    blackout: false,
                    blackout_ends_at_s: 0.0,
                    elapsed_s: 0.0,
                    rng: StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                    config,
                }
            })
            .collect();

        Self {
            vessels,
            engine: DeadReckoningEngine::default(),
        }
    }

    /// Advance every vessel by `dt_s` seconds under `ambient` forcing and
    /// return each vessel's externally-visible `VesselState`-shaped tuple.
    pub fn tick(&mut self, dt_s: f64, ambient: AmbientForcing, now: DateTime<Utc>) -> Vec<TickedVessel> {
        self.vessels
            .iter_mut()
            .map(|v| v.tick(dt_s, ambient, now, &self.engine))
            .collect()
    }
}

/// One vessel's output for a single tick.
pub struct TickedVessel {
    pub id: VesselId,
    pub name: String,
    pub classification: ClassificationTag,
    pub position: LatLon,
    pub course_deg: f64,
    pub speed_kn: f64,
    pub is_blackout: bool,
    pub timestamp: DateTime<Utc>,
    pub data_source: DataSource,
}

impl VesselIntegrator {
    fn tick(
        &mut self,
        dt_s: f64,
        ambient: AmbientForcing,
        now: DateTime<Utc>,
        engine: &DeadReckoningEngine,
    ) -> TickedVessel {
        self.waypoint_index = self.config.route.wrap(self.waypoint_index);
        let target = self.config.route.waypoint(self.waypoint_index);

        let target_bearing = fleet_types::geo::bearing(self.position, target.position);
        let distance_to_target = fleet_types::geo::distance(self.position, target.position);

        let target_speed = if distance_to_target < DECELERATION_DISTANCE_M {
            let f = (distance_to_target / DECELERATION_DISTANCE_M).clamp(0.0, 1.0);
            let interpolated = target.arrival_speed_kn
                + f * (self.config.cruise_speed_kn - target.arrival_speed_kn);
            interpolated.max(self.config.min_speed_kn)
        } else {
            self.config.cruise_speed_kn
        };

        self.speed_kn = apply_rate_limit(
            self.speed_kn,
            target_speed,
            MAX_ACCEL_KN_PER_SEC * dt_s,
        );

        self.course_deg = apply_turn_limit(
            self.course_deg,
            target_bearing,
            MAX_TURN_RATE_DEG_PER_SEC * dt_s,
        );

        let prediction = engine.predict_position(self.position, self.course_deg, self.speed_kn, dt_s, ambient);
        self.position = prediction.position;
        self.elapsed_s += dt_s;

        if distance_to_target < WAYPOINT_ARRIVAL_THRESHOLD_M {
            self.waypoint_index = self.config.route.wrap(self.waypoint_index + 1);
        }

        self.step_blackout(dt_s);

        TickedVessel {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            classification: self.config.classification,
            position: self.position,
            course_deg: self.course_deg,
            speed_kn: self.speed_kn,
            is_blackout: self.blackout,
            timestamp: now,
            data_source: DataSource::SimulatedAmmonia,
        }
    }

    /// Independently each tick, with probability `p_bo`, start a blackout
    /// whose duration is uniform in `[min, max]` seconds.
    fn step_blackout(&mut self, dt_s: f64) {
        if self.blackout {
            if self.elapsed_s >= self.blackout_ends_at_s {
                self.blackout = false;
            }
            return;
        }
        let _ = dt_s;
        if self.rng.gen::<f64>() < self.config.blackout_probability_per_tick {
            let duration = self
                .rng
                .gen_range(self.config.blackout_min_duration_s..=self.config.blackout_max_duration_s);
            self.blackout = true;
            self.blackout_ends_at_s = self.elapsed_s + duration;
        }
    }
}

/// Move `current` toward `target` by at most `max_delta` (always positive).
fn apply_rate_limit(current: f64, target: f64, max_delta: f64) -> f64 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + max_delta * diff.signum()
    }
}

/// Turn `current` heading toward `target` heading by at most `max_delta`
/// degrees, always choosing the shorter rotation direction.
fn apply_turn_limit(current: f64, target: f64, max_delta: f64) -> f64 {
    let mut diff = (target - current + 180.0) % 360.0 - 180.0;
    if diff < -180.0 {
        diff += 360.0;
    }
    let clamped = diff.clamp(-max_delta, max_delta);
    let result = current + clamped;
    ((result % 360.0) + 360.0) % 360.0
}
