//! Predicted-transit simulator: wraps `fleet_types::predicted_transit` for
//! vessels with no live waypoint/corridor integrator and no AIS feed — e.g.
//! vessels referenced only in a report, whose position is reconstructed
//! on demand from a start time and a constant-speed assumption rather than
//! advanced tick-by-tick.

use chrono::{DateTime, Utc};
use fleet_types::predicted_transit::predicted_transit;
use fleet_types::{ClassificationTag, DataSource, LatLon, Route, VesselId};

/// Static configuration for one predicted-transit vessel; no mutable
/// integrator state is kept between ticks — the whole point of the lazy
/// sequence is that it doesn't need any.
#[derive(Debug, Clone)]
pub struct PredictedTransitVesselConfig {
    pub id: VesselId,
    pub name: String,
    pub route: Route,
    pub speed_kn: f64,
    pub started_at: DateTime<Utc>,
}

/// One vessel's output for a single tick.
pub struct TickedVessel {
    pub id: VesselId,
    pub name: String,
    pub classification: ClassificationTag,
    pub position: LatLon,
    pub course_deg: f64,
    pub leg_label: String,
    pub timestamp: DateTime<Utc>,
    pub data_source: DataSource,
}

/// Drives N predicted-transit vessels; each tick recomputes position from
/// scratch, so this can be created, dropped and recreated at will.
pub struct PredictedTransitSimulator {
    vessels: Vec<PredictedTransitVesselConfig>,
}

impl PredictedTransitSimulator {
    pub fn new(vessels: Vec<PredictedTransitVesselConfig>) -> Self {
        Self { vessels }
    }

    pub fn tick(&self, now: DateTime<Utc>) -> Vec<TickedVessel> {
        self.vessels
            .iter()
            .map(|v| {
                let elapsed_s = (now - v.started_at).num_milliseconds().max(0) as f64 / 1000.0;
                let (position, course_deg, leg_label) = predicted_transit(&v.route, v.speed_kn, elapsed_s);
                TickedVessel {
                    id: v.id.clone(),
                    name: v.name.clone(),
                    classification: ClassificationTag::PredictedTransit,
                    position,
                    course_deg,
                    leg_label,
                    timestamp: now,
                    data_source: DataSource::Predicted,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::Waypoint;

    fn sample_route() -> Route {
        Route::new(
            "oceanic-transit",
            vec![
                Waypoint::new(0.0, 0.0, "origin", 15.0),
                Waypoint::new(0.0, 1.0, "dest", 15.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn tick_is_pure_and_restartable() {
        let started_at = Utc::now() - chrono::Duration::seconds(3600);
        let sim = PredictedTransitSimulator::new(vec![PredictedTransitVesselConfig {
            id: VesselId::new("900000998").unwrap(),
            name: "Reported Transit Vessel".to_string(),
            route: sample_route(),
            speed_kn: 15.0,
            started_at,
        }]);

        let now = started_at + chrono::Duration::seconds(1800);
        let a = sim.tick(now);
        let b = sim.tick(now);
        assert_eq!(a[0].position, b[0].position);
        assert_eq!(a[0].classification, ClassificationTag::PredictedTransit);
        assert_eq!(a[0].data_source, DataSource::Predicted);
    }
}
