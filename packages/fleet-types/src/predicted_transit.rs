//! Predicted-transit lazy sequence: a pure function of elapsed time, not a
//! long-lived actor, matching the "lazy sequences" design note — the vessel
//! requires no per-tick mutable state and is trivially restartable.

use crate::geo;
use crate::route::Route;

const KNOTS_TO_MPS: f64 = 0.514444;

/// Position, bearing and current leg label at `elapsed` seconds after the
/// transit began, for a vessel following `route` at constant `speed_kn`.
///
/// Cyclic on route exhaustion, same as the waypoint simulator's own index
/// wrap.
pub fn predicted_transit(
    route: &Route,
    speed_kn: f64,
    elapsed_s: f64,
) -> (geo::LatLon, f64, String) {
    let speed_mps = speed_kn * KNOTS_TO_MPS;
    let total_distance_m = speed_mps * elapsed_s;

    let mut remaining = total_distance_m;
    let mut leg = 0usize;
    loop {
        let from = route.waypoint(leg).position;
        let to = route.waypoint(leg + 1).position;
        let leg_len = geo::distance(from, to);

        if leg_len <= 1e-9 || remaining <= leg_len {
            let f = if leg_len > 1e-9 {
                (remaining / leg_len).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let pos = geo::intermediate(from, to, f);
            let bearing = geo::bearing(from, to);
            let label = route.waypoint(leg + 1).label.clone();
            return (pos, bearing, label);
        }

        remaining -= leg_len;
        leg += 1;

        // Defensive bound: routes with zero-length legs everywhere would
        // otherwise loop forever under a pure elapsed-time model.
        if leg > route.len() * 1000 {
            let pos = route.waypoint(0).position;
            return (pos, 0.0, route.waypoint(0).label.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Waypoint;

    fn sample_route() -> Route {
        Route::new(
            "oceanic-transit",
            vec![
                Waypoint::new(0.0, 0.0, "origin", 15.0),
                Waypoint::new(0.0, 1.0, "mid", 15.0),
                Waypoint::new(1.0, 1.0, "dest", 15.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn zero_elapsed_starts_at_first_leg() {
        let route = sample_route();
        let (pos, _bearing, label) = predicted_transit(&route, 15.0, 0.0);
        assert!((pos.lat - 0.0).abs() < 1e-6);
        assert!((pos.lon - 0.0).abs() < 1e-6);
        assert_eq!(label, "mid");
    }

    #[test]
    fn is_restartable_pure_function() {
        let route = sample_route();
        let a = predicted_transit(&route, 15.0, 5000.0);
        let b = predicted_transit(&route, 15.0, 5000.0);
        assert_eq!(a.0, b.0);
        assert_eq!(a.2, b.2);
    }
}
