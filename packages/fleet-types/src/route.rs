//! Waypoint routes (C5's path input): ordered, cyclic on exhaustion.

use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::geo::LatLon;

/// A single leg endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: LatLon,
    pub label: String,
    /// Target speed on arrival, knots.
    pub arrival_speed_kn: f64,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64, label: impl Into<String>, arrival_speed_kn: f64) -> Self {
        Self {
            position: LatLon::new(lat, lon),
            label: label.into(),
            arrival_speed_kn,
        }
    }
}

/// An ordered sequence of waypoints, cyclic on exhaustion — the same
/// wrap-to-zero semantics the source simulators use rather than stopping at
/// the final leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    waypoints: Vec<Waypoint>,
}

impl Route {
    /// Construct a route; fails (`route-invalid`) if fewer than two
    /// waypoints are supplied.
    pub fn new(name: impl Into<String>, waypoints: Vec<Waypoint>) -> Result<Self, RouteError> {
        if waypoints.len() < 2 {
            return Err(RouteError::TooFewWaypoints {
                got: waypoints.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            waypoints,
        })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        false // construction guarantees >= 2
    }

    /// Waypoint at `index`, wrapping cyclically.
    pub fn waypoint(&self, index: usize) -> &Waypoint {
        &self.waypoints[index % self.waypoints.len()]
    }

    /// Normalise a (possibly out-of-range) index into bounds — the
    /// `cyclic-routes` contract.
    pub fn wrap(&self, index: usize) -> usize {
        index % self.waypoints.len()
    }
}
