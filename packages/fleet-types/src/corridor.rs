//! Corridor centreline, geofence zones and violation events (C6's static
//! inputs and output log).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::geo::{self, LatLon};

/// A permitted traversal tube: a polyline centreline plus a half-width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corridor {
    pub name: String,
    centerline: Vec<LatLon>,
    pub half_width_m: f64,
    pub max_speed_kn: f64,
}

impl Corridor {
    pub fn new(
        name: impl Into<String>,
        centerline: Vec<LatLon>,
        half_width_m: f64,
        max_speed_kn: f64,
    ) -> Result<Self, RouteError> {
        if centerline.len() < 2 {
            return Err(RouteError::TooFewWaypoints {
                got: centerline.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            centerline,
            half_width_m,
            max_speed_kn,
        })
    }

    pub fn point(&self, index: usize) -> LatLon {
        self.centerline[index % self.centerline.len()]
    }

    pub fn len(&self) -> usize {
        self.centerline.len()
    }

    pub fn wrap(&self, index: usize) -> usize {
        index % self.centerline.len()
    }

    /// Cross-track distance from `p` to the nearest point on the centreline
    /// polyline, metres, always `>= 0`. Computed segment by segment using a
    /// local equirectangular projection around `p`, which is accurate enough
    /// at corridor scale (tens of kilometres) without pulling in a full
    /// geometry crate.
    pub fn distance_from_centerline(&self, p: LatLon) -> f64 {
        let mut best = f64::MAX;
        for w in self.centerline.windows(2) {
            let d = distance_to_segment(p, w[0], w[1]);
            if d < best {
                best = d;
            }
        }
        best
    }

    /// Signed cross-track distance: positive when `p` is to the right of the
    /// segment direction (from `centerline[index]` to the next point),
    /// negative to the left. Used to choose the correction sign.
    pub fn signed_cross_track(&self, p: LatLon, index: usize) -> f64 {
        let i = self.wrap(index);
        let j = self.wrap(i + 1);
        let a = self.centerline[i];
        let b = self.centerline[j];

        let seg_bearing = geo::bearing(a, b);
        let to_p_bearing = geo::bearing(a, p);
        let to_p_distance = geo::distance(a, p);

        let angle_diff = (to_p_bearing - seg_bearing).to_radians();
        to_p_distance * angle_diff.sin()
    }
}

/// Nearest distance (metres) from `p` to the segment `a -> b`, projecting
/// onto a local tangent plane at `a` using a flat-earth approximation scaled
/// by `cos(lat)` for longitude — adequate at corridor/segment scale.
fn distance_to_segment(p: LatLon, a: LatLon, b: LatLon) -> f64 {
    let lat0 = a.lat.to_radians();
    let m_per_deg_lat = geo::EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
    let m_per_deg_lon = m_per_deg_lat * lat0.cos();

    let ax = 0.0;
    let ay = 0.0;
    let bx = (b.lon - a.lon) * m_per_deg_lon;
    let by = (b.lat - a.lat) * m_per_deg_lat;
    let px = (p.lon - a.lon) * m_per_deg_lon;
    let py = (p.lat - a.lat) * m_per_deg_lat;

    let abx = bx - ax;
    let aby = by - ay;
    let len_sq = abx * abx + aby * aby;

    let t = if len_sq > 1e-12 {
        (((px - ax) * abx + (py - ay) * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let cx = ax + t * abx;
    let cy = ay + t * aby;

    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Geofence zone policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZonePolicy {
    Allowed,
    Restricted,
    Prohibited,
}

/// A closed polygon region with an access policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceZone {
    pub zone_id: String,
    pub name: String,
    pub policy: ZonePolicy,
    /// Ring, first point equal to last (closed).
    ring: Vec<LatLon>,
    pub max_speed_kn: Option<f64>,
    pub mandatory_reporting: bool,
}

impl GeofenceZone {
    pub fn new(
        zone_id: impl Into<String>,
        name: impl Into<String>,
        policy: ZonePolicy,
        mut ring: Vec<LatLon>,
        max_speed_kn: Option<f64>,
        mandatory_reporting: bool,
    ) -> Result<Self, RouteError> {
        if ring.len() < 3 {
            return Err(RouteError::TooFewWaypoints { got: ring.len() });
        }
        if ring.first() != ring.last() {
            ring.push(ring[0]);
        }
        Ok(Self {
            zone_id: zone_id.into(),
            name: name.into(),
            policy,
            ring,
            max_speed_kn,
            mandatory_reporting,
        })
    }

    /// Even-odd ray-cast containment test.
    pub fn contains(&self, p: LatLon) -> bool {
        let mut inside = false;
        let n = self.ring.len();
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.ring[i];
            let vj = self.ring[j];
            let intersects = ((vi.lat > p.lat) != (vj.lat > p.lat))
                && (p.lon
                    < (vj.lon - vi.lon) * (p.lat - vi.lat) / (vj.lat - vi.lat) + vi.lon);
            if intersects {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Severity of a logged violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// The kind of rule a `ViolationEvent` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    CorridorDeviation,
    GeofenceViolation,
    SpeedViolation,
}

/// One append-only entry in a corridor simulator's violation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub position: LatLon,
    pub details: String,
}
