//! Canonical vessel identity and state (C4's payload type).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::LatLon;

/// Maritime Mobile Service Identity: a 9-digit numeric string.
///
/// Kept as a string (not a numeric type) because MMSI is never arithmetic —
/// the only numeric operations on it are during minting of synthetic IDs
/// (`900000000 + n`), not during use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VesselId(String);

/// Base MMSI for the synthetic ammonia-carrier fleet; vessel N is minted as
/// `AMMONIA_MMSI_BASE + n` for `n` in `1..=999`.
pub const AMMONIA_MMSI_BASE: u32 = 900_000_000;

/// The single fixed MMSI used by the synthetic SMR-carrier vessel.
pub const SMR_MMSI: &str = "999999999";

impl VesselId {
    /// Construct from an arbitrary 9-digit numeric string (real-world AIS
    /// identity or an already-formatted synthetic one).
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.len() == 9 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Mint an ammonia-fleet synthetic identity for fleet index `n` (1-based).
    pub fn ammonia(n: u32) -> Self {
        Self(format!("{}", AMMONIA_MMSI_BASE + n))
    }

    /// The fixed SMR-carrier identity.
    pub fn smr() -> Self {
        Self(SMR_MMSI.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VesselId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of vessel this record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationTag {
    /// Real-world vessel on the autonomous-ship allowlist.
    Autonomous,
    /// Real-world cargo/tanker vessel admitted via the ship-type fallback.
    CargoTanker,
    /// Synthetic ammonia-carrier (waypoint-route simulator, C5).
    AmmoniaSim,
    /// Synthetic SMR-carrier (corridor simulator, C6).
    SmrSim,
    /// Predicted-transit vessel with no live tracking (lazy sequence).
    PredictedTransit,
}

/// Where a given update to a vessel record originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    Ais,
    SimulatedAmmonia,
    SimulatedSmr,
    Predicted,
}

/// Static (rarely-changing) ship particulars, populated from AIS static-data
/// messages; absent until the first such message for an identity arrives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticData {
    pub length_m: Option<f64>,
    pub width_m: Option<f64>,
    pub draught_m: Option<f64>,
    pub destination: Option<String>,
    pub eta: Option<DateTime<Utc>>,
}

/// The canonical per-vessel record owned by the fleet store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselState {
    pub id: VesselId,
    pub name: Option<String>,
    pub classification: ClassificationTag,

    pub position: LatLon,
    /// Course over ground, degrees `[0, 360)`.
    pub course_deg: f64,
    /// Speed over ground, knots, always `>= 0`.
    pub speed_kn: f64,
    /// True heading, degrees, if reported separately from course.
    pub heading_deg: Option<f64>,
    /// AIS position-accuracy bit: true = high (<10m), false = low (>10m).
    pub position_accuracy: bool,

    pub r#static: StaticData,

    pub timestamp: DateTime<Utc>,
    pub data_source: DataSource,
    pub simulated: bool,

    /// True while a vessel is in a channel-simulated or simulator-internal
    /// blackout; consumers decide whether to surface the state while true.
    pub is_blackout: bool,
}

impl VesselState {
    /// Normalise course into `[0, 360)` and clamp speed at zero, the two
    /// universal invariants (P1) every constructor must apply.
    pub fn normalize(mut self) -> Self {
        self.course_deg = ((self.course_deg % 360.0) + 360.0) % 360.0;
        if self.speed_kn < 0.0 {
            self.speed_kn = 0.0;
        }
        self
    }

    /// The null-island sentinel check (P2): `(0, 0)` is never a valid fix.
    pub fn is_null_island(lat: f64, lon: f64) -> bool {
        lat == 0.0 && lon == 0.0
    }
}
