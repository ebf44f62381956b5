//! # fleet-types
//!
//! Shared geodesy, dead-reckoning and fleet data-model types for the maritime
//! situational-awareness simulator.
//!
//! These types are used by:
//! - `fleet-sim`: AIS ingest, synthetic vessel simulators, the channel model
//!   and the fleet tick driver all build on the primitives defined here.
//! - any external reader of a fleet snapshot (the dashboard, report writers,
//!   data-lake staging) that only needs the serialisable data model, not the
//!   async machinery that produces it.
//!
//! ## Coordinate conventions
//!
//! - Latitude/longitude in degrees, WGS-84-ish spherical Earth (R = 6 371 000 m).
//! - Longitude is normalised to `(-180, 180]`; latitude to `[-90, 90]`.
//! - Course/bearing in degrees, `[0, 360)`, clockwise from true north.
//!
//! ## Invariants
//!
//! - `(lat=0, lon=0)` is never a valid fix (the null-island sentinel) — rejected
//!   at the ingest boundary, never stored.
//! - Per-identity updates are applied in non-decreasing timestamp order.

pub mod channel;
pub mod corridor;
pub mod dead_reckoning;
pub mod error;
pub mod geo;
pub mod predicted_transit;
pub mod route;
pub mod vessel;

pub use channel::{ChannelKind, ChannelProfile, SeaState};
pub use corridor::{Corridor, GeofenceZone, Severity, ViolationEvent, ViolationKind, ZonePolicy};
pub use dead_reckoning::{DeadReckoningEngine, Prediction};
pub use error::{ConfigError, RouteError};
pub use geo::LatLon;
pub use route::{Route, Waypoint};
pub use vessel::{ClassificationTag, DataSource, VesselId, VesselState};
