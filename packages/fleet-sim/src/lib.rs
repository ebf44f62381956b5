//! fleet-sim — maritime situational-awareness simulator.
//!
//! Wires together the three core subsystems — live AIS ingest (C3), the
//! waypoint/corridor trajectory simulators (C5/C6) feeding off the shared
//! geodesy/dead-reckoning primitives (C1/C2) in `fleet-types`, and the
//! channel simulator (C7) — behind a single fleet tick driver (C8).
//!
//! The binary (`src/main.rs`) is a thin wrapper: config/CLI/logging setup
//! plus a read-only `axum` status server. Everything it wires together lives
//! here so it can be exercised directly by integration tests in `tests/`.

pub mod ais_client;
pub mod channel_sim;
pub mod corridor_sim;
pub mod driver;
pub mod predicted_transit_sim;
pub mod vessel_store;
pub mod waypoint_sim;
