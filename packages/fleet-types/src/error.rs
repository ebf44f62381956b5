//! Typed error taxonomy shared across the workspace (see §7 of the error
//! handling design: most of these are construction-time/config errors; the
//! runtime errors live in `fleet-sim::ais_client`).

use thiserror::Error;

/// Errors surfaced while constructing simulator configuration (routes,
/// corridors, geofences).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route/corridor/polygon requires at least {min} points, got {got}", min = 2)]
    TooFewWaypoints { got: usize },
}

/// Errors surfaced at startup while assembling the simulator's configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("AISSTREAM_API_KEY is required when ENABLE_REAL_AIS is true")]
    MissingApiKey,

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
