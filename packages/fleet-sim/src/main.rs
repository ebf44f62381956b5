//! fleet-sim entry point: config/CLI/logging setup, then wires the core
//! subsystems together (see `lib.rs`) and serves the resulting fleet state
//! as read-only JSON through a small `axum` status server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{extract::State, response::Json, routing::get, Router};
use clap::Parser;
use fleet_types::dead_reckoning::AmbientForcing;
use fleet_types::{
    ChannelKind, ChannelProfile, ClassificationTag, Corridor, GeofenceZone, LatLon, Route,
    SeaState, VesselId, Waypoint, ZonePolicy,
};
use serde::Deserialize;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use fleet_sim::ais_client::{AisIngestClient, IngestConfig, IngestStats};
use fleet_sim::channel_sim::{ChannelMetrics, ChannelSimulator};
use fleet_sim::corridor_sim::{CorridorSimulator, CorridorVesselConfig};
use fleet_sim::driver::{FleetDriver, FleetDriverConfig};
use fleet_sim::predicted_transit_sim::{PredictedTransitSimulator, PredictedTransitVesselConfig};
use fleet_sim::vessel_store::VesselStore;
use fleet_sim::waypoint_sim::{WaypointSimulator, WaypointVesselConfig};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fleet-sim", about = "Maritime fleet situational-awareness simulator")]
struct Args {
    /// Config file path (falls back to the embedded default if unreadable).
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Simulation speed multiplier (1.0 = real-time).
    #[arg(long, default_value = "1.0")]
    speed: f64,
    /// Disable live AIS ingest even if AISSTREAM_API_KEY is configured.
    #[arg(long)]
    no_ais: bool,
    /// Read-only status server port.
    #[arg(long, default_value = "8090")]
    status_port: u16,
}

// ── Configuration file schema ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FleetConfig {
    channel: ChannelCfg,
    #[serde(default)]
    ambient: AmbientForcing,
    #[serde(default)]
    ammonia_fleet: Vec<AmmoniaVesselCfg>,
    #[serde(default)]
    smr_fleet: Vec<SmrVesselCfg>,
    #[serde(default)]
    predicted_transit_fleet: Vec<PredictedTransitVesselCfg>,
}

#[derive(Debug, Deserialize)]
struct ChannelCfg {
    kind: ChannelKind,
    #[serde(default)]
    sea_state: Option<SeaState>,
    #[serde(default)]
    degradation_level: f64,
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct WaypointCfg {
    lat: f64,
    lon: f64,
    label: String,
    arrival_speed_kn: f64,
}

#[derive(Debug, Deserialize)]
struct RouteCfg {
    name: String,
    waypoints: Vec<WaypointCfg>,
}

#[derive(Debug, Deserialize)]
struct AmmoniaVesselCfg {
    fleet_index: u32,
    name: String,
    cruise_speed_kn: f64,
    min_speed_kn: f64,
    blackout_probability_per_tick: f64,
    blackout_min_duration_s: f64,
    blackout_max_duration_s: f64,
    route: RouteCfg,
}

#[derive(Debug, Deserialize)]
struct CorridorCfg {
    name: String,
    half_width_m: f64,
    max_speed_kn: f64,
    centerline: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct GeofenceCfg {
    zone_id: String,
    name: String,
    policy: ZonePolicy,
    #[serde(default)]
    max_speed_kn: Option<f64>,
    #[serde(default)]
    mandatory_reporting: bool,
    ring: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct PredictedTransitVesselCfg {
    vessel_id: String,
    name: String,
    speed_kn: f64,
    /// Seconds before process start that this vessel's transit began, so
    /// the lazy sequence starts partway along its route on boot.
    #[serde(default)]
    started_ago_s: f64,
    route: RouteCfg,
}

#[derive(Debug, Deserialize)]
struct SmrVesselCfg {
    name: String,
    cruise_speed_kn: f64,
    deviation_threshold_m: f64,
    corridor: CorridorCfg,
    #[serde(default)]
    geofences: Vec<GeofenceCfg>,
}

fn build_route(cfg: RouteCfg) -> anyhow::Result<Route> {
    let waypoints = cfg
        .waypoints
        .into_iter()
        .map(|w| Waypoint::new(w.lat, w.lon, w.label, w.arrival_speed_kn))
        .collect();
    Route::new(cfg.name, waypoints).context("config-invalid: route needs at least two waypoints")
}

fn build_corridor(cfg: CorridorCfg) -> anyhow::Result<Corridor> {
    let centerline = cfg.centerline.into_iter().map(|[lat, lon]| LatLon::new(lat, lon)).collect();
    Corridor::new(cfg.name, centerline, cfg.half_width_m, cfg.max_speed_kn)
        .context("config-invalid: corridor needs at least two centreline points")
}

fn build_geofence(cfg: GeofenceCfg) -> anyhow::Result<GeofenceZone> {
    let ring = cfg.ring.into_iter().map(|[lat, lon]| LatLon::new(lat, lon)).collect();
    GeofenceZone::new(
        cfg.zone_id,
        cfg.name,
        cfg.policy,
        ring,
        cfg.max_speed_kn,
        cfg.mandatory_reporting,
    )
    .context("config-invalid: geofence ring needs at least three points")
}

fn channel_profile_for(kind: ChannelKind) -> ChannelProfile {
    match kind {
        ChannelKind::TerrestrialAis => ChannelProfile::terrestrial_ais(),
        ChannelKind::Geostationary => ChannelProfile::geostationary(),
        ChannelKind::Leo => ChannelProfile::leo(),
    }
}

// ── Environment-driven config (spec.md §6) ───────────────────────────────────

struct EnvConfig {
    aisstream_api_key: Option<String>,
    enable_real_ais: bool,
    simulation_update_interval_sec: u64,
}

fn read_env_config() -> EnvConfig {
    let aisstream_api_key = std::env::var("AISSTREAM_API_KEY").ok().filter(|s| !s.is_empty());
    let enable_real_ais = std::env::var("ENABLE_REAL_AIS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(true);
    let simulation_update_interval_sec = std::env::var("SIMULATION_UPDATE_INTERVAL_SEC")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(10);
    EnvConfig {
        aisstream_api_key,
        enable_real_ais,
        simulation_update_interval_sec,
    }
}

// ── Status server ─────────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    store: VesselStore,
    ais_client: Option<Arc<AisIngestClient>>,
    channel_metrics_rx: watch::Receiver<Option<ChannelMetrics>>,
    violations_rx: watch::Receiver<Vec<fleet_types::ViolationEvent>>,
}

async fn health() -> &'static str {
    "fleet-sim ok"
}

async fn fleet_snapshot(State(state): State<AppState>) -> Json<Vec<fleet_types::VesselState>> {
    Json(state.store.snapshot_all().await)
}

async fn violations(State(state): State<AppState>) -> Json<Vec<fleet_types::ViolationEvent>> {
    Json(state.violations_rx.borrow().clone())
}

#[derive(serde::Serialize)]
struct StatsView {
    ingest: Option<IngestStats>,
    channel: Option<ChannelMetrics>,
    vessel_count: usize,
}

async fn stats(State(state): State<AppState>) -> Json<StatsView> {
    let ingest = match &state.ais_client {
        Some(client) => Some(client.stats().await),
        None => None,
    };
    Json(StatsView {
        ingest,
        channel: *state.channel_metrics_rx.borrow(),
        vessel_count: state.store.len().await,
    })
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = read_env_config();
    let default_filter = format!(
        "fleet_sim={}",
        std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let args = Args::parse();

    let config_str =
        std::fs::read_to_string(&args.config).unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let cfg: FleetConfig = toml::from_str(&config_str).context("invalid config.toml")?;

    info!(
        ammonia = cfg.ammonia_fleet.len(),
        smr = cfg.smr_fleet.len(),
        "fleet-sim starting"
    );

    let store = VesselStore::new();

    let waypoint_configs: Vec<WaypointVesselConfig> = cfg
        .ammonia_fleet
        .into_iter()
        .map(|v| -> anyhow::Result<WaypointVesselConfig> {
            Ok(WaypointVesselConfig {
                id: VesselId::ammonia(v.fleet_index),
                name: v.name,
                classification: ClassificationTag::AmmoniaSim,
                route: build_route(v.route)?,
                cruise_speed_kn: v.cruise_speed_kn,
                min_speed_kn: v.min_speed_kn,
                blackout_probability_per_tick: v.blackout_probability_per_tick,
                blackout_min_duration_s: v.blackout_min_duration_s,
                blackout_max_duration_s: v.blackout_max_duration_s,
            })
        })
        .collect::<anyhow::Result<_>>()?;

    let waypoint_sim = if waypoint_configs.is_empty() {
        None
    } else {
        Some(WaypointSimulator::new(waypoint_configs, cfg.channel.seed))
    };

    if cfg.smr_fleet.len() > 1 {
        warn!(
            "config declares {} SMR vessels but the SMR identity is pinned to a single MMSI; \
             only the first entry will be simulated",
            cfg.smr_fleet.len()
        );
    }
    let corridor_configs: Vec<CorridorVesselConfig> = cfg
        .smr_fleet
        .into_iter()
        .take(1)
        .map(|v| -> anyhow::Result<CorridorVesselConfig> {
            let geofences = v.geofences.into_iter().map(build_geofence).collect::<anyhow::Result<Vec<_>>>()?;
            Ok(CorridorVesselConfig {
                id: VesselId::smr(),
                name: v.name,
                classification: ClassificationTag::SmrSim,
                corridor: build_corridor(v.corridor)?,
                geofences,
                cruise_speed_kn: v.cruise_speed_kn,
                deviation_threshold_m: v.deviation_threshold_m,
            })
        })
        .collect::<anyhow::Result<_>>()?;

    let corridor_sim = if corridor_configs.is_empty() {
        None
    } else {
        Some(CorridorSimulator::new(corridor_configs))
    };

    let now = chrono::Utc::now();
    let predicted_transit_configs: Vec<PredictedTransitVesselConfig> = cfg
        .predicted_transit_fleet
        .into_iter()
        .map(|v| -> anyhow::Result<PredictedTransitVesselConfig> {
            let id = VesselId::new(v.vessel_id.clone())
                .with_context(|| format!("config-invalid: {} is not a 9-digit MMSI", v.vessel_id))?;
            Ok(PredictedTransitVesselConfig {
                id,
                name: v.name,
                route: build_route(v.route)?,
                speed_kn: v.speed_kn,
                started_at: now - chrono::Duration::seconds(v.started_ago_s as i64),
            })
        })
        .collect::<anyhow::Result<_>>()?;

    let predicted_transit_sim = if predicted_transit_configs.is_empty() {
        None
    } else {
        Some(PredictedTransitSimulator::new(predicted_transit_configs))
    };

    let channel_profile = channel_profile_for(cfg.channel.kind);
    let mut channel = ChannelSimulator::new(channel_profile, cfg.channel.seed);
    channel.set_degradation_level(cfg.channel.degradation_level);
    if let Some(sea_state) = cfg.channel.sea_state {
        channel.set_sea_state(sea_state);
    }

    let ais_client = if env.enable_real_ais && !args.no_ais {
        let api_key = env
            .aisstream_api_key
            .clone()
            .context("config-invalid: AISSTREAM_API_KEY is required when ENABLE_REAL_AIS is true")?;
        let client = Arc::new(AisIngestClient::new(IngestConfig {
            api_key,
            ..IngestConfig::default()
        }));
        let run_client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = run_client.run().await {
                error!("AIS ingest client terminated: {e}");
            }
        });
        Some(client)
    } else {
        info!("live AIS ingest disabled (ENABLE_REAL_AIS=false or --no-ais)");
        None
    };

    let driver_config = FleetDriverConfig {
        tick_wall_interval: Duration::from_secs(env.simulation_update_interval_sec),
        speed_factor: args.speed,
        ambient: cfg.ambient,
        gate_with_channel: true,
        ..FleetDriverConfig::default()
    };

    let mut driver = FleetDriver::new(store.clone(), driver_config).with_channel_simulator(channel);
    if let Some(sim) = waypoint_sim {
        driver = driver.with_waypoint_simulator(sim);
    }
    if let Some(sim) = corridor_sim {
        driver = driver.with_corridor_simulator(sim);
    }
    if let Some(sim) = predicted_transit_sim {
        driver = driver.with_predicted_transit_simulator(sim);
    }
    if let Some(client) = ais_client.clone() {
        driver = driver.with_ais_client(client);
    }

    let channel_metrics_rx = driver.subscribe_channel_metrics();
    let violations_rx = driver.subscribe_violations();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        driver.run(shutdown_rx).await;
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let app_state = AppState {
        store,
        ais_client,
        channel_metrics_rx,
        violations_rx,
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/fleet", get(fleet_snapshot))
        .route("/violations", get(violations))
        .route("/stats", get(stats))
        .with_state(app_state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let status_addr = format!("0.0.0.0:{}", args.status_port);
    info!("status server listening on http://{status_addr}");
    let listener = tokio::net::TcpListener::bind(&status_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
