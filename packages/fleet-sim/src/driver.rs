//! Fleet tick driver (C8): advances the synthetic simulators, merges their
//! output into the vessel store, drains the AIS ingest queue, and
//! optionally gates visibility of the newest update through the channel
//! simulator.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use fleet_types::dead_reckoning::AmbientForcing;
use fleet_types::{DataSource, StaticData, VesselState};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info};

use crate::ais_client::AisIngestClient;
use crate::channel_sim::{ChannelMetrics, ChannelSimulator};
use crate::corridor_sim::{CorridorSimulator, TickedVessel as CorridorTick};
use crate::predicted_transit_sim::{PredictedTransitSimulator, TickedVessel as PredictedTransitTick};
use crate::vessel_store::VesselStore;
use crate::waypoint_sim::{TickedVessel as WaypointTick, WaypointSimulator};

/// Driver-tuning knobs (the "wall-clock multiple scaled by a configured
/// speed factor" of spec.md §4.8).
#[derive(Debug, Clone)]
pub struct FleetDriverConfig {
    /// Wall-clock spacing between ticks.
    pub tick_wall_interval: StdDuration,
    /// Simulated-time multiplier applied to `tick_wall_interval` to get
    /// the `dt` handed to the simulators each tick.
    pub speed_factor: f64,
    /// Maximum AIS messages drained from the ingest queue per tick.
    pub ais_drain_batch: usize,
    /// Ambient wind/current applied to every simulated vessel this tick.
    pub ambient: AmbientForcing,
    /// When true, each newly-produced update (simulated or AIS) is sampled
    /// against the channel simulator; a simulated "lost" transmission is
    /// not published to the store this tick.
    pub gate_with_channel: bool,
}

impl Default for FleetDriverConfig {
    fn default() -> Self {
        Self {
            tick_wall_interval: StdDuration::from_secs(1),
            speed_factor: 1.0,
            ais_drain_batch: 50,
            ambient: AmbientForcing::default(),
            gate_with_channel: false,
        }
    }
}

/// One tick's summary, useful for logging/status reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickSummary {
    pub waypoint_updates: usize,
    pub corridor_updates: usize,
    pub predicted_transit_updates: usize,
    pub ais_drained: usize,
    pub gated_drops: usize,
}

/// Ties together the waypoint/corridor simulators (C5/C6), the AIS ingest
/// client (C3), the vessel store (C4) and the channel simulator (C7).
pub struct FleetDriver {
    store: VesselStore,
    waypoint_sim: Option<WaypointSimulator>,
    corridor_sim: Option<CorridorSimulator>,
    predicted_transit_sim: Option<PredictedTransitSimulator>,
    ais_client: Option<Arc<AisIngestClient>>,
    channel: Option<ChannelSimulator>,
    channel_metrics_tx: watch::Sender<Option<ChannelMetrics>>,
    violations_tx: watch::Sender<Vec<fleet_types::ViolationEvent>>,
    config: FleetDriverConfig,
}

impl FleetDriver {
    pub fn new(store: VesselStore, config: FleetDriverConfig) -> Self {
        let (channel_metrics_tx, _) = watch::channel(None);
        let (violations_tx, _) = watch::channel(Vec::new());
        Self {
            store,
            waypoint_sim: None,
            corridor_sim: None,
            predicted_transit_sim: None,
            ais_client: None,
            channel: None,
            channel_metrics_tx,
            violations_tx,
            config,
        }
    }

    /// Read-only subscription to the channel simulator's aggregate metrics,
    /// refreshed once per tick — the status server's window onto the
    /// otherwise single-owner, driver-only channel simulator.
    pub fn subscribe_channel_metrics(&self) -> watch::Receiver<Option<ChannelMetrics>> {
        self.channel_metrics_tx.subscribe()
    }

    /// Read-only subscription to the corridor simulator's append-only
    /// violation log, refreshed once per tick.
    pub fn subscribe_violations(&self) -> watch::Receiver<Vec<fleet_types::ViolationEvent>> {
        self.violations_tx.subscribe()
    }

    pub fn with_waypoint_simulator(mut self, sim: WaypointSimulator) -> Self {
        self.waypoint_sim = Some(sim);
        self
    }

    pub fn with_corridor_simulator(mut self, sim: CorridorSimulator) -> Self {
        self.corridor_sim = Some(sim);
        self
    }

    pub fn with_predicted_transit_simulator(mut self, sim: PredictedTransitSimulator) -> Self {
        self.predicted_transit_sim = Some(sim);
        self
    }

    pub fn with_ais_client(mut self, client: Arc<AisIngestClient>) -> Self {
        self.ais_client = Some(client);
        self
    }

    pub fn with_channel_simulator(mut self, channel: ChannelSimulator) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn store(&self) -> &VesselStore {
        &self.store
    }

    /// Corridor violation log accumulated so far (append-only; copied out).
    pub fn violations(&self) -> Vec<fleet_types::ViolationEvent> {
        self.corridor_sim
            .as_ref()
            .map(|s| s.violations())
            .unwrap_or_default()
    }

    /// Advance one tick: (1) step each simulator by `dt`, (2) publish
    /// results into the store honouring timestamp monotonicity, (3) drain
    /// up to `ais_drain_batch` AIS messages into the store, (4) optionally
    /// gate the newest update's visibility through the channel simulator.
    pub async fn tick(&mut self) -> TickSummary {
        let dt_s = self.config.tick_wall_interval.as_secs_f64() * self.config.speed_factor;
        let now = Utc::now();
        let mut summary = TickSummary::default();

        if let Some(sim) = self.waypoint_sim.as_mut() {
            let ticks = sim.tick(dt_s, self.config.ambient, now);
            for t in ticks {
                if self.publish_waypoint(t).await {
                    summary.waypoint_updates += 1;
                } else {
                    summary.gated_drops += 1;
                }
            }
        }

        if let Some(sim) = self.corridor_sim.as_mut() {
            let ticks = sim.tick(dt_s, self.config.ambient, now);
            for t in ticks {
                if self.publish_corridor(t).await {
                    summary.corridor_updates += 1;
                } else {
                    summary.gated_drops += 1;
                }
            }
        }

        if let Some(sim) = self.predicted_transit_sim.as_ref() {
            for t in sim.tick(now) {
                self.publish_predicted_transit(t).await;
                summary.predicted_transit_updates += 1;
            }
        }

        if let Some(client) = self.ais_client.clone() {
            let drained = client.drain_up_to(self.config.ais_drain_batch).await;
            summary.ais_drained = drained.len();
            for state in drained {
                if self.gate(now) {
                    self.store.upsert(state).await;
                } else {
                    summary.gated_drops += 1;
                }
            }
        }

        if let Some(channel) = self.channel.as_ref() {
            let _ = self.channel_metrics_tx.send(Some(channel.metrics()));
        }
        if let Some(corridor_sim) = self.corridor_sim.as_ref() {
            let _ = self.violations_tx.send(corridor_sim.violations());
        }

        debug!(
            waypoint = summary.waypoint_updates,
            corridor = summary.corridor_updates,
            predicted_transit = summary.predicted_transit_updates,
            ais = summary.ais_drained,
            gated_drops = summary.gated_drops,
            "fleet tick"
        );
        summary
    }

    async fn publish_waypoint(&mut self, t: WaypointTick) -> bool {
        if !self.gate(t.timestamp) {
            return false;
        }
        let state = VesselState {
            id: t.id,
            name: Some(t.name),
            classification: t.classification,
            position: t.position,
            course_deg: t.course_deg,
            speed_kn: t.speed_kn,
            heading_deg: None,
            position_accuracy: true,
            r#static: StaticData::default(),
            timestamp: t.timestamp,
            data_source: t.data_source,
            simulated: true,
            is_blackout: t.is_blackout,
        }
        .normalize();
        self.store.upsert(state).await;
        true
    }

    async fn publish_corridor(&mut self, t: CorridorTick) -> bool {
        if !self.gate(t.timestamp) {
            return false;
        }
        let state = VesselState {
            id: t.id,
            name: Some(t.name),
            classification: t.classification,
            position: t.position,
            course_deg: t.course_deg,
            speed_kn: t.speed_kn,
            heading_deg: None,
            position_accuracy: true,
            r#static: StaticData::default(),
            timestamp: t.timestamp,
            data_source: t.data_source,
            simulated: true,
            is_blackout: false,
        }
        .normalize();
        self.store.upsert(state).await;
        true
    }

    /// Predicted-transit vessels are reconstructed on demand, not
    /// transmitted over any channel, so they bypass the channel gate
    /// entirely — there is no transmission to lose.
    async fn publish_predicted_transit(&mut self, t: PredictedTransitTick) {
        let state = VesselState {
            id: t.id,
            name: Some(t.name),
            classification: t.classification,
            position: t.position,
            course_deg: t.course_deg,
            speed_kn: 0.0,
            heading_deg: None,
            position_accuracy: false,
            r#static: StaticData {
                destination: Some(t.leg_label),
                ..StaticData::default()
            },
            timestamp: t.timestamp,
            data_source: t.data_source,
            simulated: true,
            is_blackout: false,
        }
        .normalize();
        self.store.upsert(state).await;
    }

    /// Sample the channel simulator, when gating is enabled, to decide
    /// whether this tick's update becomes externally visible.
    fn gate(&mut self, now: chrono::DateTime<Utc>) -> bool {
        if !self.config.gate_with_channel {
            return true;
        }
        match self.channel.as_mut() {
            Some(channel) => channel.process_transmission(now).success,
            None => true,
        }
    }

    /// Run the tick loop until `shutdown` is signalled; completes the
    /// current tick before exiting.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.tick_wall_interval);
        info!(
            interval_ms = self.config.tick_wall_interval.as_millis() as u64,
            speed_factor = self.config.speed_factor,
            "fleet driver starting"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("fleet driver: shutdown signal received, completing current tick");
                        break;
                    }
                }
            }
        }
    }
}
