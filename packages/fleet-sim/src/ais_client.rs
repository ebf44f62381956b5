//! Live AIS ingest client (C3): connection lifecycle, subscription,
//! message normalisation, identity cache and a back-pressured queue.
//!
//! Wire format and filtering rules are ported from the aisstream.io
//! consumer this simulator's AIS feed is modelled on: a JSON envelope per
//! frame, `MessageType` tagging `PositionReport`/`ShipStaticData`, metadata
//! carrying the MMSI.

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use fleet_types::{ClassificationTag, DataSource, LatLon, StaticData, VesselId, VesselState};

/// The five autonomous vessels admitted regardless of ship-type or cache
/// pressure — the same fixed allowlist the source notebook hardcodes.
pub const DEFAULT_AUTONOMOUS_MMSI: &[&str] = &[
    "257646000", // Yara Birkeland
    "259005610", // Therese
    "258022650", // Marit
    "352986205", // Prism Courage
    "440326000", // HMM Algeciras
];

/// Cargo (70-79) and tanker (80-89) ship-type codes admitted via fallback
/// filtering when a vessel isn't on the autonomous allowlist.
pub const DEFAULT_CARGO_TANKER_TYPES: RangeInclusive<u32> = 70..=89;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Subscribed,
    Streaming,
    Draining,
    Backoff(u32),
    Stopped,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transient transport error: {0}")]
    TransientTransport(String),
    #[error("malformed AIS message: {0}")]
    MalformedMessage(String),
    #[error("invalid position (null island or out of range)")]
    InvalidPosition,
    #[error("AISSTREAM_API_KEY missing but ingest is enabled")]
    ConfigInvalid,
    #[error("reconnect budget exhausted after {0} attempts")]
    TerminalTransport(u32),
}

/// Tunable ingest parameters.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub url: String,
    pub api_key: String,
    /// Pairs of (lat, lon) corners, one box per entry.
    pub bounding_boxes: Vec<[[f64; 2]; 2]>,
    pub autonomous_allowlist: HashSet<String>,
    pub cargo_tanker_types: RangeInclusive<u32>,
    pub fallback_filtering_enabled: bool,
    pub max_cached_vessels: usize,
    pub queue_capacity: usize,
    pub max_reconnect_attempts: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: "wss://stream.aisstream.io/v0/stream".to_string(),
            api_key: String::new(),
            bounding_boxes: vec![[[-90.0, -180.0], [90.0, 180.0]]],
            autonomous_allowlist: DEFAULT_AUTONOMOUS_MMSI.iter().map(|s| s.to_string()).collect(),
            cargo_tanker_types: DEFAULT_CARGO_TANKER_TYPES,
            fallback_filtering_enabled: true,
            max_cached_vessels: 500,
            queue_capacity: 1000,
            max_reconnect_attempts: 10,
        }
    }
}

/// Point-in-time statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    pub messages_received: u64,
    pub messages_filtered: u64,
    pub parse_errors: u64,
    pub queue_drops: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub connection_state: ConnectionState,
    pub attempts: u32,
    pub cached_vessel_count: usize,
    pub queue_depth: usize,
}

#[derive(Default)]
struct StatsInner {
    messages_received: AtomicU64,
    messages_filtered: AtomicU64,
    parse_errors: AtomicU64,
    queue_drops: AtomicU64,
    attempts: AtomicU32,
    last_update: Mutex<Option<DateTime<Utc>>>,
}

/// Wire envelope sent as the first frame after connect.
#[derive(Debug, Serialize)]
struct SubscribeFrame<'a> {
    #[serde(rename = "APIKey")]
    api_key: &'a str,
    #[serde(rename = "BoundingBoxes")]
    bounding_boxes: &'a [[[f64; 2]; 2]],
    #[serde(rename = "FilterMessageTypes")]
    filter_message_types: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "MessageType")]
    message_type: String,
    #[serde(rename = "MetaData")]
    meta_data: MetaData,
    #[serde(rename = "Message")]
    message: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MetaData {
    #[serde(rename = "MMSI")]
    mmsi: serde_json::Value,
    #[serde(rename = "ShipName")]
    ship_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionReportPayload {
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Cog")]
    cog: f64,
    #[serde(rename = "Sog")]
    sog: f64,
    #[serde(rename = "TrueHeading")]
    true_heading: Option<f64>,
    #[serde(rename = "PositionAccuracy")]
    position_accuracy: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Dimension {
    #[serde(rename = "A")]
    a: f64,
    #[serde(rename = "B")]
    b: f64,
    #[serde(rename = "C")]
    c: f64,
    #[serde(rename = "D")]
    d: f64,
}

#[derive(Debug, Deserialize)]
struct Eta {
    #[serde(rename = "Month")]
    month: u32,
    #[serde(rename = "Day")]
    day: u32,
    #[serde(rename = "Hour")]
    hour: u32,
    #[serde(rename = "Minute")]
    minute: u32,
}

#[derive(Debug, Deserialize)]
struct ShipStaticDataPayload {
    #[serde(rename = "Dimension")]
    dimension: Option<Dimension>,
    #[serde(rename = "Draught")]
    draught: Option<f64>,
    #[serde(rename = "Destination")]
    destination: Option<String>,
    #[serde(rename = "Eta")]
    eta: Option<Eta>,
    #[serde(rename = "Type")]
    ship_type: Option<u32>,
}

/// Live AIS ingest client: connects out, normalises incoming frames into
/// `VesselState` upserts, and exposes them through a bounded drop-head
/// queue for the fleet tick driver to drain.
pub struct AisIngestClient {
    config: IngestConfig,
    state_tx: watch::Sender<ConnectionState>,
    stats: Arc<StatsInner>,
    queue: Arc<Mutex<VecDeque<VesselState>>>,
    cache: Arc<Mutex<HashMap<VesselId, VesselState>>>,
    stop: Arc<std::sync::atomic::AtomicBool>,
    callback: Option<Arc<dyn Fn(&VesselState) + Send + Sync>>,
}

impl AisIngestClient {
    pub fn new(config: IngestConfig) -> Self {
        let (state_tx, _rx) = watch::channel(ConnectionState::Idle);
        Self {
            config,
            state_tx,
            stats: Arc::new(StatsInner::default()),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            cache: Arc::new(Mutex::new(HashMap::new())),
            stop: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            callback: None,
        }
    }

    /// Attach a callback run synchronously in the receive path, before
    /// enqueue. It MUST be non-blocking — long-running work belongs to a
    /// task that consumes the queue instead.
    pub fn with_callback(mut self, callback: Arc<dyn Fn(&VesselState) + Send + Sync>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub async fn stats(&self) -> IngestStats {
        IngestStats {
            messages_received: self.stats.messages_received.load(Ordering::Relaxed),
            messages_filtered: self.stats.messages_filtered.load(Ordering::Relaxed),
            parse_errors: self.stats.parse_errors.load(Ordering::Relaxed),
            queue_drops: self.stats.queue_drops.load(Ordering::Relaxed),
            last_update: *self.stats.last_update.lock().await,
            connection_state: self.state(),
            attempts: self.stats.attempts.load(Ordering::Relaxed),
            cached_vessel_count: self.cache.lock().await.len(),
            queue_depth: self.queue.lock().await.len(),
        }
    }

    /// Request a graceful stop; the receive loop exits on its next
    /// suspension point.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.state_tx.send(ConnectionState::Stopped);
    }

    /// Drain up to `k` queued upserts, oldest first.
    pub async fn drain_up_to(&self, k: usize) -> Vec<VesselState> {
        let mut q = self.queue.lock().await;
        let n = k.min(q.len());
        q.drain(..n).collect()
    }

    /// Run the connect/subscribe/receive loop until `stop()` is called or
    /// the reconnect budget is exhausted. Intended to run as its own
    /// `tokio::spawn`ed task.
    pub async fn run(&self) -> Result<(), IngestError> {
        if self.config.api_key.is_empty() {
            return Err(IngestError::ConfigInvalid);
        }

        let mut attempt: u32 = 0;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                let _ = self.state_tx.send(ConnectionState::Stopped);
                return Ok(());
            }

            let _ = self.state_tx.send(ConnectionState::Connecting);
            match self.connect_and_stream().await {
                Ok(()) => {
                    // Clean disconnect (server closed); reset backoff and
                    // try again unless stopped.
                    attempt = 0;
                }
                Err(e) => {
                    warn!("AIS ingest: {e}");
                }
            }

            if self.stop.load(Ordering::SeqCst) {
                let _ = self.state_tx.send(ConnectionState::Stopped);
                return Ok(());
            }

            attempt += 1;
            self.stats.attempts.store(attempt, Ordering::Relaxed);
            if attempt > self.config.max_reconnect_attempts {
                let _ = self.state_tx.send(ConnectionState::Stopped);
                return Err(IngestError::TerminalTransport(attempt));
            }

            let backoff_secs = (2u64.saturating_pow(attempt)).min(60);
            let _ = self.state_tx.send(ConnectionState::Backoff(attempt));
            info!("AIS ingest: reconnecting in {backoff_secs}s (attempt {attempt})");
            tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
        }
    }

    async fn connect_and_stream(&self) -> Result<(), IngestError> {
        let (mut ws, _resp) = tokio_tungstenite::connect_async(&self.config.url)
            .await
            .map_err(|e| IngestError::TransientTransport(e.to_string()))?;

        let subscribe = SubscribeFrame {
            api_key: &self.config.api_key,
            bounding_boxes: &self.config.bounding_boxes,
            filter_message_types: ["PositionReport", "ShipStaticData"],
        };
        let frame = serde_json::to_string(&subscribe)
            .map_err(|e| IngestError::MalformedMessage(e.to_string()))?;
        ws.send(WsMessage::Text(frame))
            .await
            .map_err(|e| IngestError::TransientTransport(e.to_string()))?;

        let _ = self.state_tx.send(ConnectionState::Subscribed);
        let _ = self.state_tx.send(ConnectionState::Streaming);

        while let Some(msg) = ws.next().await {
            if self.stop.load(Ordering::SeqCst) {
                let _ = self.state_tx.send(ConnectionState::Draining);
                break;
            }
            match msg {
                Ok(WsMessage::Text(text)) => self.handle_frame(&text).await,
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => return Err(IngestError::TransientTransport(e.to_string())),
            }
        }
        Ok(())
    }

    async fn handle_frame(&self, text: &str) {
        self.stats.messages_received.fetch_add(1, Ordering::Relaxed);

        let envelope: InboundEnvelope = match serde_json::from_str(text) {
            Ok(e) => e,
            Err(e) => {
                debug!("AIS ingest: parse error: {e}");
                self.stats.parse_errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let mmsi = envelope.meta_data.mmsi.to_string().trim_matches('"').to_string();
        let Some(id) = VesselId::new(mmsi) else {
            self.stats.parse_errors.fetch_add(1, Ordering::Relaxed);
            return;
        };

        match envelope.message_type.as_str() {
            "PositionReport" => self.handle_position_report(id, envelope).await,
            "ShipStaticData" => self.handle_static_data(id, envelope).await,
            other => debug!("AIS ingest: ignoring unknown message type {other}"),
        }
    }

    fn classify(&self, id: &VesselId, ship_type: Option<u32>) -> Option<ClassificationTag> {
        if self.config.autonomous_allowlist.contains(id.as_str()) {
            return Some(ClassificationTag::Autonomous);
        }
        if self.config.fallback_filtering_enabled {
            if let Some(t) = ship_type {
                if self.config.cargo_tanker_types.contains(&t) {
                    return Some(ClassificationTag::CargoTanker);
                }
            }
        }
        None
    }

    async fn handle_position_report(&self, id: VesselId, envelope: InboundEnvelope) {
        let Ok(payload) = serde_json::from_value::<PositionReportPayload>(envelope.message["PositionReport"].clone()) else {
            self.stats.parse_errors.fetch_add(1, Ordering::Relaxed);
            return;
        };

        if VesselState::is_null_island(payload.latitude, payload.longitude) {
            return; // invalid-position: dropped, cache untouched
        }

        let mut cache = self.cache.lock().await;
        let existing_type = None; // ship-type arrives only via static data in this feed
        let classification = match cache.get(&id).map(|v| v.classification) {
            Some(c) => Some(c),
            None => self.classify(&id, existing_type),
        };
        let Some(classification) = classification else {
            self.stats.messages_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        };

        if !cache.contains_key(&id) && cache.len() >= self.config.max_cached_vessels
            && classification != ClassificationTag::Autonomous
        {
            self.stats.messages_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let now = Utc::now();
        let mut state = cache.get(&id).cloned().unwrap_or_else(|| VesselState {
            id: id.clone(),
            name: envelope.meta_data.ship_name.clone(),
            classification,
            position: LatLon::new(payload.latitude, payload.longitude),
            course_deg: payload.cog,
            speed_kn: payload.sog,
            heading_deg: payload.true_heading,
            position_accuracy: payload.position_accuracy.unwrap_or(false),
            r#static: StaticData::default(),
            timestamp: now,
            data_source: DataSource::Ais,
            simulated: false,
            is_blackout: false,
        });

        state.position = LatLon::new(payload.latitude, payload.longitude);
        state.course_deg = payload.cog;
        state.speed_kn = payload.sog;
        state.heading_deg = payload.true_heading;
        state.position_accuracy = payload.position_accuracy.unwrap_or(state.position_accuracy);
        state.timestamp = now;
        state = state.normalize();

        cache.insert(id, state.clone());
        drop(cache);

        self.publish(state).await;
    }

    async fn handle_static_data(&self, id: VesselId, envelope: InboundEnvelope) {
        let Ok(payload) = serde_json::from_value::<ShipStaticDataPayload>(envelope.message["ShipStaticData"].clone()) else {
            self.stats.parse_errors.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let mut cache = self.cache.lock().await;
        let classification = match cache.get(&id).map(|v| v.classification) {
            Some(c) => Some(c),
            None => self.classify(&id, payload.ship_type),
        };
        let Some(classification) = classification else {
            self.stats.messages_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        };

        if !cache.contains_key(&id) && cache.len() >= self.config.max_cached_vessels
            && classification != ClassificationTag::Autonomous
        {
            self.stats.messages_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let now = Utc::now();
        let mut state = cache.get(&id).cloned().unwrap_or_else(|| VesselState {
            id: id.clone(),
            name: envelope.meta_data.ship_name.clone(),
            classification,
            position: LatLon::new(0.0, 0.0),
            course_deg: 0.0,
            speed_kn: 0.0,
            heading_deg: None,
            position_accuracy: false,
            r#static: StaticData::default(),
            timestamp: now,
            data_source: DataSource::Ais,
            simulated: false,
            is_blackout: false,
        });

        if let Some(name) = envelope.meta_data.ship_name.clone() {
            state.name = Some(name);
        }
        if let Some(dim) = payload.dimension {
            state.r#static.length_m = Some(dim.a + dim.b);
            state.r#static.width_m = Some(dim.c + dim.d);
        }
        state.r#static.draught_m = payload.draught.or(state.r#static.draught_m);
        state.r#static.destination = payload.destination.or(state.r#static.destination.clone());
        if let Some(eta) = payload.eta {
            state.r#static.eta = build_eta(eta);
        }
        state.timestamp = now;

        cache.insert(id, state.clone());
        drop(cache);

        self.publish(state).await;
    }

    async fn publish(&self, state: VesselState) {
        if let Some(cb) = &self.callback {
            cb(&state);
        }
        *self.stats.last_update.lock().await = Some(state.timestamp);

        let mut q = self.queue.lock().await;
        if q.len() >= self.config.queue_capacity {
            q.pop_front();
            self.stats.queue_drops.fetch_add(1, Ordering::Relaxed);
        }
        q.push_back(state);
    }
}

/// Build a UTC timestamp from an AIS ETA fragment (month/day/hour/minute,
/// relative to the current year). Returns `None` when month or day is zero
/// (ETA unknown), matching the source feed's convention.
fn build_eta(eta: Eta) -> Option<DateTime<Utc>> {
    if eta.month == 0 || eta.day == 0 {
        return None;
    }
    let year = Utc::now().format("%Y").to_string().parse::<i32>().ok()?;
    Utc.with_ymd_and_hms(year, eta.month, eta.day, eta.hour, eta.minute, 0)
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> IngestConfig {
        IngestConfig {
            api_key: "test-key".to_string(),
            ..IngestConfig::default()
        }
    }

    #[tokio::test]
    async fn autonomous_position_report_is_admitted() {
        let client = AisIngestClient::new(config_with_key());
        let envelope = InboundEnvelope {
            message_type: "PositionReport".to_string(),
            meta_data: MetaData {
                mmsi: serde_json::Value::from("440326000"),
                ship_name: Some("HMM Algeciras".to_string()),
            },
            message: serde_json::json!({
                "PositionReport": {
                    "Latitude": 12.3,
                    "Longitude": 45.6,
                    "Cog": 88.0,
                    "Sog": 15.2,
                    "TrueHeading": 90.0,
                    "PositionAccuracy": true
                }
            }),
        };
        client
            .handle_position_report(VesselId::new("440326000").unwrap(), envelope)
            .await;

        let drained = client.drain_up_to(10).await;
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].classification, ClassificationTag::Autonomous);
    }

    #[tokio::test]
    async fn null_island_is_rejected() {
        let client = AisIngestClient::new(config_with_key());
        let envelope = InboundEnvelope {
            message_type: "PositionReport".to_string(),
            meta_data: MetaData {
                mmsi: serde_json::Value::from("440326000"),
                ship_name: None,
            },
            message: serde_json::json!({
                "PositionReport": {
                    "Latitude": 0.0,
                    "Longitude": 0.0,
                    "Cog": 0.0,
                    "Sog": 0.0,
                    "TrueHeading": null,
                    "PositionAccuracy": null
                }
            }),
        };
        client
            .handle_position_report(VesselId::new("440326000").unwrap(), envelope)
            .await;
        assert_eq!(client.drain_up_to(10).await.len(), 0);
    }

    #[tokio::test]
    async fn non_allowlisted_vessel_with_no_ship_type_is_dropped() {
        let client = AisIngestClient::new(config_with_key());
        let envelope = InboundEnvelope {
            message_type: "PositionReport".to_string(),
            meta_data: MetaData {
                mmsi: serde_json::Value::from("123456789"),
                ship_name: None,
            },
            message: serde_json::json!({
                "PositionReport": {
                    "Latitude": 1.0,
                    "Longitude": 1.0,
                    "Cog": 0.0,
                    "Sog": 0.0,
                    "TrueHeading": null,
                    "PositionAccuracy": null
                }
            }),
        };
        client
            .handle_position_report(VesselId::new("123456789").unwrap(), envelope)
            .await;
        assert_eq!(client.drain_up_to(10).await.len(), 0);
    }

    #[tokio::test]
    async fn queue_drops_oldest_on_overflow() {
        let mut config = config_with_key();
        config.queue_capacity = 2;
        let client = AisIngestClient::new(config);

        for i in 0..3 {
            let lat = 1.0 + i as f64;
            let envelope = InboundEnvelope {
                message_type: "PositionReport".to_string(),
                meta_data: MetaData {
                    mmsi: serde_json::Value::from("440326000"),
                    ship_name: None,
                },
                message: serde_json::json!({
                    "PositionReport": {
                        "Latitude": lat,
                        "Longitude": 1.0,
                        "Cog": 0.0,
                        "Sog": 0.0,
                        "TrueHeading": null,
                        "PositionAccuracy": null
                    }
                }),
            };
            client
                .handle_position_report(VesselId::new("440326000").unwrap(), envelope)
                .await;
        }

        assert_eq!(client.stats().await.queue_drops, 1);
        let drained = client.drain_up_to(10).await;
        assert_eq!(drained.len(), 2);
    }
}
