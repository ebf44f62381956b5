//! Vessel-state store (C4): the single owner of every `VesselState`,
//! mutated only by upsert — never exposed as a mutable reference.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_types::{ClassificationTag, VesselId, VesselState};
use tokio::sync::RwLock;
use tracing::trace;

/// Shared handle to the fleet's canonical state.
///
/// Cloning is cheap (`Arc` of the lock); every clone sees the same store.
/// Mirrors the `Arc<RwLock<SimState>>` sharing pattern used for the physics
/// loop's `SimState`, generalised to last-writer-wins upserts instead of a
/// single struct replaced wholesale each tick.
#[derive(Clone)]
pub struct VesselStore {
    inner: Arc<RwLock<HashMap<VesselId, VesselState>>>,
}

impl VesselStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Upsert a vessel record, enforcing per-identity timestamp monotonicity
    /// (P3): an update strictly older than the stored record is ignored.
    pub async fn upsert(&self, state: VesselState) {
        let mut map = self.inner.write().await;
        match map.get(&state.id) {
            Some(existing) if existing.timestamp > state.timestamp => {
                trace!(
                    id = %state.id,
                    "dropping stale update ({} < {})",
                    state.timestamp,
                    existing.timestamp
                );
            }
            _ => {
                map.insert(state.id.clone(), state);
            }
        }
    }

    /// Look up a single vessel by identity.
    pub async fn get(&self, id: &VesselId) -> Option<VesselState> {
        self.inner.read().await.get(id).cloned()
    }

    /// Atomic snapshot of every stored vessel.
    pub async fn snapshot_all(&self) -> Vec<VesselState> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Atomic snapshot filtered to one classification.
    pub async fn iterate_by_classification(&self, tag: ClassificationTag) -> Vec<VesselState> {
        self.inner
            .read()
            .await
            .values()
            .filter(|v| v.classification == tag)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// The latest timestamp stored for any vessel, or `None` if empty.
    pub async fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.values().map(|v| v.timestamp).max()
    }
}

impl Default for VesselStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::{DataSource, StaticData};

    fn sample(id: &str, ts_secs: i64) -> VesselState {
        VesselState {
            id: VesselId::new(id).unwrap(),
            name: None,
            classification: ClassificationTag::Autonomous,
            position: fleet_types::LatLon::new(12.3, 45.6),
            course_deg: 88.0,
            speed_kn: 15.2,
            heading_deg: None,
            position_accuracy: true,
            r#static: StaticData::default(),
            timestamp: DateTime::from_timestamp(ts_secs, 0).unwrap(),
            data_source: DataSource::Ais,
            simulated: false,
            is_blackout: false,
        }
    }

    #[tokio::test]
    async fn upsert_and_get_round_trips() {
        let store = VesselStore::new();
        store.upsert(sample("440326000", 1000)).await;
        let got = store.get(&VesselId::new("440326000").unwrap()).await;
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn stale_update_is_ignored() {
        let store = VesselStore::new();
        store.upsert(sample("440326000", 2000)).await;
        store.upsert(sample("440326000", 1000)).await;
        let got = store.get(&VesselId::new("440326000").unwrap()).await.unwrap();
        assert_eq!(got.timestamp.timestamp(), 2000);
    }

    #[tokio::test]
    async fn snapshot_is_a_copy() {
        let store = VesselStore::new();
        store.upsert(sample("440326000", 1000)).await;
        let mut snap = store.snapshot_all().await;
        snap.clear();
        assert_eq!(store.len().await, 1);
    }
}
