//! Shared vessel state table
//!
//! Single coarse-grained lock around the fleet map. The ingest loop writes
//! kinematics and identity, the dropout sweep writes the active->dark
//! transition, the eviction loop removes records; writers rarely overlap so
//! one [`RwLock`] serializes everything without contention in practice.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::types::{ShipCategory, Vessel, VesselSnapshot, VesselStatus, Zone};

/// Shared table of tracked vessels, keyed by MMSI.
///
/// Zone membership is always recomputed against the live zone set (shared
/// with the zone manager via `ArcSwap`), so a zone mutation is never observed
/// stale by the next position update.
#[derive(Debug)]
pub struct VesselStore {
    vessels: RwLock<HashMap<u32, Vessel>>,
    zones: Arc<ArcSwap<Vec<Zone>>>,
}

impl VesselStore {
    pub fn new(zones: Arc<ArcSwap<Vec<Zone>>>) -> Self {
        Self {
            vessels: RwLock::new(HashMap::new()),
            zones,
        }
    }

    /// Name of the first zone containing the coordinate, if any.
    fn zone_for(&self, lat: f64, lon: f64) -> Option<String> {
        self.zones
            .load()
            .iter()
            .find(|z| z.bounds.contains(lat, lon))
            .map(|z| z.name.clone())
    }

    /// Apply a position report. Creates the vessel on first sight; a position
    /// report always means the transponder is transmitting, so status returns
    /// to active even if the vessel was dark.
    pub async fn apply_position(
        &self,
        mmsi: u32,
        lat: f64,
        lon: f64,
        sog: f64,
        cog: f64,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let zone = self.zone_for(lat, lon);
        let mut vessels = self.vessels.write().await;
        let vessel = vessels
            .entry(mmsi)
            .or_insert_with(|| Vessel::new(mmsi, now));
        vessel.lat = lat;
        vessel.lon = lon;
        vessel.sog = sog;
        vessel.cog = cog;
        vessel.zone = zone;
        vessel.status = VesselStatus::Active;
        vessel.last_seen = now;
        vessel.push_trail(lon, lat);
        if let Some(name) = name {
            vessel.name = name.to_owned();
        }
    }

    /// Apply identity fields from a static report to an already tracked
    /// vessel. Unknown MMSI is a no-op; the ingest adapter caches statics
    /// that arrive before the first position.
    pub async fn apply_static(&self, mmsi: u32, name: Option<&str>, category: Option<ShipCategory>) {
        let mut vessels = self.vessels.write().await;
        if let Some(vessel) = vessels.get_mut(&mmsi) {
            if let Some(name) = name {
                vessel.name = name.to_owned();
            }
            if let Some(category) = category {
                vessel.category = category;
            }
        }
    }

    pub async fn get(&self, mmsi: u32) -> Option<Vessel> {
        self.vessels.read().await.get(&mmsi).cloned()
    }

    pub async fn all(&self) -> Vec<Vessel> {
        self.vessels.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.vessels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.vessels.read().await.is_empty()
    }

    /// Serialized snapshot of the whole fleet, sorted by MMSI for stable
    /// output.
    pub async fn snapshot(&self) -> Vec<VesselSnapshot> {
        let vessels = self.vessels.read().await;
        let mut out: Vec<VesselSnapshot> = vessels.values().map(Vessel::snapshot).collect();
        out.sort_by_key(|s| s.mmsi);
        out
    }

    pub async fn remove(&self, mmsi: u32) -> Option<Vessel> {
        self.vessels.write().await.remove(&mmsi)
    }

    /// Set a vessel's status. No-op for an unknown MMSI.
    pub async fn set_status(&self, mmsi: u32, status: VesselStatus) {
        if let Some(vessel) = self.vessels.write().await.get_mut(&mmsi) {
            vessel.status = status;
        }
    }

    /// Transition a vessel to dark if it is still active, inside a zone,
    /// and silent beyond the threshold, re-checking under the write lock.
    /// A position report that landed after the caller's snapshot keeps the
    /// vessel active. Returns the vessel as of the transition.
    pub async fn mark_dark_if_silent(
        &self,
        mmsi: u32,
        threshold: Duration,
        now: DateTime<Utc>,
    ) -> Option<Vessel> {
        let mut vessels = self.vessels.write().await;
        let vessel = vessels.get_mut(&mmsi)?;
        if vessel.status != VesselStatus::Active
            || vessel.zone.is_none()
            || now - vessel.last_seen <= threshold
        {
            return None;
        }
        vessel.status = VesselStatus::Dark;
        Some(vessel.clone())
    }

    /// Remove every vessel whose membership is the named zone. Returns the
    /// MMSIs evicted.
    pub async fn evict_zone_members(&self, zone: &str) -> Vec<u32> {
        let mut vessels = self.vessels.write().await;
        let evicted: Vec<u32> = vessels
            .iter()
            .filter(|(_, v)| v.zone.as_deref() == Some(zone))
            .map(|(mmsi, _)| *mmsi)
            .collect();
        for mmsi in &evicted {
            vessels.remove(mmsi);
        }
        evicted
    }

    /// Remove vessels silent past their status-dependent retention. Dark
    /// vessels are kept longer than active ones; their silence is the signal.
    pub async fn evict_stale(
        &self,
        now: DateTime<Utc>,
        active_retention: Duration,
        dark_retention: Duration,
    ) -> Vec<u32> {
        let mut vessels = self.vessels.write().await;
        let stale: Vec<u32> = vessels
            .iter()
            .filter(|(_, v)| {
                let cutoff = match v.status {
                    VesselStatus::Dark => dark_retention,
                    _ => active_retention,
                };
                now - v.last_seen > cutoff
            })
            .map(|(mmsi, _)| *mmsi)
            .collect();
        for mmsi in &stale {
            vessels.remove(mmsi);
        }
        stale
    }

    /// Recompute zone membership for every vessel against the current zone
    /// set. Called by the zone manager after a mutation so memberships never
    /// reference a removed or reshaped zone.
    pub async fn recompute_memberships(&self) {
        let zones = self.zones.load();
        let mut vessels = self.vessels.write().await;
        for vessel in vessels.values_mut() {
            vessel.zone = zones
                .iter()
                .find(|z| z.bounds.contains(vessel.lat, vessel.lon))
                .map(|z| z.name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn strait_zones() -> Arc<ArcSwap<Vec<Zone>>> {
        Arc::new(ArcSwap::from_pointee(vec![Zone {
            name: "Strait of Hormuz".into(),
            bounds: BoundingBox {
                min_lat: 24.5,
                max_lat: 27.5,
                min_lon: 54.0,
                max_lon: 58.0,
            },
            color: String::new(),
            description: String::new(),
            commodities: vec![],
        }]))
    }

    #[tokio::test]
    async fn position_creates_and_places_vessel() {
        let store = VesselStore::new(strait_zones());
        let now = Utc::now();
        store
            .apply_position(477_000_001, 26.0, 56.0, 12.0, 90.0, Some("Test Ship"), now)
            .await;

        let vessel = store.get(477_000_001).await.unwrap();
        assert_eq!(vessel.name, "Test Ship");
        assert_eq!(vessel.zone.as_deref(), Some("Strait of Hormuz"));
        assert_eq!(vessel.status, VesselStatus::Active);
        assert_eq!(vessel.trail.len(), 1);
    }

    #[tokio::test]
    async fn position_revives_dark_vessel() {
        let store = VesselStore::new(strait_zones());
        let now = Utc::now();
        store
            .apply_position(1, 26.0, 56.0, 0.0, 0.0, None, now)
            .await;
        store.set_status(1, VesselStatus::Dark).await;
        store
            .apply_position(1, 26.1, 56.1, 5.0, 45.0, None, now)
            .await;
        assert_eq!(store.get(1).await.unwrap().status, VesselStatus::Active);
    }

    #[tokio::test]
    async fn dark_transition_yields_to_fresh_position() {
        let store = VesselStore::new(strait_zones());
        let t0 = Utc::now();
        store.apply_position(1, 26.0, 56.0, 10.0, 90.0, None, t0).await;

        // A report lands between a sweep's silent snapshot and the
        // transition attempt; the vessel stays active
        let sweep_at = t0 + Duration::minutes(26);
        store.apply_position(1, 26.1, 56.1, 10.0, 90.0, None, sweep_at).await;
        let marked = store
            .mark_dark_if_silent(1, Duration::minutes(25), sweep_at)
            .await;
        assert!(marked.is_none());
        assert_eq!(store.get(1).await.unwrap().status, VesselStatus::Active);

        // Genuinely silent: the transition fires and reports the vessel
        let later = sweep_at + Duration::minutes(30);
        let marked = store
            .mark_dark_if_silent(1, Duration::minutes(25), later)
            .await;
        let vessel = marked.unwrap();
        assert_eq!(vessel.status, VesselStatus::Dark);
        assert_eq!(vessel.zone.as_deref(), Some("Strait of Hormuz"));
    }

    #[tokio::test]
    async fn static_before_position_is_a_noop() {
        let store = VesselStore::new(strait_zones());
        store
            .apply_static(2, Some("Early Bird"), Some(ShipCategory::Tanker))
            .await;
        assert!(store.get(2).await.is_none());
    }

    #[tokio::test]
    async fn stale_eviction_respects_status() {
        let store = VesselStore::new(strait_zones());
        let now = Utc::now();
        let old = now - Duration::minutes(15);
        store.apply_position(1, 26.0, 56.0, 0.0, 0.0, None, old).await;
        store.apply_position(2, 26.1, 56.1, 0.0, 0.0, None, old).await;
        store.set_status(2, VesselStatus::Dark).await;

        let evicted = store
            .evict_stale(now, Duration::minutes(10), Duration::minutes(30))
            .await;
        assert_eq!(evicted, vec![1]);
        assert!(store.get(2).await.is_some());
    }

    #[tokio::test]
    async fn zone_eviction_only_removes_members() {
        let store = VesselStore::new(strait_zones());
        let now = Utc::now();
        store.apply_position(1, 26.0, 56.0, 0.0, 0.0, None, now).await;
        store.apply_position(2, 0.0, 0.0, 0.0, 0.0, None, now).await;

        let evicted = store.evict_zone_members("Strait of Hormuz").await;
        assert_eq!(evicted, vec![1]);
        assert!(store.get(2).await.is_some());
    }
}
