//! Sustained ship-to-ship proximity detection
//!
//! Pairwise sweep over active in-zone vessels. A pair that stays within the
//! distance threshold for the sustained-duration window is flagged once per
//! continuous episode; separating removes the pair state, so a later
//! re-approach can be flagged again. O(n²) per sweep over the in-zone
//! candidate set, which holds tens of vessels in practice.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use super::IncidentSeq;
use crate::geo::haversine_nm;
use crate::store::VesselStore;
use crate::types::{Incident, IncidentKind, NearbyVessel, Severity, VesselStatus};

/// Order-independent pair key.
fn pair_key(a: u32, b: u32) -> (u32, u32) {
    (a.min(b), a.max(b))
}

#[derive(Debug, Clone, Copy)]
struct PairState {
    first_close: DateTime<Utc>,
    flagged: bool,
}

pub struct ProximityDetector {
    distance_nm: f64,
    sustained: Duration,
    pairs: HashMap<(u32, u32), PairState>,
}

impl ProximityDetector {
    pub fn new(distance_nm: f64, sustained: Duration) -> Self {
        Self {
            distance_nm,
            sustained,
            pairs: HashMap::new(),
        }
    }

    /// One pairwise sweep.
    ///
    /// Dark vessels are excluded from the candidate set; their last known
    /// position is stale, so distances against them are not meaningful.
    pub async fn sweep(
        &mut self,
        store: &VesselStore,
        seq: &IncidentSeq,
        now: DateTime<Utc>,
    ) -> Vec<Incident> {
        let mut candidates: Vec<_> = store
            .all()
            .await
            .into_iter()
            .filter(|v| v.status == VesselStatus::Active && v.zone.is_some())
            .collect();
        // Lowest MMSI becomes the incident's primary vessel regardless of
        // table iteration order
        candidates.sort_by_key(|v| v.mmsi);

        let mut incidents = Vec::new();
        let mut still_close: HashSet<(u32, u32)> = HashSet::new();

        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                let dist = haversine_nm(a.lat, a.lon, b.lat, b.lon);
                if dist > self.distance_nm {
                    continue;
                }
                let key = pair_key(a.mmsi, b.mmsi);
                still_close.insert(key);

                let state = self.pairs.entry(key).or_insert(PairState {
                    first_close: now,
                    flagged: false,
                });
                if state.flagged {
                    continue;
                }
                let held = now - state.first_close;
                if held < self.sustained {
                    continue;
                }

                state.flagged = true;
                let duration_minutes = held.num_minutes();
                warn!(
                    mmsi_a = a.mmsi,
                    mmsi_b = b.mmsi,
                    region = a.zone.as_deref().unwrap_or_default(),
                    distance_nm = dist,
                    held_minutes = duration_minutes,
                    "sustained proximity detected"
                );
                incidents.push(Incident {
                    id: seq.next_id(),
                    kind: IncidentKind::ShipProximity,
                    mmsi: a.mmsi,
                    vessel_name: a.name.clone(),
                    lat: a.lat,
                    lon: a.lon,
                    region: a.zone.clone().or_else(|| b.zone.clone()),
                    duration_minutes,
                    nearby: vec![NearbyVessel {
                        mmsi: b.mmsi,
                        name: b.name.clone(),
                        distance_nm: (dist * 1000.0).round() / 1000.0,
                    }],
                    severity: Severity::High,
                    timestamp: now,
                });
            }
        }

        // Separated pairs lose their state so a future approach re-arms
        self.pairs.retain(|key, _| still_close.contains(key));

        incidents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Zone};
    use arc_swap::ArcSwap;
    use std::sync::Arc;

    fn strait_store() -> VesselStore {
        VesselStore::new(Arc::new(ArcSwap::from_pointee(vec![Zone {
            name: "Strait".into(),
            bounds: BoundingBox {
                min_lat: 24.5,
                max_lat: 27.5,
                min_lon: 54.0,
                max_lon: 58.0,
            },
            color: String::new(),
            description: String::new(),
            commodities: vec![],
        }])))
    }

    // Two points 0.003 degrees of latitude apart are ~0.18 NM
    const CLOSE_LAT_OFFSET: f64 = 0.003;

    #[tokio::test]
    async fn sustained_pair_flagged_exactly_once() {
        let store = strait_store();
        let seq = IncidentSeq::default();
        let mut detector = ProximityDetector::new(0.4, Duration::minutes(15));

        let t0 = Utc::now();
        store
            .apply_position(1, 26.0, 56.0, 0.3, 90.0, Some("GULF PIONEER"), t0)
            .await;
        store
            .apply_position(2, 26.0 + CLOSE_LAT_OFFSET, 56.0, 0.3, 90.0, Some("HORMUZ TRADER"), t0)
            .await;

        // First sweep records the pair, no incident yet
        assert!(detector.sweep(&store, &seq, t0).await.is_empty());
        // Still under the sustained window
        assert!(detector
            .sweep(&store, &seq, t0 + Duration::minutes(14))
            .await
            .is_empty());

        let incidents = detector.sweep(&store, &seq, t0 + Duration::minutes(16)).await;
        assert_eq!(incidents.len(), 1);
        let incident = &incidents[0];
        assert_eq!(incident.kind, IncidentKind::ShipProximity);
        assert_eq!(incident.nearby.len(), 1);
        assert_eq!(incident.nearby[0].mmsi, 2);
        assert!(incident.nearby[0].distance_nm <= 0.4);

        // Pair still close: flagged state suppresses further incidents
        assert!(detector
            .sweep(&store, &seq, t0 + Duration::minutes(30))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn attribution_is_ordered_by_mmsi() {
        let store = strait_store();
        let seq = IncidentSeq::default();
        let mut detector = ProximityDetector::new(0.4, Duration::minutes(15));

        let t0 = Utc::now();
        // Higher MMSI inserted first, plus scattered traffic, so the table
        // iteration order cannot decide who becomes the primary vessel
        store
            .apply_position(9, 26.0 + CLOSE_LAT_OFFSET, 56.0, 0.3, 0.0, None, t0)
            .await;
        store.apply_position(4, 26.0, 56.0, 0.3, 0.0, None, t0).await;
        for (i, mmsi) in [11u32, 12, 13, 14, 15].into_iter().enumerate() {
            store
                .apply_position(mmsi, 25.0 + i as f64 * 0.4, 57.5, 8.0, 0.0, None, t0)
                .await;
        }

        detector.sweep(&store, &seq, t0).await;
        let incidents = detector.sweep(&store, &seq, t0 + Duration::minutes(16)).await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].mmsi, 4);
        assert_eq!(incidents[0].nearby[0].mmsi, 9);
    }

    #[tokio::test]
    async fn separation_permits_reflag() {
        let store = strait_store();
        let seq = IncidentSeq::default();
        let mut detector = ProximityDetector::new(0.4, Duration::minutes(15));

        let t0 = Utc::now();
        store.apply_position(1, 26.0, 56.0, 0.3, 0.0, None, t0).await;
        store
            .apply_position(2, 26.0 + CLOSE_LAT_OFFSET, 56.0, 0.3, 0.0, None, t0)
            .await;

        detector.sweep(&store, &seq, t0).await;
        assert_eq!(
            detector.sweep(&store, &seq, t0 + Duration::minutes(16)).await.len(),
            1
        );

        // Separate well beyond threshold; pair state dropped
        let t1 = t0 + Duration::minutes(20);
        store.apply_position(2, 26.5, 56.5, 12.0, 0.0, None, t1).await;
        assert!(detector.sweep(&store, &seq, t1).await.is_empty());

        // Re-approach and hold again: second incident
        let t2 = t1 + Duration::minutes(5);
        store
            .apply_position(2, 26.0 + CLOSE_LAT_OFFSET, 56.0, 0.3, 0.0, None, t2)
            .await;
        detector.sweep(&store, &seq, t2).await;
        let incidents = detector.sweep(&store, &seq, t2 + Duration::minutes(16)).await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].id, "INC-002");
    }

    #[tokio::test]
    async fn dark_vessels_are_excluded() {
        let store = strait_store();
        let seq = IncidentSeq::default();
        let mut detector = ProximityDetector::new(0.4, Duration::minutes(15));

        let t0 = Utc::now();
        store.apply_position(1, 26.0, 56.0, 0.3, 0.0, None, t0).await;
        store
            .apply_position(2, 26.0 + CLOSE_LAT_OFFSET, 56.0, 0.3, 0.0, None, t0)
            .await;
        store.set_status(2, VesselStatus::Dark).await;

        detector.sweep(&store, &seq, t0).await;
        assert!(detector
            .sweep(&store, &seq, t0 + Duration::hours(1))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn boundary_minus_one_sweep_produces_nothing() {
        let store = strait_store();
        let seq = IncidentSeq::default();
        let mut detector = ProximityDetector::new(0.4, Duration::minutes(15));

        let t0 = Utc::now();
        store.apply_position(1, 26.0, 56.0, 0.3, 0.0, None, t0).await;
        store
            .apply_position(2, 26.0 + CLOSE_LAT_OFFSET, 56.0, 0.3, 0.0, None, t0)
            .await;

        // Sweeps every 30 s up to just under the 15 minute window
        let mut now = t0;
        let mut total = 0usize;
        while now < t0 + Duration::minutes(15) {
            total += detector.sweep(&store, &seq, now).await.len();
            now += Duration::seconds(30);
        }
        assert_eq!(total, 0);
    }
}
