//! Transponder dropout detection
//!
//! A vessel that stops transmitting while inside a monitored zone is flagged
//! once and transitioned to dark. Recovery is handled by the ingest path: a
//! fresh position report sets the vessel active again, after which a new
//! qualifying silence produces a new incident.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use super::IncidentSeq;
use crate::store::VesselStore;
use crate::types::{Incident, IncidentKind, Severity, VesselStatus};

pub struct DropoutDetector {
    silence_threshold: Duration,
}

impl DropoutDetector {
    pub fn new(silence_threshold: Duration) -> Self {
        Self { silence_threshold }
    }

    /// One sweep over the vessel table.
    ///
    /// Only vessels that are active and inside a zone are evaluated; a
    /// vessel already dark or suspicious stays untouched, so at most one
    /// incident is emitted per dark episode.
    pub async fn sweep(
        &self,
        store: &VesselStore,
        seq: &IncidentSeq,
        now: DateTime<Utc>,
    ) -> Vec<Incident> {
        let mut incidents = Vec::new();
        for candidate in store.all().await {
            if candidate.status != VesselStatus::Active || candidate.zone.is_none() {
                continue;
            }
            // The transition re-checks under the write lock; a position
            // report landing after the snapshot above keeps the vessel
            // active and no incident is emitted
            let Some(vessel) = store
                .mark_dark_if_silent(candidate.mmsi, self.silence_threshold, now)
                .await
            else {
                continue;
            };
            let Some(region) = vessel.zone.clone() else {
                continue;
            };
            let duration_minutes = (now - vessel.last_seen).num_minutes();
            warn!(
                mmsi = vessel.mmsi,
                name = %vessel.name,
                region = %region,
                silent_minutes = duration_minutes,
                "dark ship detected"
            );
            incidents.push(Incident {
                id: seq.next_id(),
                kind: IncidentKind::AisDropout,
                mmsi: vessel.mmsi,
                vessel_name: vessel.name.clone(),
                lat: vessel.lat,
                lon: vessel.lon,
                region: Some(region),
                duration_minutes,
                nearby: Vec::new(),
                severity: Severity::Medium,
                timestamp: now,
            });
        }
        incidents
    }
}
