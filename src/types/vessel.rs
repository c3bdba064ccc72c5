//! Tracked vessel state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::defaults::{SNAPSHOT_TRAIL_LEN, TRAIL_CAP};

/// Transmission status of a tracked vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesselStatus {
    /// Transmitting normally
    Active,
    /// Confirmed AIS dropout while inside a monitored zone
    Dark,
    /// Manually flagged (e.g. a ghost counterpart in an STS rendezvous)
    Suspicious,
}

impl Default for VesselStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Vessel type category, mapped from the AIS numeric ship-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipCategory {
    Cargo,
    Tanker,
    Passenger,
    Fishing,
    Military,
    Service,
    Pleasure,
    Other,
    Unknown,
}

impl Default for ShipCategory {
    fn default() -> Self {
        Self::Unknown
    }
}

impl ShipCategory {
    /// Map an AIS numeric ship-type code to a readable category.
    pub fn from_ais_code(code: u32) -> Self {
        match code {
            70..=79 => Self::Cargo,
            80..=89 => Self::Tanker,
            60..=69 => Self::Passenger,
            30..=32 => Self::Fishing,
            35 => Self::Military,
            50..=59 => Self::Service,
            36 | 37 => Self::Pleasure,
            _ => Self::Other,
        }
    }
}

/// One tracked vessel, keyed by MMSI.
///
/// The MMSI is immutable after creation. Trail positions are stored
/// `[lon, lat]` (GeoJSON order) and capped at [`TRAIL_CAP`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vessel {
    /// Maritime Mobile Service Identity (unique, immutable)
    pub mmsi: u32,
    /// Display name (falls back to `MMSI-<n>` until static data arrives)
    pub name: String,
    /// Latitude (degrees)
    pub lat: f64,
    /// Longitude (degrees)
    pub lon: f64,
    /// Speed over ground (knots)
    pub sog: f64,
    /// Course over ground (degrees)
    pub cog: f64,
    /// Vessel type category
    #[serde(default)]
    pub category: ShipCategory,
    /// Transmission status
    #[serde(default)]
    pub status: VesselStatus,
    /// Name of the monitored zone currently containing the vessel, if any.
    /// Always recomputed against the live zone set, so it cannot go stale
    /// across a zone-set change.
    pub zone: Option<String>,
    /// Recent positions, `[lon, lat]`, oldest first, capped at [`TRAIL_CAP`]
    #[serde(default)]
    pub trail: VecDeque<[f64; 2]>,
    /// Timestamp of the last received position update
    pub last_seen: DateTime<Utc>,
}

impl Vessel {
    /// Fresh record for a vessel seen for the first time.
    pub fn new(mmsi: u32, now: DateTime<Utc>) -> Self {
        Self {
            mmsi,
            name: Self::placeholder_name(mmsi),
            lat: 0.0,
            lon: 0.0,
            sog: 0.0,
            cog: 0.0,
            category: ShipCategory::Unknown,
            status: VesselStatus::Active,
            zone: None,
            trail: VecDeque::new(),
            last_seen: now,
        }
    }

    /// Fallback display name for a vessel with no static data yet.
    pub fn placeholder_name(mmsi: u32) -> String {
        format!("MMSI-{mmsi}")
    }

    /// Append a position to the trail, discarding the oldest beyond the cap.
    pub fn push_trail(&mut self, lon: f64, lat: f64) {
        if self.trail.len() >= TRAIL_CAP {
            self.trail.pop_front();
        }
        self.trail.push_back([lon, lat]);
    }

    /// Serialized record for the outbound snapshot interface.
    pub fn snapshot(&self) -> VesselSnapshot {
        let skip = self.trail.len().saturating_sub(SNAPSHOT_TRAIL_LEN);
        VesselSnapshot {
            mmsi: self.mmsi,
            name: self.name.clone(),
            lat: round_to(self.lat, 6),
            lon: round_to(self.lon, 6),
            sog: round_to(self.sog, 1),
            cog: round_to(self.cog, 1),
            category: self.category,
            status: self.status,
            zone: self.zone.clone(),
            trail: self.trail.iter().skip(skip).copied().collect(),
            last_seen: self.last_seen,
        }
    }
}

/// Outbound vessel record published on every snapshot tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselSnapshot {
    pub mmsi: u32,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub sog: f64,
    pub cog: f64,
    #[serde(rename = "type")]
    pub category: ShipCategory,
    pub status: VesselStatus,
    pub zone: Option<String>,
    /// Last [`SNAPSHOT_TRAIL_LEN`] trail points
    pub trail: Vec<[f64; 2]>,
    pub last_seen: DateTime<Utc>,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_is_capped() {
        let mut vessel = Vessel {
            mmsi: 1,
            name: "TEST".to_string(),
            lat: 0.0,
            lon: 0.0,
            sog: 0.0,
            cog: 0.0,
            category: ShipCategory::Unknown,
            status: VesselStatus::Active,
            zone: None,
            trail: VecDeque::new(),
            last_seen: Utc::now(),
        };
        for i in 0..30 {
            vessel.push_trail(f64::from(i), 0.0);
        }
        assert_eq!(vessel.trail.len(), TRAIL_CAP);
        // Oldest entries dropped first
        assert_eq!(vessel.trail.front(), Some(&[10.0, 0.0]));
        // Snapshot carries only the last 15
        let snap = vessel.snapshot();
        assert_eq!(snap.trail.len(), SNAPSHOT_TRAIL_LEN);
        assert_eq!(snap.trail[0], [15.0, 0.0]);
    }

    #[test]
    fn ais_code_categories() {
        assert_eq!(ShipCategory::from_ais_code(70), ShipCategory::Cargo);
        assert_eq!(ShipCategory::from_ais_code(84), ShipCategory::Tanker);
        assert_eq!(ShipCategory::from_ais_code(30), ShipCategory::Fishing);
        assert_eq!(ShipCategory::from_ais_code(35), ShipCategory::Military);
        assert_eq!(ShipCategory::from_ais_code(37), ShipCategory::Pleasure);
        assert_eq!(ShipCategory::from_ais_code(99), ShipCategory::Other);
    }
}
