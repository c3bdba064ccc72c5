//! Incident records emitted by the detection sweeps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of anomaly an incident describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    AisDropout,
    ShipProximity,
}

impl IncidentKind {
    /// Human-readable label used in reports and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AisDropout => "AIS transponder dropout",
            Self::ShipProximity => "sustained ship-to-ship proximity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A vessel observed close to the incident subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyVessel {
    pub mmsi: u32,
    pub name: String,
    pub distance_nm: f64,
}

/// One detected anomaly, fully described at emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Monotonic per-monitor id, zero-padded: "INC-001", "INC-002", ...
    pub id: String,
    pub kind: IncidentKind,
    pub mmsi: u32,
    pub vessel_name: String,
    pub lat: f64,
    pub lon: f64,
    /// Zone the subject vessel was last known inside, if any.
    pub region: Option<String>,
    /// How long the triggering condition had persisted when flagged.
    pub duration_minutes: i64,
    #[serde(default)]
    pub nearby: Vec<NearbyVessel>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Assessment attached to an incident by the evaluator stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub incident_id: String,
    /// 0-100
    pub confidence_score: u8,
    pub incident_type: IncidentKind,
    #[serde(default)]
    pub commodities_affected: Vec<String>,
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&IncidentKind::AisDropout).unwrap();
        assert_eq!(json, "\"ais_dropout\"");
    }
}
