//! Events fanned out to downstream consumers over a broadcast channel

use serde::Serialize;

use super::{Evaluation, Incident, VesselSnapshot};

/// Everything the monitor publishes while running.
///
/// Subscribers that fall behind miss events (broadcast semantics); the API
/// layer reads current state from the store instead of replaying these.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Periodic full snapshot of the tracked fleet.
    ShipUpdate { ships: Vec<VesselSnapshot> },
    /// A newly flagged anomaly.
    Incident(Incident),
    /// Evaluator verdict for a previously published incident.
    Evaluation(Evaluation),
    /// A region's rolling incident count changed.
    ThresholdUpdate {
        region: String,
        count: usize,
        threshold: usize,
        avg_confidence: f64,
    },
    /// A region crossed its threshold and a report was dispatched.
    Report { region: String },
}
