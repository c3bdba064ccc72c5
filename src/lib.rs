//! Darkwatch: Maritime Dark-Activity Monitor
//!
//! Real-time AIS anomaly detection for operator-defined geographic hot zones.
//!
//! ## Architecture
//!
//! - **Feed Ingestion**: live TCP feed or simulated fleet, normalized AIS messages
//! - **Vessel Store**: shared vessel table with zone membership tracking
//! - **Dropout Detector**: flags vessels that stop transmitting inside a zone
//! - **Proximity Detector**: flags sustained ship-to-ship closeness (STS transfer proxy)
//! - **Incident Aggregator**: per-region rolling counts, triggers the assessment
//!   pipeline once per region per threshold-crossing episode

pub mod aggregate;
pub mod api;
pub mod config;
pub mod detect;
pub mod feed;
pub mod geo;
pub mod monitor;
pub mod storage;
pub mod store;
pub mod types;
pub mod zones;

// Re-export configuration
pub use config::MonitorConfig;

// Re-export commonly used types
pub use types::{
    BoundingBox, Evaluation, FeedMessage, Incident, IncidentKind, MonitorEvent, NearbyVessel,
    Severity, ShipCategory, Vessel, VesselSnapshot, VesselStatus, Zone,
};

// Re-export core components
pub use aggregate::{
    HeuristicEvaluator, IncidentAggregator, IncidentEvaluator, LogReporter, ReportPipeline,
};
pub use monitor::MaritimeMonitor;
pub use store::VesselStore;
pub use zones::{ZoneError, ZoneManager};

// Re-export feed sources
pub use feed::{AisTcpSource, FeedError, FeedEvent, FeedSource, SimulatedFeed};
