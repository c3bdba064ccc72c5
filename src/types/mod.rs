//! Shared data structures for the maritime monitoring pipeline
//!
//! - Feed ingestion: [`FeedMessage`] (normalized AIS telemetry)
//! - Vessel tracking: [`Vessel`], [`VesselSnapshot`], [`VesselStatus`]
//! - Zones: [`Zone`], [`BoundingBox`]
//! - Detection output: [`Incident`], [`Evaluation`]
//! - Event fan-out: [`MonitorEvent`]

mod event;
mod feed;
mod incident;
mod vessel;
mod zone;

pub use event::*;
pub use feed::*;
pub use incident::*;
pub use vessel::*;
pub use zone::*;
