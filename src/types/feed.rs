//! Normalized inbound feed messages
//!
//! The live transport and the simulated feed both produce this shape; the
//! ingest loop never sees raw upstream formats.

use serde::{Deserialize, Serialize};

/// One normalized AIS telemetry message.
///
/// Tagged variant rather than an untyped map: position and static reports
/// carry different required fields and may arrive in any order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Kinematic position report; always implies the vessel is transmitting.
    Position {
        vessel_id: u32,
        lat: f64,
        lon: f64,
        #[serde(default)]
        sog: f64,
        #[serde(default)]
        cog: f64,
        /// Some upstreams carry the ship name in position metadata
        #[serde(default)]
        name: Option<String>,
    },
    /// Static/identity report. May arrive before the first position report
    /// for a vessel; the adapter caches it until then.
    Static {
        vessel_id: u32,
        #[serde(default)]
        name: Option<String>,
        /// Raw AIS numeric ship-type code
        #[serde(default)]
        ship_type: Option<u32>,
    },
}

impl FeedMessage {
    /// The vessel this message concerns.
    pub fn vessel_id(&self) -> u32 {
        match self {
            Self::Position { vessel_id, .. } | Self::Static { vessel_id, .. } => *vessel_id,
        }
    }
}
