//! Monitored zone definitions

use serde::{Deserialize, Serialize};

/// Geographic bounding box (degrees, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Whether the point lies inside the box (boundary inclusive).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// One monitored hot zone.
///
/// Names are unique; mutation goes exclusively through the
/// [`ZoneManager`](crate::zones::ZoneManager). Color, description, and
/// commodities are reporting metadata; the detection core never reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub bounds: BoundingBox,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commodities: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_membership() {
        let hormuz = BoundingBox {
            min_lat: 24.5,
            max_lat: 27.5,
            min_lon: 55.0,
            max_lon: 60.0,
        };
        assert!(hormuz.contains(26.0, 57.0));
        assert!(hormuz.contains(24.5, 55.0)); // boundary inclusive
        assert!(!hormuz.contains(23.9, 57.0));
        assert!(!hormuz.contains(26.0, 61.0));
    }
}
