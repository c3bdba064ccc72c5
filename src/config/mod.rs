//! Monitor Configuration
//!
//! Provides per-deployment configuration loaded from TOML files, replacing
//! hardcoded detection thresholds with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `DARKWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `monitor_config.toml` in the current working directory
//! 3. Built-in defaults

pub mod defaults;

use crate::types::{BoundingBox, Zone};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration for a monitor deployment.
///
/// Load with [`MonitorConfig::load`] which searches:
/// 1. `$DARKWATCH_CONFIG` env var
/// 2. `./monitor_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Anomaly detection thresholds
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Live feed transport tuning
    #[serde(default)]
    pub feed: FeedConfig,

    /// Snapshot publication and stale-vessel eviction
    #[serde(default)]
    pub eviction: EvictionConfig,

    /// Incident aggregation and report triggering
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// HTTP control surface
    #[serde(default)]
    pub server: ServerConfig,

    /// Zone persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Default monitored zones (used when the zone store is empty)
    #[serde(default = "default_zones")]
    pub zones: Vec<Zone>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            feed: FeedConfig::default(),
            eviction: EvictionConfig::default(),
            aggregation: AggregationConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            zones: default_zones(),
        }
    }
}

/// Detection thresholds for the dropout and proximity sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minutes of AIS silence before an in-zone vessel is flagged dark
    pub dropout_minutes: i64,
    /// Dropout sweep period (seconds)
    pub dropout_sweep_secs: u64,
    /// Ship-to-ship distance threshold (nautical miles)
    pub proximity_distance_nm: f64,
    /// Minutes a pair must stay within threshold before flagging
    pub proximity_duration_minutes: i64,
    /// Proximity sweep period (seconds)
    pub proximity_sweep_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            dropout_minutes: 25,
            dropout_sweep_secs: 60,
            proximity_distance_nm: 0.4,
            proximity_duration_minutes: 15,
            proximity_sweep_secs: 30,
        }
    }
}

/// Live feed transport tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Fixed delay before reconnecting after a transport failure (seconds).
    /// A zone-set change bypasses this delay entirely.
    pub reconnect_delay_secs: u64,
    /// Subscription API key sent to the upstream feed (may be empty for
    /// unauthenticated simulators)
    pub api_key: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 10,
            api_key: String::new(),
        }
    }
}

/// Snapshot publication and stale-vessel eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Snapshot broadcast period (seconds)
    pub snapshot_interval_secs: u64,
    /// Minutes of silence before a non-dark vessel is evicted
    pub active_retention_minutes: i64,
    /// Minutes of silence before a dark vessel is evicted. Dark vessels are
    /// retained longer: their silence is itself the signal.
    pub dark_retention_minutes: i64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: 2,
            active_retention_minutes: 10,
            dark_retention_minutes: 30,
        }
    }
}

/// Incident aggregation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Incidents within the window needed to trigger a regional report
    pub incident_threshold: usize,
    /// Rolling window for the regional incident count (hours)
    pub incident_window_hours: i64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            incident_threshold: 3,
            incident_window_hours: 24,
        }
    }
}

/// HTTP control surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the REST API
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Zone persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the sled zone database
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$DARKWATCH_CONFIG` environment variable
    /// 2. `./monitor_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("DARKWATCH_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded monitor config from DARKWATCH_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from DARKWATCH_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "DARKWATCH_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("monitor_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded monitor config from ./monitor_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./monitor_config.toml, using defaults");
                }
            }
        }

        info!("No monitor_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Built-in hot zones covering the chokepoints the system was designed around.
pub fn default_zones() -> Vec<Zone> {
    vec![
        Zone {
            name: "Strait of Hormuz".to_string(),
            bounds: BoundingBox {
                min_lat: 24.5,
                max_lat: 27.5,
                min_lon: 55.0,
                max_lon: 60.0,
            },
            color: "#ff0044".to_string(),
            description: "Critical chokepoint for ~20% of global oil supply".to_string(),
            commodities: vec![
                "Brent Crude Oil".to_string(),
                "LNG".to_string(),
                "WTI Crude".to_string(),
            ],
        },
        Zone {
            name: "Black Sea".to_string(),
            bounds: BoundingBox {
                min_lat: 41.0,
                max_lat: 46.5,
                min_lon: 27.0,
                max_lon: 41.0,
            },
            color: "#ff6b00".to_string(),
            description: "Major route for Ukrainian/Russian commodity exports".to_string(),
            commodities: vec![
                "Wheat".to_string(),
                "Sunflower Oil".to_string(),
                "Steel".to_string(),
                "Brent Crude Oil".to_string(),
            ],
        },
        Zone {
            name: "Red Sea".to_string(),
            bounds: BoundingBox {
                min_lat: 11.0,
                max_lat: 30.0,
                min_lon: 32.0,
                max_lon: 44.0,
            },
            color: "#ff6b00".to_string(),
            description: "Suez Canal access route — Houthi threat zone".to_string(),
            commodities: vec![
                "Brent Crude Oil".to_string(),
                "Shipping Freight Index".to_string(),
            ],
        },
    ]
}
