//! System-wide default constants.
//!
//! Centralises values that are structural rather than operator-tunable.
//! Operator-tunable thresholds live in [`MonitorConfig`](super::MonitorConfig).

// ============================================================================
// Vessel trails
// ============================================================================

/// Maximum positions retained per vessel trail.
pub const TRAIL_CAP: usize = 20;

/// Trail length included in outbound snapshots (last N points).
pub const SNAPSHOT_TRAIL_LEN: usize = 15;

// ============================================================================
// Feed
// ============================================================================

/// TCP connect timeout for the live feed (seconds).
pub const FEED_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Per-line read timeout on the live feed (seconds).
///
/// Bounded so the ingest loop can observe zone-change and shutdown signals
/// even when the upstream goes quiet.
pub const FEED_READ_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Event channel
// ============================================================================

/// Broadcast channel capacity for monitor events.
///
/// Snapshots arrive every 2 s; 256 gives slow subscribers several minutes
/// of slack before they start lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Simulation
// ============================================================================

/// Seconds of simulated time per movement tick.
pub const SIM_TICK_SECS: u64 = 5;

/// Knots to degrees-per-second conversion used by the simulated fleet.
pub const SIM_KNOTS_TO_DEG_PER_SEC: f64 = 0.000_083_333;
