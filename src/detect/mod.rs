//! Anomaly detectors
//!
//! Two periodic sweeps over the vessel table: transponder dropout and
//! sustained ship-to-ship proximity. Both take an explicit `now` so tests
//! can drive time directly instead of sleeping through sweep intervals.

pub mod dropout;
pub mod proximity;

pub use dropout::DropoutDetector;
pub use proximity::ProximityDetector;

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic incident id allocator, shared by both detectors.
#[derive(Debug, Default)]
pub struct IncidentSeq(AtomicU64);

impl IncidentSeq {
    /// Next incident id, "INC-001", "INC-002", ...
    pub fn next_id(&self) -> String {
        let n = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        format!("INC-{n:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_padded() {
        let seq = IncidentSeq::default();
        assert_eq!(seq.next_id(), "INC-001");
        assert_eq!(seq.next_id(), "INC-002");
        for _ in 0..997 {
            seq.next_id();
        }
        assert_eq!(seq.next_id(), "INC-1000");
    }
}
