//! Telemetry feed sources
//!
//! Unified trait for reading normalized AIS messages from different sources:
//! a live TCP stream or the built-in simulated fleet. Implementations handle
//! parsing and pacing internally; the ingest loop calls [`next_message`] in a
//! `select!` with cancellation and the zone-change signal.
//!
//! [`next_message`]: FeedSource::next_message

pub mod live;
pub mod sim;

pub use live::AisTcpSource;
pub use sim::SimulatedFeed;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{BoundingBox, FeedMessage};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("timeout waiting for data")]
    Timeout,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("not subscribed")]
    NotSubscribed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Events produced by a feed source.
pub enum FeedEvent {
    /// A valid normalized message was read.
    Message(FeedMessage),
    /// Source reached end of data (permanent disconnect for TCP).
    Eof,
}

/// Trait abstracting where AIS messages come from.
#[async_trait]
pub trait FeedSource: Send + 'static {
    /// (Re)establish the upstream subscription for the given bounding boxes.
    ///
    /// Called once at startup and again whenever the zone set changes. An
    /// existing subscription is dropped first.
    async fn subscribe(&mut self, boxes: &[BoundingBox]) -> Result<(), FeedError>;

    /// Read the next message from the source.
    ///
    /// Returns `FeedEvent::Eof` when no more data is available. Malformed
    /// upstream lines are skipped, never surfaced as errors.
    async fn next_message(&mut self) -> Result<FeedEvent, FeedError>;

    /// Human-readable name for logging (e.g. "AIS-TCP", "sim").
    fn source_name(&self) -> &str;
}
