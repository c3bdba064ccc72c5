//! Feed ingestion loop
//!
//! Consumes the normalized message stream and applies it to the vessel
//! store. Transport failures trigger a fixed-delay reconnect; a zone-set
//! change abandons the current subscription immediately and resubscribes
//! with the new bounding boxes, skipping the failure backoff.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::TaskName;
use crate::feed::{FeedEvent, FeedSource};
use crate::store::VesselStore;
use crate::types::{FeedMessage, ShipCategory};
use crate::zones::ZoneManager;

/// Identity fields that arrived before the vessel's first position report.
#[derive(Default, Clone)]
struct CachedStatic {
    name: Option<String>,
    category: Option<ShipCategory>,
}

/// Why the inner read loop stopped.
enum LoopExit {
    Cancelled,
    ZonesChanged,
    TransportFailed,
}

pub(super) async fn run_ingest<S: FeedSource>(
    mut source: S,
    store: Arc<VesselStore>,
    zones: Arc<ZoneManager>,
    mut zone_changes: watch::Receiver<u64>,
    reconnect_delay: tokio::time::Duration,
    cancel: CancellationToken,
) -> TaskName {
    info!(source = source.source_name(), "[Ingest] task starting");
    let mut statics: HashMap<u32, CachedStatic> = HashMap::new();

    loop {
        // Observe the zone set as of now; a change signalled after this
        // point wakes the read loop and lands us back here.
        zone_changes.mark_unchanged();
        let boxes = zones.bounding_boxes();

        if let Err(e) = source.subscribe(&boxes).await {
            warn!(error = %e, "[Ingest] subscription failed");
            match wait_before_retry(&mut zone_changes, reconnect_delay, &cancel).await {
                LoopExit::Cancelled => return TaskName::Ingest,
                // Zone change or delay elapsed: retry with fresh boxes
                _ => continue,
            }
        }

        match read_until_interrupted(
            &mut source,
            &store,
            &mut statics,
            &mut zone_changes,
            &cancel,
        )
        .await
        {
            LoopExit::Cancelled => {
                info!("[Ingest] shutdown signal received");
                return TaskName::Ingest;
            }
            LoopExit::ZonesChanged => {
                info!("[Ingest] zone set changed, resubscribing immediately");
                continue;
            }
            LoopExit::TransportFailed => {
                match wait_before_retry(&mut zone_changes, reconnect_delay, &cancel).await {
                    LoopExit::Cancelled => return TaskName::Ingest,
                    _ => continue,
                }
            }
        }
    }
}

async fn read_until_interrupted<S: FeedSource>(
    source: &mut S,
    store: &VesselStore,
    statics: &mut HashMap<u32, CachedStatic>,
    zone_changes: &mut watch::Receiver<u64>,
    cancel: &CancellationToken,
) -> LoopExit {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return LoopExit::Cancelled,
            changed = zone_changes.changed() => {
                return match changed {
                    Ok(()) => LoopExit::ZonesChanged,
                    // Sender dropped: the zone manager is being torn down
                    Err(_) => LoopExit::Cancelled,
                };
            }
            event = source.next_message() => match event {
                Ok(FeedEvent::Message(message)) => {
                    apply_message(store, statics, message).await;
                }
                Ok(FeedEvent::Eof) => {
                    warn!("[Ingest] feed reached end of stream");
                    return LoopExit::TransportFailed;
                }
                Err(e) => {
                    warn!(error = %e, "[Ingest] feed read failed");
                    return LoopExit::TransportFailed;
                }
            }
        }
    }
}

async fn apply_message(
    store: &VesselStore,
    statics: &mut HashMap<u32, CachedStatic>,
    message: FeedMessage,
) {
    match message {
        FeedMessage::Position {
            vessel_id,
            lat,
            lon,
            sog,
            cog,
            name,
        } => {
            // Cached static data wins over a name carried in position
            // metadata, matching upstream precedence
            let cached = statics.get(&vessel_id).cloned().unwrap_or_default();
            let name = cached.name.as_deref().or(name.as_deref());
            store
                .apply_position(vessel_id, lat, lon, sog, cog, name, chrono::Utc::now())
                .await;
            if cached.category.is_some() {
                store.apply_static(vessel_id, None, cached.category).await;
            }
        }
        FeedMessage::Static {
            vessel_id,
            name,
            ship_type,
        } => {
            let category = ship_type.map(ShipCategory::from_ais_code);
            let entry = statics.entry(vessel_id).or_default();
            if name.is_some() {
                entry.name = name.clone();
            }
            if category.is_some() {
                entry.category = category;
            }
            // Applies immediately when the vessel is already tracked;
            // otherwise the cache covers the out-of-order case
            store.apply_static(vessel_id, name.as_deref(), category).await;
        }
    }
}

/// Fixed-delay backoff that a zone change or cancellation cuts short.
async fn wait_before_retry(
    zone_changes: &mut watch::Receiver<u64>,
    delay: tokio::time::Duration,
    cancel: &CancellationToken,
) -> LoopExit {
    tokio::select! {
        _ = cancel.cancelled() => LoopExit::Cancelled,
        changed = zone_changes.changed() => {
            match changed {
                Ok(()) => LoopExit::ZonesChanged,
                Err(_) => LoopExit::Cancelled,
            }
        }
        _ = tokio::time::sleep(delay) => LoopExit::TransportFailed,
    }
}
