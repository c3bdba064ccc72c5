//! Monitor lifecycle integration tests
//!
//! Drive a full monitor instance with a scripted feed source and verify
//! start/stop idempotence, feed resubscription on zone change, identity
//! resolution, and eviction behaviour through the public API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use darkwatch::aggregate::{HeuristicEvaluator, LogReporter};
use darkwatch::feed::{FeedError, FeedEvent, FeedSource};
use darkwatch::storage::MemoryZoneStore;
use darkwatch::types::{BoundingBox, FeedMessage, MonitorEvent, ShipCategory};
use darkwatch::{MaritimeMonitor, MonitorConfig};

/// Feed source fed from a shared queue, recording every subscription.
struct ScriptedSource {
    queue: Arc<Mutex<VecDeque<FeedMessage>>>,
    subscriptions: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedSource {
    fn new() -> (Self, Arc<Mutex<VecDeque<FeedMessage>>>, Arc<Mutex<Vec<usize>>>) {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                queue: Arc::clone(&queue),
                subscriptions: Arc::clone(&subscriptions),
            },
            queue,
            subscriptions,
        )
    }
}

#[async_trait::async_trait]
impl FeedSource for ScriptedSource {
    async fn subscribe(&mut self, boxes: &[BoundingBox]) -> Result<(), FeedError> {
        self.subscriptions.lock().unwrap().push(boxes.len());
        Ok(())
    }

    async fn next_message(&mut self) -> Result<FeedEvent, FeedError> {
        loop {
            if let Some(message) = self.queue.lock().unwrap().pop_front() {
                return Ok(FeedEvent::Message(message));
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

fn fast_config() -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.eviction.snapshot_interval_secs = 1;
    config.detection.dropout_sweep_secs = 1;
    config.detection.proximity_sweep_secs = 1;
    config.feed.reconnect_delay_secs = 1;
    config
}

async fn build_monitor() -> Arc<MaritimeMonitor> {
    Arc::new(
        MaritimeMonitor::new(
            fast_config(),
            Box::new(MemoryZoneStore::default()),
            Arc::new(HeuristicEvaluator),
            Arc::new(LogReporter),
        )
        .await
        .unwrap(),
    )
}

fn position(mmsi: u32, lat: f64, lon: f64) -> FeedMessage {
    FeedMessage::Position {
        vessel_id: mmsi,
        lat,
        lon,
        sog: 10.0,
        cog: 90.0,
        name: None,
    }
}

/// Poll until the condition holds or the timeout elapses.
async fn wait_until<F, Fut>(mut condition: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let monitor = build_monitor().await;
    let (source, queue, _) = ScriptedSource::new();
    queue.lock().unwrap().push_back(position(1, 26.0, 57.0));

    monitor.start(source).await.unwrap();
    assert!(monitor.is_running().await);

    // Second start while running is a no-op
    let (second, _, _) = ScriptedSource::new();
    monitor.start(second).await.unwrap();

    let store = Arc::clone(monitor.store());
    assert!(
        wait_until(|| {
            let store = Arc::clone(&store);
            async move { store.len().await == 1 }
        }, 3000)
        .await,
        "position was never ingested"
    );

    monitor.stop().await;
    assert!(!monitor.is_running().await);
    // Stopping twice is fine
    monitor.stop().await;
}

#[tokio::test]
async fn zone_change_resubscribes_with_new_boxes() {
    let monitor = build_monitor().await;
    let (source, _queue, subscriptions) = ScriptedSource::new();
    monitor.start(source).await.unwrap();

    // Initial subscription covers the three default zones
    let subs = Arc::clone(&subscriptions);
    assert!(
        wait_until(|| {
            let subs = Arc::clone(&subs);
            async move { subs.lock().unwrap().len() == 1 }
        }, 2000)
        .await
    );
    assert_eq!(subscriptions.lock().unwrap()[0], 3);

    monitor.remove_zone("Red Sea").await.unwrap();

    // The ingest loop observes the signal and resubscribes without waiting
    // out the failure backoff
    let subs = Arc::clone(&subscriptions);
    assert!(
        wait_until(|| {
            let subs = Arc::clone(&subs);
            async move { subs.lock().unwrap().len() >= 2 }
        }, 2000)
        .await,
        "no resubscription after zone change"
    );
    assert_eq!(*subscriptions.lock().unwrap().last().unwrap(), 2);

    monitor.stop().await;
}

#[tokio::test]
async fn static_before_position_resolves_identity() {
    let monitor = build_monitor().await;
    let (source, queue, _) = ScriptedSource::new();
    {
        let mut q = queue.lock().unwrap();
        q.push_back(FeedMessage::Static {
            vessel_id: 212_000_002,
            name: Some("ODESSA SPIRIT".to_string()),
            ship_type: Some(81),
        });
        q.push_back(position(212_000_002, 44.5, 33.0));
    }
    monitor.start(source).await.unwrap();

    let store = Arc::clone(monitor.store());
    assert!(
        wait_until(|| {
            let store = Arc::clone(&store);
            async move { store.get(212_000_002).await.is_some() }
        }, 3000)
        .await
    );

    let vessel = monitor.store().get(212_000_002).await.unwrap();
    assert_eq!(vessel.name, "ODESSA SPIRIT");
    assert_eq!(vessel.category, ShipCategory::Tanker);
    assert_eq!(vessel.zone.as_deref(), Some("Black Sea"));

    monitor.stop().await;
}

#[tokio::test]
async fn removing_a_zone_evicts_only_its_members() {
    let monitor = build_monitor().await;
    let (source, queue, _) = ScriptedSource::new();
    {
        let mut q = queue.lock().unwrap();
        q.push_back(position(1, 26.0, 57.0)); // Strait of Hormuz
        q.push_back(position(2, 43.0, 33.0)); // Black Sea
    }
    monitor.start(source).await.unwrap();

    let store = Arc::clone(monitor.store());
    assert!(
        wait_until(|| {
            let store = Arc::clone(&store);
            async move { store.len().await == 2 }
        }, 3000)
        .await
    );

    monitor.remove_zone("Strait of Hormuz").await.unwrap();

    assert!(monitor.store().get(1).await.is_none());
    assert!(monitor.store().get(2).await.is_some());
    assert_eq!(monitor.zone_manager().zones().len(), 2);

    monitor.stop().await;
}

#[tokio::test]
async fn snapshots_flow_while_running_and_stop_after_shutdown() {
    let monitor = build_monitor().await;
    let mut events = monitor.subscribe_events();
    let (source, queue, _) = ScriptedSource::new();
    queue.lock().unwrap().push_back(position(5, 26.0, 57.0));

    monitor.start(source).await.unwrap();

    // At least one fleet snapshot within a couple of intervals
    let snapshot = tokio::time::timeout(tokio::time::Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(MonitorEvent::ShipUpdate { ships }) if !ships.is_empty() => return ships,
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event stream closed: {e}"),
            }
        }
    })
    .await
    .expect("no snapshot published");
    assert_eq!(snapshot[0].mmsi, 5);

    monitor.stop().await;

    // Drain whatever was queued before shutdown, then confirm silence
    while events.try_recv().is_ok() {}
    tokio::time::sleep(tokio::time::Duration::from_millis(2500)).await;
    assert!(
        events.try_recv().is_err(),
        "events emitted after stop() returned"
    );
}
