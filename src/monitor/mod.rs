//! Maritime monitor: owns the vessel store, the zone manager, the
//! detection loops, and the incident aggregator.
//!
//! One instance per monitor; everything is owned state, so tests can run
//! several monitors side by side. `start` spawns the long-running loops
//! into a supervised `JoinSet`; `stop` cancels them and waits for each to
//! exit at its next safe point, after which no further incidents or
//! snapshots are emitted.

mod ingest;

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::aggregate::{IncidentAggregator, IncidentEvaluator, ReportPipeline};
use crate::config::defaults::EVENT_CHANNEL_CAPACITY;
use crate::config::MonitorConfig;
use crate::detect::{DropoutDetector, IncidentSeq, ProximityDetector};
use crate::feed::FeedSource;
use crate::storage::ZoneStore;
use crate::store::VesselStore;
use crate::types::{MonitorEvent, Zone};
use crate::zones::{ZoneError, ZoneManager};

/// Task names for supervisor logging.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TaskName {
    Ingest,
    DropoutSweep,
    ProximitySweep,
    Snapshot,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::Ingest => write!(f, "Ingest"),
            TaskName::DropoutSweep => write!(f, "DropoutSweep"),
            TaskName::ProximitySweep => write!(f, "ProximitySweep"),
            TaskName::Snapshot => write!(f, "Snapshot"),
        }
    }
}

struct RunState {
    cancel: CancellationToken,
    tasks: JoinSet<TaskName>,
}

pub struct MaritimeMonitor {
    config: MonitorConfig,
    store: Arc<VesselStore>,
    zones: Arc<ZoneManager>,
    aggregator: Arc<IncidentAggregator>,
    seq: Arc<IncidentSeq>,
    events: broadcast::Sender<MonitorEvent>,
    run: Mutex<Option<RunState>>,
}

impl MaritimeMonitor {
    /// Build a monitor from configuration and its external collaborators.
    pub async fn new(
        config: MonitorConfig,
        zone_store: Box<dyn ZoneStore>,
        evaluator: Arc<dyn IncidentEvaluator>,
        pipeline: Arc<dyn ReportPipeline>,
    ) -> Result<Self> {
        let zones = Arc::new(ZoneManager::open(config.zones.clone(), zone_store).await?);
        let store = Arc::new(VesselStore::new(zones.handle()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let aggregator = Arc::new(IncidentAggregator::new(
            config.aggregation.incident_threshold,
            Duration::hours(config.aggregation.incident_window_hours),
            evaluator,
            pipeline,
            zones.handle(),
            events.clone(),
        ));
        Ok(Self {
            config,
            store,
            zones,
            aggregator,
            seq: Arc::new(IncidentSeq::default()),
            events,
            run: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &Arc<VesselStore> {
        &self.store
    }

    pub fn zone_manager(&self) -> &Arc<ZoneManager> {
        &self.zones
    }

    pub fn aggregator(&self) -> &Arc<IncidentAggregator> {
        &self.aggregator
    }

    /// Subscribe to the outbound event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.run.lock().await.is_some()
    }

    /// Start the monitor against the given feed source. Idempotent: a
    /// second call while running is a no-op.
    pub async fn start<S: FeedSource>(&self, source: S) -> Result<()> {
        let mut run = self.run.lock().await;
        if run.is_some() {
            info!("monitor already running, start ignored");
            return Ok(());
        }

        info!(source = source.source_name(), "starting maritime monitor");
        let cancel = CancellationToken::new();
        let mut tasks: JoinSet<TaskName> = JoinSet::new();

        tasks.spawn(ingest::run_ingest(
            source,
            Arc::clone(&self.store),
            Arc::clone(&self.zones),
            self.zones.subscribe_changes(),
            tokio::time::Duration::from_secs(self.config.feed.reconnect_delay_secs),
            cancel.clone(),
        ));

        self.spawn_dropout_sweep(&mut tasks, cancel.clone());
        self.spawn_proximity_sweep(&mut tasks, cancel.clone());
        self.spawn_snapshot_loop(&mut tasks, cancel.clone());

        *run = Some(RunState { cancel, tasks });
        Ok(())
    }

    /// Stop all loops and wait for them to exit. Idempotent.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        let Some(mut state) = run.take() else {
            return;
        };
        info!("stopping maritime monitor");
        state.cancel.cancel();
        while let Some(joined) = state.tasks.join_next().await {
            match joined {
                Ok(name) => info!(task = %name, "task stopped"),
                Err(e) => error!(error = %e, "task panicked during shutdown"),
            }
        }
        info!("maritime monitor stopped");
    }

    /// Add or replace a monitored zone. Safe while running; the feed loop
    /// resubscribes with the new bounding boxes.
    pub async fn upsert_zone(&self, zone: Zone) -> Result<(), ZoneError> {
        self.zones.add_or_replace(zone, &self.store).await
    }

    /// Remove a monitored zone, evicting its member vessels.
    pub async fn remove_zone(&self, name: &str) -> Result<(), ZoneError> {
        self.zones.remove(name, &self.store).await
    }

    /// Replace the whole zone set (operator mode switch). Also resets the
    /// incident aggregation state so threshold triggers re-arm.
    pub async fn replace_zones(&self, zones: Vec<Zone>) -> Result<(), ZoneError> {
        self.zones.replace_all(zones, &self.store).await?;
        self.aggregator.reset().await;
        Ok(())
    }

    fn spawn_dropout_sweep(&self, tasks: &mut JoinSet<TaskName>, cancel: CancellationToken) {
        let store = Arc::clone(&self.store);
        let aggregator = Arc::clone(&self.aggregator);
        let seq = Arc::clone(&self.seq);
        let detector = DropoutDetector::new(Duration::minutes(self.config.detection.dropout_minutes));
        let period = tokio::time::Duration::from_secs(self.config.detection.dropout_sweep_secs);

        tasks.spawn(async move {
            info!("[DropoutSweep] task starting");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // Skip the immediate first tick
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("[DropoutSweep] shutdown signal received");
                        return TaskName::DropoutSweep;
                    }
                    _ = interval.tick() => {
                        for incident in detector.sweep(&store, &seq, Utc::now()).await {
                            aggregator.add_incident(incident);
                        }
                    }
                }
            }
        });
    }

    fn spawn_proximity_sweep(&self, tasks: &mut JoinSet<TaskName>, cancel: CancellationToken) {
        let store = Arc::clone(&self.store);
        let aggregator = Arc::clone(&self.aggregator);
        let seq = Arc::clone(&self.seq);
        let mut detector = ProximityDetector::new(
            self.config.detection.proximity_distance_nm,
            Duration::minutes(self.config.detection.proximity_duration_minutes),
        );
        let period = tokio::time::Duration::from_secs(self.config.detection.proximity_sweep_secs);

        tasks.spawn(async move {
            info!("[ProximitySweep] task starting");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("[ProximitySweep] shutdown signal received");
                        return TaskName::ProximitySweep;
                    }
                    _ = interval.tick() => {
                        for incident in detector.sweep(&store, &seq, Utc::now()).await {
                            aggregator.add_incident(incident);
                        }
                    }
                }
            }
        });
    }

    fn spawn_snapshot_loop(&self, tasks: &mut JoinSet<TaskName>, cancel: CancellationToken) {
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let period = tokio::time::Duration::from_secs(self.config.eviction.snapshot_interval_secs);
        let active_retention = Duration::minutes(self.config.eviction.active_retention_minutes);
        let dark_retention = Duration::minutes(self.config.eviction.dark_retention_minutes);

        tasks.spawn(async move {
            info!("[Snapshot] task starting");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("[Snapshot] shutdown signal received");
                        return TaskName::Snapshot;
                    }
                    _ = interval.tick() => {
                        let evicted = store
                            .evict_stale(Utc::now(), active_retention, dark_retention)
                            .await;
                        if !evicted.is_empty() {
                            info!(count = evicted.len(), "evicted stale vessels");
                        }
                        let ships = store.snapshot().await;
                        // Zero subscribers is fine; the send result only
                        // reports that nobody is listening
                        let _ = events.send(MonitorEvent::ShipUpdate { ships });
                    }
                }
            }
        });
    }
}
