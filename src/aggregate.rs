//! Incident aggregation and threshold triggering
//!
//! Incidents from both detectors land here. Each one is recorded under its
//! region, forwarded to the evaluator off the detection path, and counted
//! against a rolling window. The first time a region's count reaches the
//! threshold, the report pipeline runs exactly once; further incidents in
//! the same region stay counted but do not re-trigger until [`reset`] is
//! called.
//!
//! [`reset`]: IncidentAggregator::reset

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::Duration;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

use crate::types::{Evaluation, Incident, MonitorEvent, Severity, Zone};

const UNKNOWN_REGION: &str = "unknown";

/// Confidence assigned when the evaluator itself fails.
const FALLBACK_CONFIDENCE: u8 = 55;

/// Per-incident scoring collaborator.
#[async_trait]
pub trait IncidentEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        incident: &Incident,
        region_commodities: &[String],
    ) -> anyhow::Result<Evaluation>;
}

/// Report generation collaborator, invoked on threshold crossing.
#[async_trait]
pub trait ReportPipeline: Send + Sync {
    async fn generate(
        &self,
        region: &str,
        incidents: &[Incident],
        evaluations: &[Evaluation],
    ) -> anyhow::Result<()>;
}

/// Built-in evaluator scoring incidents from severity and duration alone.
pub struct HeuristicEvaluator;

#[async_trait]
impl IncidentEvaluator for HeuristicEvaluator {
    async fn evaluate(
        &self,
        incident: &Incident,
        region_commodities: &[String],
    ) -> anyhow::Result<Evaluation> {
        let base: i64 = match incident.severity {
            Severity::High => 75,
            Severity::Medium => 60,
            Severity::Low => 40,
        };
        let confidence = (base + incident.duration_minutes.min(20)).min(95) as u8;
        Ok(Evaluation {
            incident_id: incident.id.clone(),
            confidence_score: confidence,
            incident_type: incident.kind,
            commodities_affected: region_commodities.iter().take(2).cloned().collect(),
            reasoning: format!(
                "{} held for {} minutes in a monitored corridor",
                incident.kind.label(),
                incident.duration_minutes
            ),
        })
    }
}

/// Report pipeline that only logs; the default when no external pipeline is
/// wired up.
pub struct LogReporter;

#[async_trait]
impl ReportPipeline for LogReporter {
    async fn generate(
        &self,
        region: &str,
        incidents: &[Incident],
        evaluations: &[Evaluation],
    ) -> anyhow::Result<()> {
        info!(
            region,
            incidents = incidents.len(),
            evaluations = evaluations.len(),
            "report pipeline triggered"
        );
        Ok(())
    }
}

#[derive(Default)]
struct AggregateState {
    incidents: HashMap<String, Vec<Incident>>,
    evaluations: HashMap<String, Vec<Evaluation>>,
    reported: HashSet<String>,
}

/// Rolling per-region incident counts (API summary shape).
#[derive(Debug, Clone, Serialize)]
pub struct AggregateSummary {
    pub incident_counts: HashMap<String, usize>,
    pub avg_confidence: HashMap<String, f64>,
    pub threshold: usize,
    pub reported_regions: Vec<String>,
}

pub struct IncidentAggregator {
    threshold: usize,
    window: Duration,
    evaluator: Arc<dyn IncidentEvaluator>,
    pipeline: Arc<dyn ReportPipeline>,
    zones: Arc<ArcSwap<Vec<Zone>>>,
    events: broadcast::Sender<MonitorEvent>,
    state: Mutex<AggregateState>,
}

impl IncidentAggregator {
    pub fn new(
        threshold: usize,
        window: Duration,
        evaluator: Arc<dyn IncidentEvaluator>,
        pipeline: Arc<dyn ReportPipeline>,
        zones: Arc<ArcSwap<Vec<Zone>>>,
        events: broadcast::Sender<MonitorEvent>,
    ) -> Self {
        Self {
            threshold,
            window,
            evaluator,
            pipeline,
            zones,
            events,
            state: Mutex::new(AggregateState::default()),
        }
    }

    /// Record an incident and kick off evaluation without blocking the
    /// caller. This is the entry point for the detection loops.
    pub fn add_incident(self: &Arc<Self>, incident: Incident) {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.ingest(incident).await });
    }

    /// Full ingestion path: record, broadcast, evaluate, check threshold.
    ///
    /// Runs off the detection loops; evaluator and pipeline failures are
    /// contained here. A failed evaluation still counts toward the region
    /// total.
    pub async fn ingest(self: Arc<Self>, incident: Incident) {
        let region = incident
            .region
            .clone()
            .unwrap_or_else(|| UNKNOWN_REGION.to_string());

        {
            let mut state = self.state.lock().await;
            state
                .incidents
                .entry(region.clone())
                .or_default()
                .push(incident.clone());
        }
        let _ = self.events.send(MonitorEvent::Incident(incident.clone()));

        let commodities = self
            .zones
            .load()
            .iter()
            .find(|z| z.name == region)
            .map(|z| z.commodities.clone())
            .unwrap_or_default();

        let evaluation = match self.evaluator.evaluate(&incident, &commodities).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(incident_id = %incident.id, error = %e, "evaluator failed, using fallback score");
                Evaluation {
                    incident_id: incident.id.clone(),
                    confidence_score: FALLBACK_CONFIDENCE,
                    incident_type: incident.kind,
                    commodities_affected: commodities.iter().take(2).cloned().collect(),
                    reasoning: "evaluator unavailable; pattern consistent with dark activity"
                        .to_string(),
                }
            }
        };

        // Count within the rolling window, keyed off the incident's own
        // timestamp so replayed or test-driven time behaves the same as
        // wall-clock time.
        let window_start = incident.timestamp - self.window;
        let (count, avg_confidence, should_report, window_incidents, evaluations) = {
            let mut state = self.state.lock().await;
            state
                .evaluations
                .entry(region.clone())
                .or_default()
                .push(evaluation.clone());

            let window_incidents: Vec<Incident> = state
                .incidents
                .get(&region)
                .map(|v| {
                    v.iter()
                        .filter(|i| i.timestamp >= window_start)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            let evaluations = state.evaluations.get(&region).cloned().unwrap_or_default();
            let count = window_incidents.len();
            let avg = if evaluations.is_empty() {
                0.0
            } else {
                evaluations
                    .iter()
                    .map(|e| f64::from(e.confidence_score))
                    .sum::<f64>()
                    / evaluations.len() as f64
            };

            // Mark reported while still holding the lock so a racing
            // incident cannot trigger the pipeline a second time
            let should_report = count >= self.threshold && !state.reported.contains(&region);
            if should_report {
                state.reported.insert(region.clone());
            }
            (count, (avg * 10.0).round() / 10.0, should_report, window_incidents, evaluations)
        };

        let _ = self.events.send(MonitorEvent::Evaluation(evaluation));
        let _ = self.events.send(MonitorEvent::ThresholdUpdate {
            region: region.clone(),
            count,
            threshold: self.threshold,
            avg_confidence,
        });

        if should_report {
            info!(region = %region, count, "incident threshold reached, generating report");
            match self
                .pipeline
                .generate(&region, &window_incidents, &evaluations)
                .await
            {
                Ok(()) => {
                    let _ = self.events.send(MonitorEvent::Report {
                        region: region.clone(),
                    });
                }
                Err(e) => {
                    // The region stays marked as reported; a failed report
                    // is not retried until an operator reset
                    error!(region = %region, error = %e, "report pipeline failed");
                }
            }
        }
    }

    /// Clear all aggregation state, re-arming threshold triggers.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.incidents.clear();
        state.evaluations.clear();
        state.reported.clear();
        info!("incident aggregation state reset");
    }

    pub async fn summary(&self) -> AggregateSummary {
        let state = self.state.lock().await;
        let incident_counts = state
            .incidents
            .iter()
            .map(|(r, v)| (r.clone(), v.len()))
            .collect();
        let avg_confidence = state
            .evaluations
            .iter()
            .filter(|(_, evals)| !evals.is_empty())
            .map(|(r, evals)| {
                let avg = evals
                    .iter()
                    .map(|e| f64::from(e.confidence_score))
                    .sum::<f64>()
                    / evals.len() as f64;
                (r.clone(), (avg * 10.0).round() / 10.0)
            })
            .collect();
        AggregateSummary {
            incident_counts,
            avg_confidence,
            threshold: self.threshold,
            reported_regions: state.reported.iter().cloned().collect(),
        }
    }
}
