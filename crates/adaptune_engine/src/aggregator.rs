//! Metrics aggregation over the decision-event log.
//!
//! Reduces the two outcome streams to one `DecisionMetrics` tuple per
//! cycle. Aggregation never fails: a stream that cannot be fetched (error
//! or timeout) contributes its documented default values, and the fault is
//! logged and counted instead of propagated.

use adaptune_common::{DecisionMetrics, TuneError};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::event_log::EventLogSource;

/// Confidence assumed when a stream is empty or unreachable.
const DEFAULT_CONFIDENCE: f64 = 0.7;
/// Placeholder latency for the feedback stream. The upstream log carries
/// no latency field; this is a documented approximation, not a
/// measurement.
const FEEDBACK_LATENCY_MS: f64 = 1000.0;
/// Placeholder latency for the action stream.
const ACTION_LATENCY_MS: f64 = 1200.0;
/// Accuracy assumed for an empty feedback window.
const NEUTRAL_ACCURACY: f64 = 0.5;

/// Per-stream reduction before the two streams are combined.
#[derive(Debug, Clone)]
struct StreamStats {
    total: u64,
    accepted: u64,
    rejected: u64,
    avg_confidence: f64,
    avg_latency_ms: f64,
}

impl StreamStats {
    fn empty(latency_ms: f64) -> Self {
        Self {
            total: 0,
            accepted: 0,
            rejected: 0,
            avg_confidence: DEFAULT_CONFIDENCE,
            avg_latency_ms: latency_ms,
        }
    }
}

/// Pulls recent decision outcomes and reduces them to a metrics tuple.
pub struct MetricsAggregator {
    log: Arc<dyn EventLogSource>,
    call_timeout: Duration,
    fetch_failures: AtomicU64,
}

impl MetricsAggregator {
    pub fn new(log: Arc<dyn EventLogSource>, call_timeout: Duration) -> Self {
        Self {
            log,
            call_timeout,
            fetch_failures: AtomicU64::new(0),
        }
    }

    /// Number of stream fetches that degraded to defaults so far.
    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::SeqCst)
    }

    /// Aggregate both streams since `since`. Infallible by contract.
    pub async fn aggregate(&self, since: DateTime<Utc>) -> DecisionMetrics {
        let feedback = self.feedback_stats(since).await;
        let actions = self.action_stats(since).await;

        // Counts are summed; confidence and latency are the arithmetic
        // mean of the two per-stream values. Accuracy comes from the
        // feedback stream alone: the action stream has no operator
        // verdict to measure against.
        let accuracy_rate = if feedback.total > 0 {
            feedback.accepted as f64 / feedback.total as f64
        } else {
            NEUTRAL_ACCURACY
        };

        DecisionMetrics {
            total_decisions: feedback.total + actions.total,
            accepted_decisions: feedback.accepted + actions.accepted,
            rejected_decisions: feedback.rejected + actions.rejected,
            avg_confidence: (feedback.avg_confidence + actions.avg_confidence) / 2.0,
            avg_response_time_ms: (feedback.avg_latency_ms + actions.avg_latency_ms) / 2.0,
            accuracy_rate,
        }
    }

    async fn feedback_stats(&self, since: DateTime<Utc>) -> StreamStats {
        let events = match tokio::time::timeout(
            self.call_timeout,
            self.log.feedback_events(since),
        )
        .await
        {
            Ok(Ok(events)) => events,
            Ok(Err(e)) => return self.degraded("feedback", e, FEEDBACK_LATENCY_MS),
            Err(_) => {
                return self.degraded(
                    "feedback",
                    TuneError::Timeout(self.call_timeout),
                    FEEDBACK_LATENCY_MS,
                )
            }
        };

        if events.is_empty() {
            return StreamStats::empty(FEEDBACK_LATENCY_MS);
        }

        let total = events.len() as u64;
        let accepted = events
            .iter()
            .filter(|e| e.operator_action == "accepted")
            .count() as u64;
        let rejected = events
            .iter()
            .filter(|e| e.operator_action == "rejected")
            .count() as u64;
        let avg_confidence =
            events.iter().map(|e| e.confidence_score).sum::<f64>() / total as f64;

        StreamStats {
            total,
            accepted,
            rejected,
            avg_confidence,
            avg_latency_ms: FEEDBACK_LATENCY_MS,
        }
    }

    async fn action_stats(&self, since: DateTime<Utc>) -> StreamStats {
        let events = match tokio::time::timeout(self.call_timeout, self.log.action_events(since))
            .await
        {
            Ok(Ok(events)) => events,
            Ok(Err(e)) => return self.degraded("action", e, ACTION_LATENCY_MS),
            Err(_) => {
                return self.degraded(
                    "action",
                    TuneError::Timeout(self.call_timeout),
                    ACTION_LATENCY_MS,
                )
            }
        };

        if events.is_empty() {
            return StreamStats::empty(ACTION_LATENCY_MS);
        }

        let total = events.len() as u64;
        let accepted = events.iter().filter(|e| e.status == "success").count() as u64;
        let rejected = events.iter().filter(|e| e.status == "failed").count() as u64;

        StreamStats {
            total,
            accepted,
            rejected,
            // No confidence field upstream on this stream.
            avg_confidence: DEFAULT_CONFIDENCE,
            avg_latency_ms: ACTION_LATENCY_MS,
        }
    }

    fn degraded(&self, stream: &str, err: TuneError, latency_ms: f64) -> StreamStats {
        self.fetch_failures.fetch_add(1, Ordering::SeqCst);
        warn!(stream, error = %err, "event log fetch failed, substituting defaults");
        StreamStats::empty(latency_ms)
    }
}
