//! Weekly performance audit: anomaly detection, recommendations, and
//! watchdog alerting.
//!
//! The auditor is read-only with respect to the configuration. It scores
//! the current window with the same formula as the tuner, flags anomalies
//! against the current thresholds, and, when the score falls below the
//! alert threshold, synthesizes a remediation note for the external
//! watchdog. A failed alert delivery never loses the audit record.

use adaptune_common::{AuditRecord, DecisionMetrics, PerformanceAlert, TuneError, TuningConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::alert_sink::AlertSink;
use crate::ledger::AuditLedger;

/// Rejection ratio above which the window is anomalous.
const REJECTION_RATE_LIMIT: f64 = 0.3;

pub struct Auditor {
    sink: Arc<dyn AlertSink>,
    /// Score below which a remediation note is synthesized and forwarded.
    alert_threshold: f64,
    call_timeout: Duration,
    alerts_sent: AtomicU64,
    alert_failures: AtomicU64,
}

impl Auditor {
    pub fn new(sink: Arc<dyn AlertSink>, alert_threshold: f64, call_timeout: Duration) -> Self {
        Self {
            sink,
            alert_threshold,
            call_timeout,
            alerts_sent: AtomicU64::new(0),
            alert_failures: AtomicU64::new(0),
        }
    }

    pub fn alerts_sent(&self) -> u64 {
        self.alerts_sent.load(Ordering::SeqCst)
    }

    pub fn alert_failures(&self) -> u64 {
        self.alert_failures.load(Ordering::SeqCst)
    }

    /// Run one audit over an already-aggregated window and append the
    /// result to the ledger. Only a ledger persistence failure surfaces
    /// as an error; alert delivery trouble is logged and counted.
    pub async fn run_cycle(
        &self,
        config: &TuningConfig,
        metrics: DecisionMetrics,
        ledger: &mut AuditLedger,
    ) -> Result<AuditRecord, TuneError> {
        let score = metrics.performance_score(&config.weights);
        let anomalies = detect_anomalies(config, &metrics);
        let recommendations = build_recommendations(&metrics, &anomalies);

        let mut record = AuditRecord::new(metrics, score);
        record.anomalies = anomalies;
        record.recommendations = recommendations;

        if score < self.alert_threshold {
            record.suggested_remediation = Some(remediation_note(&record));
            self.dispatch_alert(record.clone()).await;
        }

        info!(
            score,
            anomalies = record.anomalies.len(),
            "audit cycle complete"
        );

        ledger.append(record.clone()).await?;
        Ok(record)
    }

    async fn dispatch_alert(&self, record: AuditRecord) {
        let alert = PerformanceAlert::degradation(record);
        match tokio::time::timeout(self.call_timeout, self.sink.send(alert)).await {
            Ok(Ok(())) => {
                self.alerts_sent.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Err(e)) => {
                self.alert_failures.fetch_add(1, Ordering::SeqCst);
                warn!(error = %e, "alert delivery failed, audit record kept");
            }
            Err(_) => {
                self.alert_failures.fetch_add(1, Ordering::SeqCst);
                warn!(timeout = ?self.call_timeout, "alert delivery timed out, audit record kept");
            }
        }
    }
}

/// Evaluate the four anomaly conditions against the current thresholds.
/// Independent checks: zero or more fire.
pub fn detect_anomalies(config: &TuningConfig, metrics: &DecisionMetrics) -> Vec<String> {
    let mut anomalies = Vec::new();
    let t = &config.thresholds;

    if metrics.accuracy_rate < t.accuracy_target {
        anomalies.push(format!(
            "Low accuracy: {:.1}% (target {:.1}%)",
            metrics.accuracy_rate * 100.0,
            t.accuracy_target * 100.0
        ));
    }
    if metrics.avg_confidence < t.confidence_min {
        anomalies.push(format!(
            "Low confidence: {:.2} (minimum {:.2})",
            metrics.avg_confidence, t.confidence_min
        ));
    }
    if metrics.avg_response_time_ms > t.response_time_max_ms {
        anomalies.push(format!(
            "Slow response: {:.0}ms (limit {:.0}ms)",
            metrics.avg_response_time_ms, t.response_time_max_ms
        ));
    }
    if metrics.total_decisions > 0 && metrics.rejection_rate() > REJECTION_RATE_LIMIT {
        anomalies.push(format!(
            "High rejection rate: {:.1}%",
            metrics.rejection_rate() * 100.0
        ));
    }

    anomalies
}

/// Machine-generated remediation advice. One optimal-state note when the
/// window is clean, otherwise independently triggered suggestions.
pub fn build_recommendations(metrics: &DecisionMetrics, anomalies: &[String]) -> Vec<String> {
    if anomalies.is_empty() {
        return vec!["Performance is optimal, no action needed".to_string()];
    }

    let mut recommendations = Vec::new();
    if metrics.accuracy_rate < 0.8 {
        recommendations
            .push("Retrain the decision model or adjust acceptance thresholds".to_string());
    }
    if metrics.avg_confidence < 0.7 {
        recommendations.push("Increase training data diversity to raise confidence".to_string());
    }
    if metrics.avg_response_time_ms > 2000.0 {
        recommendations.push(
            "Optimize the decision pipeline: add caching or tune database queries".to_string(),
        );
    }
    if metrics.total_decisions < 10 {
        recommendations
            .push("Increase automation adoption to gather more decision signal".to_string());
    }

    recommendations
}

/// Synthesize the remediation note sent alongside a degradation alert.
fn remediation_note(record: &AuditRecord) -> String {
    let m = &record.metrics;
    let mut note = format!(
        "Performance score {:.2} fell below the alert threshold. Window: {} decisions, \
         {:.1}% accuracy, {:.2} mean confidence, {:.0}ms mean response time.\n",
        record.performance_score,
        m.total_decisions,
        m.accuracy_rate * 100.0,
        m.avg_confidence,
        m.avg_response_time_ms
    );

    if !record.anomalies.is_empty() {
        note.push_str("Detected anomalies:\n");
        for anomaly in &record.anomalies {
            note.push_str(&format!("  - {anomaly}\n"));
        }
    }

    note.push_str(
        "Suggested actions: review recent threshold changes, consider rolling back to the \
         previous configuration snapshot, and re-audit after the next tuning cycle.",
    );
    note
}
