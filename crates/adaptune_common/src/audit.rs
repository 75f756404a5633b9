//! Audit records, trend classification, and watchdog alerts.

use crate::metrics::DecisionMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rolling classification of recent audit scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Degrading,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Stable => write!(f, "stable"),
            Trend::Degrading => write!(f, "degrading"),
        }
    }
}

/// One audit cycle's output. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: DecisionMetrics,
    pub performance_score: f64,
    pub anomalies: Vec<String>,
    pub recommendations: Vec<String>,
    /// Synthesized remediation note, present only when the score fell
    /// below the alert threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_remediation: Option<String>,
}

impl AuditRecord {
    pub fn new(metrics: DecisionMetrics, performance_score: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            metrics,
            performance_score,
            anomalies: Vec::new(),
            recommendations: Vec::new(),
            suggested_remediation: None,
        }
    }
}

/// Structured alert forwarded to the external watchdog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: AuditRecord,
}

impl PerformanceAlert {
    pub fn degradation(record: AuditRecord) -> Self {
        Self {
            alert_type: "performance_degradation".to_string(),
            timestamp: Utc::now(),
            data: record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Trend::Stable).unwrap(), "\"stable\"");
        assert_eq!(Trend::Degrading.to_string(), "degrading");
    }

    #[test]
    fn alert_carries_degradation_type() {
        let record = AuditRecord::new(DecisionMetrics::default(), 0.5);
        let alert = PerformanceAlert::degradation(record.clone());
        assert_eq!(alert.alert_type, "performance_degradation");
        assert_eq!(alert.data, record);

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "performance_degradation");
    }
}
