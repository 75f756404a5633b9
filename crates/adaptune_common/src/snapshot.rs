//! Configuration snapshots for rollback.

use crate::config::TuningConfig;
use crate::metrics::DecisionMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of one tuning cycle's pre-adjustment state.
///
/// The snapshot is taken before the tuner mutates anything, so the ledger
/// reads as "the state that produced this score", not the state that
/// resulted from reacting to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub id: String,
    pub config: TuningConfig,
    pub metrics: DecisionMetrics,
    pub timestamp: DateTime<Utc>,
    pub performance_score: f64,
}

impl ConfigSnapshot {
    pub fn new(config: TuningConfig, metrics: DecisionMetrics, performance_score: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            config,
            metrics,
            timestamp: Utc::now(),
            performance_score,
        }
    }
}
