//! Aggregated decision-outcome metrics.

use crate::config::ScoreWeights;
use serde::{Deserialize, Serialize};

/// Divisor normalizing response time into the score's speed component.
/// 3000 ms maps to a speed contribution of zero.
pub const SPEED_SCORE_CEILING_MS: f64 = 3000.0;

/// One aggregation window's worth of decision outcomes.
///
/// Ephemeral: recomputed every cycle and only persisted as part of a
/// snapshot or audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetrics {
    pub total_decisions: u64,
    pub accepted_decisions: u64,
    pub rejected_decisions: u64,
    /// Mean operator confidence, [0, 1].
    pub avg_confidence: f64,
    pub avg_response_time_ms: f64,
    /// Accepted/total ratio from the feedback stream; 0.5 when empty.
    pub accuracy_rate: f64,
}

impl Default for DecisionMetrics {
    fn default() -> Self {
        Self {
            total_decisions: 0,
            accepted_decisions: 0,
            rejected_decisions: 0,
            avg_confidence: 0.7,
            avg_response_time_ms: 1100.0,
            accuracy_rate: 0.5,
        }
    }
}

impl DecisionMetrics {
    /// Weighted performance score in roughly [0, 1].
    ///
    /// Shared by the tuner and the auditor so the two cadences always
    /// agree on what "performance" means.
    pub fn performance_score(&self, weights: &ScoreWeights) -> f64 {
        let speed = (1.0 - self.avg_response_time_ms / SPEED_SCORE_CEILING_MS).max(0.0);
        self.accuracy_rate * weights.accuracy
            + speed * weights.speed
            + self.avg_confidence * weights.user_feedback
    }

    /// Rejected/total ratio; zero when no decisions were seen.
    pub fn rejection_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            return 0.0;
        }
        self.rejected_decisions as f64 / self.total_decisions as f64
    }
}
