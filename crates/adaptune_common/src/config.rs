//! Tunable configuration and engine timing settings.
//!
//! The `TuningConfig` is the single mutable object in the whole engine.
//! Only the tuner mutates it; the auditor and any host-side reader treat
//! it as read-only. All adjustment knobs are bounded: `clamp()` is the
//! one place those bounds live.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lower bound for the confidence gate.
pub const CONFIDENCE_MIN_FLOOR: f64 = 0.5;
/// Upper bound for the confidence gate.
pub const CONFIDENCE_MIN_CEIL: f64 = 0.95;
/// Upper bound for the user-feedback weight.
pub const USER_FEEDBACK_WEIGHT_CEIL: f64 = 0.6;
/// Lower bound for the speed weight.
pub const SPEED_WEIGHT_FLOOR: f64 = 0.1;

/// Decision-gate thresholds adjusted by the tuner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    /// Minimum confidence required to auto-accept a decision.
    pub confidence_min: f64,
    /// Accuracy rate the tuner steers towards.
    pub accuracy_target: f64,
    /// Response time considered acceptable (milliseconds).
    pub response_time_max_ms: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            confidence_min: 0.7,
            accuracy_target: 0.85,
            response_time_max_ms: 2000.0,
        }
    }
}

/// Weights combining the three score components.
///
/// Documented to sum to 1.0 at defaults. The rebalancing rule only ever
/// shifts `speed` towards `user_feedback` without touching `accuracy`, so
/// the sum can drift over many cycles. That drift is preserved on purpose;
/// renormalizing would change the score semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub user_feedback: f64,
    pub accuracy: f64,
    pub speed: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            user_feedback: 0.4,
            accuracy: 0.4,
            speed: 0.2,
        }
    }
}

/// Behavioral switches for the tuning loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningRules {
    /// When false the tuner still snapshots but never mutates config.
    pub auto_adjust_enabled: bool,
    /// Step scale for all bounded adjustments.
    pub learning_rate: f64,
    /// Declared but not wired to any automatic trigger; rollback is
    /// operator/host invoked only.
    pub rollback_on_degradation: bool,
}

impl Default for TuningRules {
    fn default() -> Self {
        Self {
            auto_adjust_enabled: true,
            learning_rate: 0.1,
            rollback_on_degradation: true,
        }
    }
}

/// The complete tunable configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TuningConfig {
    pub thresholds: DecisionThresholds,
    pub weights: ScoreWeights,
    pub rules: TuningRules,
}

impl TuningConfig {
    /// Force all bounded fields back inside their documented ranges.
    ///
    /// Applied after every adjustment and after loading persisted state,
    /// so a corrupt or hand-edited blob can never widen the gates.
    pub fn clamp(&mut self) {
        self.thresholds.confidence_min = self
            .thresholds
            .confidence_min
            .clamp(CONFIDENCE_MIN_FLOOR, CONFIDENCE_MIN_CEIL);
        self.weights.user_feedback = self.weights.user_feedback.min(USER_FEEDBACK_WEIGHT_CEIL);
        self.weights.speed = self.weights.speed.max(SPEED_WEIGHT_FLOOR);
    }
}

/// Timing constants and capacity caps for the engine.
///
/// Defaults match the production cadences; tests shrink them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Cadence of the aggregate -> tune -> snapshot pipeline.
    pub tuning_interval: Duration,
    /// Cadence of the audit pipeline.
    pub audit_interval: Duration,
    /// Performance score below which the auditor alerts the watchdog.
    pub alert_score_threshold: f64,
    /// Lookback window for trend classification.
    pub trend_window: Duration,
    /// Maximum retained snapshots (FIFO eviction beyond this).
    pub snapshot_cap: usize,
    /// Maximum retained audit records.
    pub audit_cap: usize,
    /// Maximum retained alerts in the sink queue.
    pub alert_cap: usize,
    /// Bound on every external call (log fetch, alert send).
    pub call_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tuning_interval: Duration::from_secs(6 * 60 * 60),
            audit_interval: Duration::from_secs(7 * 24 * 60 * 60),
            alert_score_threshold: 0.75,
            trend_window: Duration::from_secs(7 * 24 * 60 * 60),
            snapshot_cap: 30,
            audit_cap: 12,
            alert_cap: 50,
            call_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TuningConfig::default();
        assert_eq!(config.thresholds.confidence_min, 0.7);
        assert_eq!(config.thresholds.accuracy_target, 0.85);
        assert_eq!(config.thresholds.response_time_max_ms, 2000.0);
        assert_eq!(config.weights.user_feedback, 0.4);
        assert_eq!(config.weights.accuracy, 0.4);
        assert_eq!(config.weights.speed, 0.2);
        assert!(config.rules.auto_adjust_enabled);
        assert_eq!(config.rules.learning_rate, 0.1);
    }

    #[test]
    fn clamp_restores_bounds() {
        let mut config = TuningConfig::default();
        config.thresholds.confidence_min = 0.2;
        config.weights.user_feedback = 0.9;
        config.weights.speed = 0.01;
        config.clamp();
        assert_eq!(config.thresholds.confidence_min, CONFIDENCE_MIN_FLOOR);
        assert_eq!(config.weights.user_feedback, USER_FEEDBACK_WEIGHT_CEIL);
        assert_eq!(config.weights.speed, SPEED_WEIGHT_FLOOR);

        config.thresholds.confidence_min = 0.99;
        config.clamp();
        assert_eq!(config.thresholds.confidence_min, CONFIDENCE_MIN_CEIL);
    }

    #[test]
    fn clamp_leaves_in_range_values_alone() {
        let mut config = TuningConfig::default();
        let before = config.clone();
        config.clamp();
        assert_eq!(config, before);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = TuningConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: TuningConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
