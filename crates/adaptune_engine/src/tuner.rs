//! Bounded adaptive adjustment of the tuning configuration.
//!
//! Small steps only, every knob clamped, and a dead zone around the
//! accuracy target so the gate does not oscillate. Each applied change
//! produces a human-readable note; "no change" is a first-class outcome.

use adaptune_common::config::{
    CONFIDENCE_MIN_CEIL, CONFIDENCE_MIN_FLOOR, SPEED_WEIGHT_FLOOR, USER_FEEDBACK_WEIGHT_CEIL,
};
use adaptune_common::{DecisionMetrics, TuningConfig};
use tracing::{debug, info};

/// What one tuning pass decided.
#[derive(Debug, Clone)]
pub struct TuneOutcome {
    /// Score of the state that went into this pass.
    pub performance_score: f64,
    /// Whether any knob moved.
    pub changed: bool,
    /// One note per applied adjustment.
    pub notes: Vec<String>,
}

/// The adaptive tuner. Stateless: all state lives in the configuration
/// it mutates and the ledger the engine snapshots into beforehand.
pub struct AdaptiveTuner;

impl AdaptiveTuner {
    /// Apply one cycle's bounded adjustments to `config`.
    ///
    /// The caller must have snapshotted `config` already; this mutates in
    /// place and does not persist.
    pub fn apply(config: &mut TuningConfig, metrics: &DecisionMetrics) -> TuneOutcome {
        let performance_score = metrics.performance_score(&config.weights);

        if !config.rules.auto_adjust_enabled {
            debug!("auto-adjust disabled, configuration untouched");
            return TuneOutcome {
                performance_score,
                changed: false,
                notes: Vec::new(),
            };
        }

        let lr = config.rules.learning_rate;
        let mut notes = Vec::new();

        Self::adjust_confidence_gate(config, metrics, lr, &mut notes);
        Self::rebalance_weights(config, metrics, lr, &mut notes);

        for note in &notes {
            info!("tuning adjustment: {note}");
        }

        TuneOutcome {
            performance_score,
            changed: !notes.is_empty(),
            notes,
        }
    }

    /// Move the confidence gate towards the accuracy target.
    ///
    /// Under-performing relaxes the gate, over-performing (by more than
    /// 0.1) tightens it. The band in between is a deliberate dead zone.
    fn adjust_confidence_gate(
        config: &mut TuningConfig,
        metrics: &DecisionMetrics,
        lr: f64,
        notes: &mut Vec<String>,
    ) {
        let target = config.thresholds.accuracy_target;
        let old = config.thresholds.confidence_min;

        if metrics.accuracy_rate < target {
            config.thresholds.confidence_min = (old - lr * 0.1).max(CONFIDENCE_MIN_FLOOR);
            if config.thresholds.confidence_min < old {
                notes.push(format!(
                    "lowered confidence_min {:.3} -> {:.3}: accuracy {:.1}% below target {:.1}%",
                    old,
                    config.thresholds.confidence_min,
                    metrics.accuracy_rate * 100.0,
                    target * 100.0
                ));
            }
        } else if metrics.accuracy_rate > target + 0.1 {
            config.thresholds.confidence_min = (old + lr * 0.05).min(CONFIDENCE_MIN_CEIL);
            if config.thresholds.confidence_min > old {
                notes.push(format!(
                    "raised confidence_min {:.3} -> {:.3}: accuracy {:.1}% well above target {:.1}%",
                    old,
                    config.thresholds.confidence_min,
                    metrics.accuracy_rate * 100.0,
                    target * 100.0
                ));
            }
        }
    }

    /// Shift weight from speed to user feedback when accuracy outpaces
    /// responsiveness. There is no opposite shift: responsiveness never
    /// buys back weight on its own.
    fn rebalance_weights(
        config: &mut TuningConfig,
        metrics: &DecisionMetrics,
        lr: f64,
        notes: &mut Vec<String>,
    ) {
        let speed_score =
            (1.0 - metrics.avg_response_time_ms / config.thresholds.response_time_max_ms).max(0.0);

        if metrics.accuracy_rate <= speed_score {
            return;
        }

        let step = lr * 0.05;
        let old_feedback = config.weights.user_feedback;
        let old_speed = config.weights.speed;

        config.weights.user_feedback = (old_feedback + step).min(USER_FEEDBACK_WEIGHT_CEIL);
        config.weights.speed = (old_speed - step).max(SPEED_WEIGHT_FLOOR);

        if config.weights.user_feedback != old_feedback || config.weights.speed != old_speed {
            notes.push(format!(
                "shifted weight speed {:.3} -> {:.3}, user_feedback {:.3} -> {:.3}: \
                 accuracy {:.2} outpaced speed score {:.2}",
                old_speed,
                config.weights.speed,
                old_feedback,
                config.weights.user_feedback,
                metrics.accuracy_rate,
                speed_score
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metrics(accuracy: f64, confidence: f64, response_ms: f64) -> DecisionMetrics {
        DecisionMetrics {
            total_decisions: 100,
            accepted_decisions: (accuracy * 100.0) as u64,
            rejected_decisions: 100 - (accuracy * 100.0) as u64,
            avg_confidence: confidence,
            avg_response_time_ms: response_ms,
            accuracy_rate: accuracy,
        }
    }

    #[test]
    fn low_accuracy_relaxes_confidence_gate() {
        let mut config = TuningConfig::default();
        let outcome = AdaptiveTuner::apply(&mut config, &metrics(0.6, 0.7, 1500.0));

        assert_relative_eq!(config.thresholds.confidence_min, 0.69, epsilon = 1e-9);
        assert_relative_eq!(outcome.performance_score, 0.62, epsilon = 1e-9);
        assert!(outcome.changed);
    }

    #[test]
    fn accuracy_at_target_sits_in_dead_zone() {
        let mut config = TuningConfig::default();
        // Slow responses so the weight shift does not fire either.
        AdaptiveTuner::apply(&mut config, &metrics(0.85, 0.7, 2000.0));
        assert_eq!(config.thresholds.confidence_min, 0.7);
    }

    #[test]
    fn dead_zone_extends_to_target_plus_point_one() {
        let mut config = TuningConfig::default();
        AdaptiveTuner::apply(&mut config, &metrics(0.95, 0.7, 2000.0));
        assert_eq!(config.thresholds.confidence_min, 0.7);

        AdaptiveTuner::apply(&mut config, &metrics(0.951, 0.7, 2000.0));
        assert_relative_eq!(config.thresholds.confidence_min, 0.705, epsilon = 1e-9);
    }

    #[test]
    fn confidence_gate_never_leaves_bounds() {
        let mut config = TuningConfig::default();
        for _ in 0..100 {
            AdaptiveTuner::apply(&mut config, &metrics(0.1, 0.5, 3000.0));
        }
        assert_eq!(config.thresholds.confidence_min, 0.5);

        for _ in 0..100 {
            AdaptiveTuner::apply(&mut config, &metrics(1.0, 0.9, 100.0));
        }
        assert_eq!(config.thresholds.confidence_min, 0.95);
    }

    #[test]
    fn weight_shift_respects_clamps_and_preserves_drift() {
        let mut config = TuningConfig::default();
        // Accuracy outpaces speed every cycle.
        for _ in 0..100 {
            AdaptiveTuner::apply(&mut config, &metrics(0.9, 0.8, 1900.0));
        }
        assert_relative_eq!(config.weights.user_feedback, 0.6, epsilon = 1e-9);
        assert_relative_eq!(config.weights.speed, 0.1, epsilon = 1e-9);
        // The clamps bind independently, so the sum drifts away from 1.0.
        // Preserved on purpose; renormalizing would change score semantics.
        let sum = config.weights.user_feedback + config.weights.accuracy + config.weights.speed;
        assert_relative_eq!(sum, 1.1, epsilon = 1e-9);
    }

    #[test]
    fn no_shift_when_speed_outpaces_accuracy() {
        let mut config = TuningConfig::default();
        // speed_score = 1 - 200/2000 = 0.9 > accuracy 0.86 (dead zone for
        // the gate too).
        AdaptiveTuner::apply(&mut config, &metrics(0.86, 0.8, 200.0));
        assert_eq!(config.weights, TuningConfig::default().weights);
    }

    #[test]
    fn disabled_auto_adjust_freezes_config() {
        let mut config = TuningConfig::default();
        config.rules.auto_adjust_enabled = false;
        let before = config.clone();

        let outcome = AdaptiveTuner::apply(&mut config, &metrics(0.2, 0.3, 2900.0));
        assert_eq!(config, before);
        assert!(!outcome.changed);
        assert!(outcome.notes.is_empty());
    }
}
