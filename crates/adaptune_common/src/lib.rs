//! Shared types for the adaptive tuning engine.
//!
//! Pure data model: tunable configuration, aggregated decision metrics,
//! snapshot and audit records, and the error taxonomy. No I/O lives here;
//! the engine crate owns collaborators and scheduling.

pub mod audit;
pub mod config;
pub mod error;
pub mod metrics;
pub mod snapshot;

pub use audit::{AuditRecord, PerformanceAlert, Trend};
pub use config::{DecisionThresholds, EngineSettings, ScoreWeights, TuningConfig, TuningRules};
pub use error::TuneError;
pub use metrics::DecisionMetrics;
pub use snapshot::ConfigSnapshot;
