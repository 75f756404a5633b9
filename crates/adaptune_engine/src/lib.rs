//! Adaptive tuning & anomaly detection engine.
//!
//! A closed-loop controller for an automated decision system: it
//! periodically aggregates decision outcomes, applies small bounded
//! adjustments to the decision thresholds, snapshots its own history for
//! rollback, and runs a slower audit that flags anomalies and forwards
//! remediation notes to an external watchdog.
//!
//! The host application constructs a [`TuningEngine`] with its own
//! implementations of the collaborator traits ([`EventLogSource`],
//! [`StateStore`], [`AlertSink`]) and calls `start()`; everything else is
//! timer-driven.

pub mod aggregator;
pub mod alert_sink;
pub mod auditor;
pub mod config_store;
pub mod engine;
pub mod event_log;
pub mod ledger;
pub mod state_store;
pub mod tuner;

pub use aggregator::MetricsAggregator;
pub use alert_sink::{AlertSink, MemoryAlertSink, StoreAlertSink};
pub use auditor::Auditor;
pub use config_store::ConfigStore;
pub use engine::{EngineStats, TuningEngine};
pub use event_log::{ActionEvent, EventLogSource, FeedbackEvent, MemoryEventLog};
pub use ledger::{AuditLedger, SnapshotLedger};
pub use state_store::{JsonFileStore, MemoryStore, StateStore};
pub use tuner::{AdaptiveTuner, TuneOutcome};
