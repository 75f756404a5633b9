//! The control loop owning both cadences.
//!
//! `TuningEngine` wires the aggregator, tuner, auditor, and ledgers
//! together and drives them from two timers: a short tuning cadence and a
//! long audit cadence. Each cadence runs at most one cycle at a time (a
//! slow cycle cannot overlap the next fire), `start()` is idempotent, and
//! every failure mode degrades to a safe default while staying visible
//! through [`EngineStats`].

use adaptune_common::{AuditRecord, ConfigSnapshot, EngineSettings, Trend, TuningConfig};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::aggregator::MetricsAggregator;
use crate::alert_sink::AlertSink;
use crate::auditor::Auditor;
use crate::config_store::ConfigStore;
use crate::event_log::EventLogSource;
use crate::ledger::{AuditLedger, SnapshotLedger};
use crate::state_store::StateStore;
use crate::tuner::AdaptiveTuner;

/// Counters the host can poll; persistence trouble is observable here,
/// not just in the logs.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub tuning_cycles: u64,
    pub audit_cycles: u64,
    /// Timer fires skipped because the previous cycle was still running.
    pub overlap_skips: u64,
    /// Event-log fetches that degraded to default metrics.
    pub fetch_failures: u64,
    /// Failed config or ledger saves.
    pub persistence_failures: u64,
    pub alerts_sent: u64,
    pub alert_failures: u64,
}

#[derive(Default)]
struct Counters {
    tuning_cycles: AtomicU64,
    audit_cycles: AtomicU64,
    overlap_skips: AtomicU64,
    ledger_persist_failures: AtomicU64,
}

/// Resets a single-flight flag when the cycle ends, even on early unwind.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The adaptive tuning engine. Construct once, wrap in `Arc`, `start()`.
pub struct TuningEngine {
    settings: EngineSettings,
    config: RwLock<TuningConfig>,
    store: Arc<dyn StateStore>,
    config_store: ConfigStore,
    aggregator: MetricsAggregator,
    auditor: Auditor,
    snapshots: Mutex<SnapshotLedger>,
    audits: Mutex<AuditLedger>,
    tuning_running: AtomicBool,
    audit_running: AtomicBool,
    started: AtomicBool,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
    counters: Counters,
}

impl TuningEngine {
    /// Build the engine around the host's collaborators. Persisted state
    /// is loaded lazily by `start()`.
    pub async fn new(
        settings: EngineSettings,
        log: Arc<dyn EventLogSource>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let snapshots = SnapshotLedger::load(store.clone(), settings.snapshot_cap).await;
        let audits = AuditLedger::load(store.clone(), settings.audit_cap).await;

        Self {
            config: RwLock::new(TuningConfig::default()),
            config_store: ConfigStore::new(store.clone()),
            aggregator: MetricsAggregator::new(log, settings.call_timeout),
            auditor: Auditor::new(sink, settings.alert_score_threshold, settings.call_timeout),
            snapshots: Mutex::new(snapshots),
            audits: Mutex::new(audits),
            tuning_running: AtomicBool::new(false),
            audit_running: AtomicBool::new(false),
            started: AtomicBool::new(false),
            tasks: std::sync::Mutex::new(Vec::new()),
            counters: Counters::default(),
            store,
            settings,
        }
    }

    /// Load persisted state, arm both timers, and run one immediate cycle
    /// of each (the first interval tick fires immediately). Calling twice
    /// is a no-op.
    pub async fn start(self: Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("start ignored, engine already running");
            return;
        }

        let persisted = self.config_store.load().await;
        *self.config.write().await = persisted;
        *self.snapshots.lock().await =
            SnapshotLedger::load(self.store.clone(), self.settings.snapshot_cap).await;
        *self.audits.lock().await =
            AuditLedger::load(self.store.clone(), self.settings.audit_cap).await;

        info!(
            tuning_interval = ?self.settings.tuning_interval,
            audit_interval = ?self.settings.audit_interval,
            "tuning engine starting"
        );

        let tuning = {
            let engine = Arc::clone(&self);
            tokio::spawn(async move {
                let mut ticker = interval(engine.settings.tuning_interval);
                loop {
                    ticker.tick().await;
                    engine.run_tuning_cycle().await;
                }
            })
        };

        let audit = {
            let engine = Arc::clone(&self);
            tokio::spawn(async move {
                let mut ticker = interval(engine.settings.audit_interval);
                loop {
                    ticker.tick().await;
                    engine.run_audit_cycle().await;
                }
            })
        };

        self.tasks.lock().unwrap().extend([tuning, audit]);
    }

    /// Disarm both timers. Persisted state is left untouched.
    pub fn stop(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        self.started.store(false, Ordering::SeqCst);
        info!("tuning engine stopped");
    }

    /// One aggregate -> snapshot -> adjust -> persist pass.
    ///
    /// Serialized against itself: a fire that arrives while the previous
    /// cycle is still running is skipped, never queued.
    pub async fn run_tuning_cycle(&self) {
        if self
            .tuning_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.counters.overlap_skips.fetch_add(1, Ordering::SeqCst);
            warn!("tuning cycle still running, skipping this fire");
            return;
        }
        let _guard = CycleGuard(&self.tuning_running);

        let since = Utc::now() - to_chrono(self.settings.tuning_interval);
        let metrics = self.aggregator.aggregate(since).await;

        // Hold the write lock for the whole snapshot/adjust/persist
        // sequence so readers only ever see a consistent configuration.
        let mut config = self.config.write().await;
        let score = metrics.performance_score(&config.weights);

        // Snapshot the pre-adjustment state: the ledger records what
        // produced this score, not the reaction to it.
        let snapshot = ConfigSnapshot::new(config.clone(), metrics.clone(), score);
        if let Err(e) = self.snapshots.lock().await.append(snapshot).await {
            self.counters
                .ledger_persist_failures
                .fetch_add(1, Ordering::SeqCst);
            warn!(error = %e, "snapshot persist failed, in-memory ledger kept");
        }

        let outcome = AdaptiveTuner::apply(&mut config, &metrics);
        if config.rules.auto_adjust_enabled {
            // Save failures are already counted by the config store; the
            // in-memory config stays authoritative.
            let _ = self.config_store.save(&config).await;
        }
        drop(config);

        self.counters.tuning_cycles.fetch_add(1, Ordering::SeqCst);
        info!(
            score,
            changed = outcome.changed,
            decisions = metrics.total_decisions,
            "tuning cycle complete"
        );
    }

    /// One independent audit pass over its own aggregation window.
    pub async fn run_audit_cycle(&self) {
        if self
            .audit_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.counters.overlap_skips.fetch_add(1, Ordering::SeqCst);
            warn!("audit cycle still running, skipping this fire");
            return;
        }
        let _guard = CycleGuard(&self.audit_running);

        let since = Utc::now() - to_chrono(self.settings.audit_interval);
        let metrics = self.aggregator.aggregate(since).await;
        let config = self.config.read().await.clone();

        let mut audits = self.audits.lock().await;
        match self.auditor.run_cycle(&config, metrics, &mut audits).await {
            Ok(record) => {
                let trend = audits.trend(self.settings.trend_window);
                info!(score = record.performance_score, trend = %trend, "audit recorded");
            }
            Err(e) => {
                self.counters
                    .ledger_persist_failures
                    .fetch_add(1, Ordering::SeqCst);
                warn!(error = %e, "audit record persist failed, in-memory ledger kept");
            }
        }
        drop(audits);

        self.counters.audit_cycles.fetch_add(1, Ordering::SeqCst);
    }

    /// Restore the second-to-last snapshot's configuration and persist it.
    ///
    /// The last snapshot is the current state, so rollback undoes exactly
    /// one step. Returns `false` (config untouched) with fewer than two
    /// snapshots. Operator/host triggered only; `rollback_on_degradation`
    /// is declared but deliberately not wired to an automatic trigger.
    pub async fn rollback(&self) -> bool {
        let restored = {
            let snapshots = self.snapshots.lock().await;
            match snapshots.rollback_target() {
                Some(target) => target.config.clone(),
                None => {
                    warn!("rollback unavailable: fewer than 2 snapshots");
                    return false;
                }
            }
        };

        let mut config = self.config.write().await;
        *config = restored;
        let _ = self.config_store.save(&config).await;
        info!(
            confidence_min = config.thresholds.confidence_min,
            "configuration rolled back to previous snapshot"
        );
        true
    }

    /// Current configuration (read-only copy for dashboards).
    pub async fn current_config(&self) -> TuningConfig {
        self.config.read().await.clone()
    }

    /// Latest ledgered snapshot, if any.
    pub async fn latest_snapshot(&self) -> Option<ConfigSnapshot> {
        self.snapshots.lock().await.latest().cloned()
    }

    /// Most recent audit record, if any.
    pub async fn latest_audit(&self) -> Option<AuditRecord> {
        self.audits.lock().await.latest().cloned()
    }

    /// Trend classification over the configured lookback window.
    pub async fn trend(&self) -> Trend {
        self.audits.lock().await.trend(self.settings.trend_window)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            tuning_cycles: self.counters.tuning_cycles.load(Ordering::SeqCst),
            audit_cycles: self.counters.audit_cycles.load(Ordering::SeqCst),
            overlap_skips: self.counters.overlap_skips.load(Ordering::SeqCst),
            fetch_failures: self.aggregator.fetch_failures(),
            persistence_failures: self.config_store.save_failures()
                + self.counters.ledger_persist_failures.load(Ordering::SeqCst),
            alerts_sent: self.auditor.alerts_sent(),
            alert_failures: self.auditor.alert_failures(),
        }
    }
}

fn to_chrono(d: std::time::Duration) -> ChronoDuration {
    ChronoDuration::from_std(d).unwrap_or_else(|_| ChronoDuration::hours(6))
}
