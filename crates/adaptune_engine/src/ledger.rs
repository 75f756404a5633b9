//! Capacity-bounded history ledgers.
//!
//! Two append-only ledgers back the engine's memory of itself: tuning
//! snapshots (rollback material) and audit records (trend material).
//! Eviction is FIFO at a fixed cap; nothing else ever removes an entry.

use adaptune_common::{AuditRecord, ConfigSnapshot, Trend, TuneError};
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::state_store::StateStore;

/// Key holding the snapshot history.
pub const SNAPSHOTS_KEY: &str = "tuning_snapshots";
/// Key holding the audit history.
pub const AUDITS_KEY: &str = "audit_records";

/// Bounded history of tuning snapshots, oldest first.
pub struct SnapshotLedger {
    store: Arc<dyn StateStore>,
    cap: usize,
    entries: VecDeque<ConfigSnapshot>,
}

impl SnapshotLedger {
    /// Load persisted history; a missing or corrupt blob means an empty
    /// ledger, never a startup failure.
    pub async fn load(store: Arc<dyn StateStore>, cap: usize) -> Self {
        let entries = load_entries(&store, SNAPSHOTS_KEY).await;
        Self {
            store,
            cap,
            entries,
        }
    }

    /// Append a snapshot, evicting the oldest beyond the cap, and persist
    /// the whole history.
    pub async fn append(&mut self, snapshot: ConfigSnapshot) -> Result<(), TuneError> {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
        self.persist().await
    }

    pub fn latest(&self) -> Option<&ConfigSnapshot> {
        self.entries.back()
    }

    /// The snapshot a rollback would restore: second-to-last, since the
    /// last one is the current state.
    pub fn rollback_target(&self) -> Option<&ConfigSnapshot> {
        if self.entries.len() < 2 {
            return None;
        }
        self.entries.get(self.entries.len() - 2)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConfigSnapshot> {
        self.entries.iter()
    }

    async fn persist(&self) -> Result<(), TuneError> {
        let raw = serde_json::to_string(&Vec::from_iter(self.entries.iter()))?;
        self.store.put(SNAPSHOTS_KEY, &raw).await
    }
}

/// Bounded history of audit records, oldest first.
pub struct AuditLedger {
    store: Arc<dyn StateStore>,
    cap: usize,
    entries: VecDeque<AuditRecord>,
}

impl AuditLedger {
    pub async fn load(store: Arc<dyn StateStore>, cap: usize) -> Self {
        let entries = load_entries(&store, AUDITS_KEY).await;
        Self {
            store,
            cap,
            entries,
        }
    }

    pub async fn append(&mut self, record: AuditRecord) -> Result<(), TuneError> {
        self.entries.push_back(record);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
        let raw = serde_json::to_string(&Vec::from_iter(self.entries.iter()))?;
        self.store.put(AUDITS_KEY, &raw).await
    }

    pub fn latest(&self) -> Option<&AuditRecord> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AuditRecord> {
        self.entries.iter()
    }

    /// Classify the trend over records inside the lookback window.
    ///
    /// Mean score at least 0.85 reads as improving, at least 0.75 as
    /// stable, anything lower as degrading. An empty window is stable:
    /// no evidence of movement either way.
    pub fn trend(&self, window: Duration) -> Trend {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::days(7));
        let recent: Vec<f64> = self
            .entries
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .map(|r| r.performance_score)
            .collect();

        if recent.is_empty() {
            return Trend::Stable;
        }

        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        if mean >= 0.85 {
            Trend::Improving
        } else if mean >= 0.75 {
            Trend::Stable
        } else {
            Trend::Degrading
        }
    }
}

async fn load_entries<T: serde::de::DeserializeOwned>(
    store: &Arc<dyn StateStore>,
    key: &str,
) -> VecDeque<T> {
    match store.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(entries) => entries.into(),
            Err(e) => {
                warn!(key, error = %e, "persisted ledger unparseable, starting empty");
                VecDeque::new()
            }
        },
        Ok(None) => VecDeque::new(),
        Err(e) => {
            warn!(key, error = %e, "ledger load failed, starting empty");
            VecDeque::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::MemoryStore;
    use adaptune_common::{DecisionMetrics, TuningConfig};
    use chrono::Utc;

    fn snapshot(score: f64) -> ConfigSnapshot {
        ConfigSnapshot::new(TuningConfig::default(), DecisionMetrics::default(), score)
    }

    fn audit(score: f64) -> AuditRecord {
        AuditRecord::new(DecisionMetrics::default(), score)
    }

    #[tokio::test]
    async fn snapshot_ledger_evicts_oldest_beyond_cap() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = SnapshotLedger::load(store, 30).await;

        for i in 0..35 {
            ledger.append(snapshot(i as f64)).await.unwrap();
        }

        assert_eq!(ledger.len(), 30);
        let scores: Vec<f64> = ledger.entries().map(|s| s.performance_score).collect();
        // Oldest five evicted, remainder ordered oldest to newest.
        assert_eq!(scores[0], 5.0);
        assert_eq!(*scores.last().unwrap(), 34.0);
        assert!(scores.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn snapshot_ledger_survives_reload() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut ledger = SnapshotLedger::load(store.clone(), 30).await;
            ledger.append(snapshot(0.8)).await.unwrap();
            ledger.append(snapshot(0.9)).await.unwrap();
        }

        let reloaded = SnapshotLedger::load(store, 30).await;
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.latest().unwrap().performance_score, 0.9);
    }

    #[tokio::test]
    async fn rollback_target_needs_two_snapshots() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = SnapshotLedger::load(store, 30).await;

        assert!(ledger.rollback_target().is_none());

        ledger.append(snapshot(0.8)).await.unwrap();
        assert!(ledger.rollback_target().is_none());

        ledger.append(snapshot(0.9)).await.unwrap();
        assert_eq!(ledger.rollback_target().unwrap().performance_score, 0.8);
    }

    #[tokio::test]
    async fn corrupt_ledger_blob_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.put(SNAPSHOTS_KEY, "[{broken").await.unwrap();

        let ledger = SnapshotLedger::load(store, 30).await;
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn audit_ledger_caps_at_twelve() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = AuditLedger::load(store, 12).await;

        for i in 0..15 {
            ledger.append(audit(i as f64 / 100.0)).await.unwrap();
        }
        assert_eq!(ledger.len(), 12);
        assert_eq!(ledger.entries().next().unwrap().performance_score, 0.03);
    }

    #[tokio::test]
    async fn trend_stable_at_point_eight() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = AuditLedger::load(store, 12).await;

        for _ in 0..4 {
            ledger.append(audit(0.80)).await.unwrap();
        }
        assert_eq!(ledger.trend(Duration::from_secs(7 * 24 * 3600)), Trend::Stable);
    }

    #[tokio::test]
    async fn trend_classifies_extremes() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = AuditLedger::load(store.clone(), 12).await;
        ledger.append(audit(0.9)).await.unwrap();
        ledger.append(audit(0.92)).await.unwrap();
        assert_eq!(
            ledger.trend(Duration::from_secs(7 * 24 * 3600)),
            Trend::Improving
        );

        let mut low = AuditLedger::load(Arc::new(MemoryStore::new()), 12).await;
        low.append(audit(0.5)).await.unwrap();
        assert_eq!(low.trend(Duration::from_secs(7 * 24 * 3600)), Trend::Degrading);
    }

    #[tokio::test]
    async fn trend_ignores_records_outside_window() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = AuditLedger::load(store, 12).await;

        let mut old = audit(0.2);
        old.timestamp = Utc::now() - ChronoDuration::days(30);
        ledger.append(old).await.unwrap();
        ledger.append(audit(0.9)).await.unwrap();

        assert_eq!(
            ledger.trend(Duration::from_secs(7 * 24 * 3600)),
            Trend::Improving
        );
    }
}
