//! Load/persist the tunable configuration.

use adaptune_common::{TuneError, TuningConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::state_store::StateStore;

/// Key holding the serialized configuration.
pub const CONFIG_KEY: &str = "tuning_config";

/// Configuration persistence on top of a `StateStore`.
///
/// Loads fall back to defaults silently (missing key or corrupt blob).
/// Saves surface their error to the caller and bump a counter the host
/// can watch, so persistence trouble is observable rather than swallowed.
pub struct ConfigStore {
    store: Arc<dyn StateStore>,
    save_failures: AtomicU64,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            save_failures: AtomicU64::new(0),
        }
    }

    /// Number of failed saves since construction.
    pub fn save_failures(&self) -> u64 {
        self.save_failures.load(Ordering::SeqCst)
    }

    /// Load the persisted configuration, defaulting when absent or
    /// unparseable. Always returns a clamped config.
    pub async fn load(&self) -> TuningConfig {
        let mut config = match self.store.get(CONFIG_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<TuningConfig>(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(error = %e, "persisted config unparseable, using defaults");
                    TuningConfig::default()
                }
            },
            Ok(None) => {
                info!("no persisted config, using defaults");
                TuningConfig::default()
            }
            Err(e) => {
                warn!(error = %e, "config load failed, using defaults");
                TuningConfig::default()
            }
        };
        config.clamp();
        config
    }

    /// Persist the configuration. On failure the in-memory copy stays
    /// authoritative until the next successful save.
    pub async fn save(&self, config: &TuningConfig) -> Result<(), TuneError> {
        let raw = serde_json::to_string_pretty(config)?;
        if let Err(e) = self.store.put(CONFIG_KEY, &raw).await {
            self.save_failures.fetch_add(1, Ordering::SeqCst);
            warn!(error = %e, "config save failed, in-memory state remains authoritative");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::MemoryStore;

    #[tokio::test]
    async fn load_defaults_when_missing() {
        let store = ConfigStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(store.load().await, TuningConfig::default());
    }

    #[tokio::test]
    async fn load_defaults_when_corrupt() {
        let kv = Arc::new(MemoryStore::new());
        kv.put(CONFIG_KEY, "{{{ not json").await.unwrap();

        let store = ConfigStore::new(kv);
        assert_eq!(store.load().await, TuningConfig::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = ConfigStore::new(Arc::new(MemoryStore::new()));

        let mut config = TuningConfig::default();
        config.thresholds.confidence_min = 0.69;
        config.weights.user_feedback = 0.45;
        store.save(&config).await.unwrap();

        assert_eq!(store.load().await, config);
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let store = ConfigStore::new(Arc::new(MemoryStore::new()));
        let mut config = TuningConfig::default();
        config.thresholds.accuracy_target = 0.9;
        store.save(&config).await.unwrap();

        let first = store.load().await;
        let second = store.load().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn load_clamps_out_of_range_blob() {
        let kv = Arc::new(MemoryStore::new());
        let mut config = TuningConfig::default();
        config.thresholds.confidence_min = 0.3;
        kv.put(CONFIG_KEY, &serde_json::to_string(&config).unwrap())
            .await
            .unwrap();

        let store = ConfigStore::new(kv);
        assert_eq!(store.load().await.thresholds.confidence_min, 0.5);
    }
}
