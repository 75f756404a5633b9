//! Alert delivery to the external watchdog.
//!
//! The engine only ever appends; an external consumer drains the queue.

use adaptune_common::{PerformanceAlert, TuneError};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::state_store::StateStore;

/// Key holding the watchdog alert queue in the state store.
pub const ALERTS_KEY: &str = "performance_alerts";

/// Destination for performance-degradation alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: PerformanceAlert) -> Result<(), TuneError>;
}

/// Sink that appends alerts to a capped JSON array in the state store,
/// where the watchdog process picks them up.
pub struct StoreAlertSink {
    store: Arc<dyn StateStore>,
    cap: usize,
}

impl StoreAlertSink {
    pub fn new(store: Arc<dyn StateStore>, cap: usize) -> Self {
        Self { store, cap }
    }
}

#[async_trait]
impl AlertSink for StoreAlertSink {
    async fn send(&self, alert: PerformanceAlert) -> Result<(), TuneError> {
        let mut queue: Vec<PerformanceAlert> = match self.store.get(ALERTS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            None => Vec::new(),
        };

        queue.push(alert);
        if queue.len() > self.cap {
            let excess = queue.len() - self.cap;
            queue.drain(..excess);
        }

        let raw = serde_json::to_string(&queue)?;
        self.store.put(ALERTS_KEY, &raw).await
    }
}

/// Recording sink for tests.
#[derive(Default)]
pub struct MemoryAlertSink {
    alerts: Mutex<Vec<PerformanceAlert>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn alerts(&self) -> Vec<PerformanceAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn send(&self, alert: PerformanceAlert) -> Result<(), TuneError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(TuneError::AlertDelivery("watchdog unreachable".into()));
        }
        self.alerts.lock().unwrap().push(alert);
        Ok(())
    }
}
