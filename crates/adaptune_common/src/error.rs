//! Error taxonomy for the tuning engine.
//!
//! Nothing here is fatal to the host: every variant degrades to a safe
//! default at the cycle boundary and is surfaced through logging plus the
//! engine's failure counters.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TuneError {
    /// Event-log query failed; the affected stream contributes its
    /// documented default values instead.
    #[error("event log fetch failed: {0}")]
    LogFetch(String),

    /// Key-value store load/save failed. Loads fall back to defaults;
    /// after a failed save the in-memory state stays authoritative until
    /// the next successful save.
    #[error("persistence failed for key '{key}': {reason}")]
    Persistence { key: String, reason: String },

    /// Alert sink unreachable; the audit record is still ledgered.
    #[error("alert delivery failed: {0}")]
    AlertDelivery(String),

    /// External call exceeded its bounded timeout.
    #[error("external call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
