//! Decision-event log source abstraction.
//!
//! Production code plugs in whatever backs the decision system's event
//! log; tests and embedded simulations use `MemoryEventLog` with
//! pre-loaded records and injectable failures.

use adaptune_common::TuneError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A reviewed automated decision from the feedback stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    /// What the human operator did with the decision ("accepted",
    /// "rejected", or a free-form override).
    pub operator_action: String,
    /// Model confidence attached to the decision, [0, 1].
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

/// An autonomously executed decision from the action stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Execution outcome ("success", "failed", ...).
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Read-only view of the decision system's outcome log.
#[async_trait]
pub trait EventLogSource: Send + Sync {
    /// Feedback-stream records with `created_at >= since`.
    async fn feedback_events(&self, since: DateTime<Utc>)
        -> Result<Vec<FeedbackEvent>, TuneError>;

    /// Action-stream records with `created_at >= since`.
    async fn action_events(&self, since: DateTime<Utc>) -> Result<Vec<ActionEvent>, TuneError>;
}

/// In-memory event log for tests and embedded hosts.
#[derive(Default)]
pub struct MemoryEventLog {
    feedback: Mutex<Vec<FeedbackEvent>>,
    actions: Mutex<Vec<ActionEvent>>,
    fail_feedback: AtomicBool,
    fail_actions: AtomicBool,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_feedback(&self, event: FeedbackEvent) {
        self.feedback.lock().unwrap().push(event);
    }

    pub fn push_action(&self, event: ActionEvent) {
        self.actions.lock().unwrap().push(event);
    }

    /// Make subsequent feedback queries fail, to exercise degradation.
    pub fn set_fail_feedback(&self, fail: bool) {
        self.fail_feedback.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent action queries fail.
    pub fn set_fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventLogSource for MemoryEventLog {
    async fn feedback_events(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedbackEvent>, TuneError> {
        if self.fail_feedback.load(Ordering::SeqCst) {
            return Err(TuneError::LogFetch("feedback stream unavailable".into()));
        }
        Ok(self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.created_at >= since)
            .cloned()
            .collect())
    }

    async fn action_events(&self, since: DateTime<Utc>) -> Result<Vec<ActionEvent>, TuneError> {
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(TuneError::LogFetch("action stream unavailable".into()));
        }
        Ok(self
            .actions
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.created_at >= since)
            .cloned()
            .collect())
    }
}
