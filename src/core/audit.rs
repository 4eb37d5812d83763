//! Audit sink implementations.
//!
//! A scheduler with an attached sink records every admission, preemption and
//! removal decision it makes. Sinks are called while the scheduler holds its
//! lock, so `record` must be quick and must not call back into the scheduler.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{Job, JobId};
use crate::util::clock::now_ms;

/// Scheduler decision being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Job accepted into the live set.
    Added,
    /// Job admitted and running.
    Started,
    /// Running job returned to Scheduled to free a resource.
    Preempted,
    /// Job paused by a caller.
    Paused,
    /// Paused job handed back to the scheduler.
    Resumed,
    /// Cancellation requested through the scheduler.
    Cancelled,
    /// Job finished and left the live set.
    Removed,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: Uuid,
    /// Related job.
    pub job_id: JobId,
    /// Job title at the time of the event.
    pub title: String,
    /// Decision taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl AuditEvent {
    /// Build an event for `job` stamped with the current time.
    #[must_use]
    pub fn new(job: &Job, action: AuditAction) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            job_id: job.id(),
            title: job.title(),
            action,
            created_at_ms: now_ms(),
        }
    }
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Bounded in-memory audit sink. Clones share the same buffer, so a caller
/// can keep one clone to read back what the scheduler recorded.
#[derive(Debug, Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Actions recorded for one job, oldest first.
    #[must_use]
    pub fn actions_for(&self, job: JobId) -> Vec<AuditAction> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.job_id == job)
            .map(|e| e.action)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}
