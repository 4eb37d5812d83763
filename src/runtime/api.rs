//! Serializable views for progress surfaces.
//!
//! A progress UI typically subscribes to [`Scheduler::subscribe`], attaches a
//! job listener on `JobAdded`, and renders [`JobSnapshot`]s.

use serde::{Deserialize, Serialize};

use crate::core::{Job, JobId, JobState, PriorityHints, PriorityTier, Scheduler};

/// Point-in-time view of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job identifier.
    pub id: JobId,
    /// Display title.
    pub title: String,
    /// Status line.
    pub status: String,
    /// Progress in `[0.0, 1.0]`.
    pub progress: f64,
    /// Lifecycle state.
    pub state: JobState,
    /// Priority hints.
    pub hints: PriorityHints,
    /// Tier derived from the hints.
    pub tier: PriorityTier,
    /// Resource ids the job needs.
    pub resources: Vec<String>,
    /// Icon names.
    pub icon_names: Vec<String>,
    /// Whether cancellation should be offered.
    pub can_cancel: bool,
    /// Whether the job is a background job.
    pub is_background: bool,
    /// Cancellation confirmation message.
    pub cancel_message: Option<String>,
    /// Failure reported by the body, if any.
    pub failure: Option<String>,
    /// Creation time in milliseconds since epoch.
    pub created_at_ms: u128,
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id(),
            title: job.title(),
            status: job.status(),
            progress: job.progress(),
            state: job.state(),
            hints: job.priority_hints(),
            tier: job.priority_hints().tier(),
            resources: job.resources().iter().map(|r| r.id().to_string()).collect(),
            icon_names: job.icon_names(),
            can_cancel: job.can_cancel(),
            is_background: job.is_background(),
            cancel_message: job.cancel_message(),
            failure: job.failure(),
            created_at_ms: job.created_at_ms(),
        }
    }
}

/// Point-in-time view of a scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// Every live job.
    pub jobs: Vec<JobSnapshot>,
    /// Jobs currently Running.
    pub running: usize,
    /// Jobs waiting as Scheduled.
    pub scheduled: usize,
    /// Jobs paused by a caller.
    pub paused: usize,
    /// Whether shutting down now would lose user data.
    pub has_data_loss_jobs: bool,
}

/// Capture the scheduler's live set.
#[must_use]
pub fn snapshot(scheduler: &Scheduler) -> SchedulerSnapshot {
    let jobs: Vec<JobSnapshot> = scheduler.jobs().iter().map(JobSnapshot::from).collect();
    let count = |state: JobState| jobs.iter().filter(|j| j.state == state).count();
    SchedulerSnapshot {
        running: count(JobState::Running),
        scheduled: count(JobState::Scheduled),
        paused: count(JobState::Paused),
        has_data_loss_jobs: jobs
            .iter()
            .any(|j| !j.state.is_finished() && j.hints.contains(PriorityHints::DATA_LOSS_IF_STOPPED)),
        jobs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AppResult, Resource};

    #[test]
    fn test_job_snapshot_serializes() {
        let job = Job::builder("Thumbnails")
            .with_status("queued")
            .with_hints(PriorityHints::LONG_RUNNING)
            .with_resource(Resource::cpu())
            .build(|_: &Job| -> AppResult<()> { Ok(()) });
        job.set_progress(0.5);

        let snap = JobSnapshot::from(&job);
        assert_eq!(snap.tier, PriorityTier::LongRunning);
        assert_eq!(snap.resources, vec!["cpu".to_string()]);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "none");
        assert_eq!(json["tier"], "long_running");
        assert_eq!(json["progress"], 0.5);
        assert_eq!(json["hints"], 4);
        assert_eq!(snap.created_at_ms, job.created_at_ms());
        assert!(snap.created_at_ms > 0);
    }

    #[test]
    fn test_empty_scheduler_snapshot() {
        let snap = snapshot(&Scheduler::default());
        assert!(snap.jobs.is_empty());
        assert_eq!(snap.running + snap.scheduled + snap.paused, 0);
        assert!(!snap.has_data_loss_jobs);
    }
}
