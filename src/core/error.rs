//! Error types for scheduler operations.

use thiserror::Error;

use super::job::{JobId, JobState};

/// Errors produced by scheduler components.
///
/// All of these report caller misuse; the scheduler's live set is left
/// untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The job is already live in this scheduler.
    #[error("job {0} already added to this scheduler")]
    AlreadyAdded(JobId),
    /// The job was handed to a scheduler before and cannot be added again.
    #[error("job {0} is owned by another scheduler")]
    OwnedByAnotherScheduler(JobId),
    /// The job is not live in this scheduler.
    #[error("job {0} is not owned by this scheduler")]
    NotOwned(JobId),
    /// The operation is not valid from the job's current state.
    #[error("job {job} cannot do that from state {state:?}")]
    InvalidState {
        /// Job the operation was attempted on.
        job: JobId,
        /// State the job was in.
        state: JobState,
    },
    /// The dedicated worker thread could not be spawned.
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reason a job body was interrupted at its checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    /// Cooperative cancellation was requested.
    #[error("job cancelled")]
    Cancelled,
    /// The worker was forcibly torn down.
    #[error("job aborted")]
    Aborted,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
