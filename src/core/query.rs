//! Predicates and filters the scheduler uses to partition its jobs.

use super::hints::PriorityHints;
use super::job::{Job, JobState};

/// True if the two jobs declare at least one common resource.
#[must_use]
pub fn shares_resource(a: &Job, b: &Job) -> bool {
    a.resources().iter().any(|r| b.resources().contains(r))
}

/// Jobs in `state`.
pub fn in_state<'a>(jobs: &'a [Job], state: JobState) -> impl Iterator<Item = &'a Job> + 'a {
    jobs.iter().filter(move |job| job.state() == state)
}

/// Jobs carrying every bit of `hints`.
pub fn with_hints<'a>(jobs: &'a [Job], hints: PriorityHints) -> impl Iterator<Item = &'a Job> + 'a {
    jobs.iter().filter(move |job| job.has(hints))
}

/// Running jobs other than `job` that share a resource with it.
pub fn running_overlapping<'a>(jobs: &'a [Job], job: &'a Job) -> impl Iterator<Item = &'a Job> + 'a {
    in_state(jobs, JobState::Running).filter(move |other| !other.ptr_eq(job) && shares_resource(job, other))
}

/// Index of `job` in `jobs`, by identity.
#[must_use]
pub fn position(jobs: &[Job], job: &Job) -> Option<usize> {
    jobs.iter().position(|j| j.ptr_eq(job))
}
