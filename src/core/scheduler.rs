//! Admission control and cooperative preemption.
//!
//! The scheduler owns the set of live jobs and decides which of them may run
//! at the same time. Jobs fall into three tiers derived from their
//! [`PriorityHints`]:
//!
//! | Tier | Admitted when | Preempts on start |
//! |---|---|---|
//! | speed sensitive | always | running overlapping jobs that are not speed sensitive |
//! | normal | no overlapping running job outside the long-running tier | running overlapping long-running jobs |
//! | long running | no overlapping running job at all | nothing |
//!
//! "Overlapping" means sharing at least one [`Resource`](super::Resource).
//! Preemption moves the victim back to Scheduled; its worker actually stops
//! at its next [`Job::yield_to_scheduler`] call, so for a short while both
//! jobs may be executing.
//!
//! All decisions are made under one lock against a consistent view of the
//! live set. Job listeners are never invoked while that lock is held; the
//! only callbacks made under it are audit sinks and observer channel sends.

use std::fmt;
use std::sync::{Arc, Weak};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{info, warn};

use super::audit::{AuditAction, AuditEvent, AuditSink};
use super::error::SchedulerError;
use super::events::JobEvent;
use super::hints::{PriorityHints, PriorityTier};
use super::job::{Job, JobState};
use super::query;
use crate::config::SchedulerConfig;

/// Notification published to scheduler observers.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A job entered the live set.
    JobAdded(Job),
    /// A job finished and left the live set.
    JobRemoved(Job),
}

/// Jobs whose worker could not be spawned during a pass. They are finished
/// once the lock is released, since finishing re-enters the scheduler.
type FailedStarts = Vec<(Job, SchedulerError)>;

#[derive(Debug, Default)]
struct SchedulerState {
    jobs: Vec<Job>,
}

struct Shared {
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    observers: Mutex<Vec<Sender<SchedulerEvent>>>,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
}

/// Background job scheduler.
///
/// Cloning yields another handle to the same scheduler. There is no global
/// instance; construct one at the application's composition root.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    /// Create a scheduler with the given configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(SchedulerState::default()),
                observers: Mutex::new(Vec::new()),
                audit: Mutex::new(None),
            }),
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        *self.shared.audit.lock() = Some(audit);
        self
    }

    /// Configuration this scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Observe jobs entering and leaving the live set.
    ///
    /// Events are delivered in order on an unbounded channel; dropping the
    /// receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<SchedulerEvent> {
        let (tx, rx) = unbounded();
        self.shared.observers.lock().push(tx);
        rx
    }

    /// Hand a job to the scheduler and start it right away if it is
    /// admissible.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::AlreadyAdded`] if the job is live here
    /// - [`SchedulerError::OwnedByAnotherScheduler`] if it was ever added to
    ///   a scheduler before
    /// - [`SchedulerError::InvalidState`] if it is not in state None
    ///
    /// The live set is unchanged on error.
    pub fn add(&self, job: &Job) -> Result<(), SchedulerError> {
        let failed = {
            let mut state = self.shared.state.lock();
            if query::position(&state.jobs, job).is_some() {
                warn!(job_id = %job.id(), "job added twice");
                return Err(SchedulerError::AlreadyAdded(job.id()));
            }
            if job.has_scheduler() {
                warn!(job_id = %job.id(), "job already owned by a scheduler");
                return Err(SchedulerError::OwnedByAnotherScheduler(job.id()));
            }
            let current = job.state();
            if current != JobState::None {
                warn!(job_id = %job.id(), state = ?current, "job cannot be added");
                return Err(SchedulerError::InvalidState {
                    job: job.id(),
                    state: current,
                });
            }
            if !job.claim_scheduler() {
                return Err(SchedulerError::OwnedByAnotherScheduler(job.id()));
            }

            job.configure_worker(self.shared.config.worker.clone());
            let weak: Weak<Shared> = Arc::downgrade(&self.shared);
            job.subscribe(move |job, event| {
                if event == JobEvent::Finished {
                    if let Some(shared) = weak.upgrade() {
                        shared.on_job_finished(job);
                    }
                }
            });
            if !job.mark_scheduled() {
                // Cancelled directly between the checks above and now.
                return Err(SchedulerError::InvalidState {
                    job: job.id(),
                    state: job.state(),
                });
            }

            state.jobs.push(job.clone());
            info!(
                job_id = %job.id(),
                title = %job.title(),
                hints = %job.priority_hints(),
                live = state.jobs.len(),
                "job added"
            );
            self.shared.record(job, AuditAction::Added);
            self.shared.publish(&SchedulerEvent::JobAdded(job.clone()));

            let mut failed = FailedStarts::new();
            if can_start(&state.jobs, job) {
                if let Err(err) = self.shared.start_job(&state.jobs, job) {
                    failed.push((job.clone(), err));
                }
            }
            failed
        };
        finish_failed(failed);
        Ok(())
    }

    /// Cancel a live job, then rebalance.
    ///
    /// Returns false if the job had already finished.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotOwned`] if the job is not live here.
    pub fn cancel(&self, job: &Job) -> Result<bool, SchedulerError> {
        self.ensure_owned(job)?;
        let cancelled = self.shared.cancel_job(job);
        self.schedule();
        Ok(cancelled)
    }

    /// Pause a live job on behalf of a caller (→ Paused), then rebalance so
    /// its resources can go to someone else.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotOwned`] if the job is not live here.
    pub fn pause(&self, job: &Job) -> Result<bool, SchedulerError> {
        let (paused, failed) = {
            let state = self.shared.state.lock();
            if query::position(&state.jobs, job).is_none() {
                return Err(SchedulerError::NotOwned(job.id()));
            }
            let paused = job.pause(true);
            if paused {
                info!(job_id = %job.id(), "job paused");
                self.shared.record(job, AuditAction::Paused);
            }
            (paused, self.shared.schedule_locked(&state))
        };
        finish_failed(failed);
        Ok(paused)
    }

    /// Hand a paused job back to the scheduler. It is admitted immediately
    /// if possible and otherwise waits as Scheduled.
    ///
    /// Returns false if the job was not paused.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotOwned`] if the job is not live here.
    pub fn resume(&self, job: &Job) -> Result<bool, SchedulerError> {
        let failed = {
            let state = self.shared.state.lock();
            if query::position(&state.jobs, job).is_none() {
                return Err(SchedulerError::NotOwned(job.id()));
            }
            if !job.requeue() {
                return Ok(false);
            }
            info!(job_id = %job.id(), "job resumed");
            self.shared.record(job, AuditAction::Resumed);

            let mut failed = FailedStarts::new();
            if can_start(&state.jobs, job) {
                if let Err(err) = self.shared.start_job(&state.jobs, job) {
                    failed.push((job.clone(), err));
                }
            }
            failed.extend(self.shared.schedule_locked(&state));
            failed
        };
        finish_failed(failed);
        Ok(true)
    }

    /// Cancel every live job. Jobs hinted
    /// [`PriorityHints::DATA_LOSS_IF_STOPPED`] are skipped unless
    /// `even_data_loss_jobs` is set. Returns how many jobs were cancelled.
    pub fn cancel_all(&self, even_data_loss_jobs: bool) -> usize {
        let targets: Vec<Job> = {
            let state = self.shared.state.lock();
            state
                .jobs
                .iter()
                .filter(|job| even_data_loss_jobs || !job.has(PriorityHints::DATA_LOSS_IF_STOPPED))
                .cloned()
                .collect()
        };
        let cancelled = targets.iter().filter(|job| self.shared.cancel_job(job)).count();
        info!(cancelled, even_data_loss_jobs, "cancelled all jobs");
        self.schedule();
        cancelled
    }

    /// Global rebalancing pass: admit every admissible non-long-running job,
    /// then every admissible long-running one.
    pub fn schedule(&self) {
        let failed = {
            let state = self.shared.state.lock();
            self.shared.schedule_locked(&state)
        };
        finish_failed(failed);
    }

    /// True iff any live, unfinished job is hinted
    /// [`PriorityHints::DATA_LOSS_IF_STOPPED`].
    #[must_use]
    pub fn has_any_data_loss_jobs(&self) -> bool {
        let state = self.shared.state.lock();
        let any = query::with_hints(&state.jobs, PriorityHints::DATA_LOSS_IF_STOPPED).any(|job| !job.is_finished());
        any
    }

    /// Snapshot of the live set.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.shared.state.lock().jobs.clone()
    }

    /// Number of live jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.shared.state.lock().jobs.len()
    }

    /// True if the job is live in this scheduler.
    #[must_use]
    pub fn contains(&self, job: &Job) -> bool {
        query::position(&self.shared.state.lock().jobs, job).is_some()
    }

    /// Whether `job` would be admitted right now.
    #[must_use]
    pub fn can_start(&self, job: &Job) -> bool {
        can_start(&self.shared.state.lock().jobs, job)
    }

    /// Running jobs that starting `job` right now would preempt.
    #[must_use]
    pub fn conflicting_jobs(&self, job: &Job) -> Vec<Job> {
        conflicting_jobs(&self.shared.state.lock().jobs, job)
    }

    fn ensure_owned(&self, job: &Job) -> Result<(), SchedulerError> {
        if self.contains(job) {
            Ok(())
        } else {
            Err(SchedulerError::NotOwned(job.id()))
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.shared.config)
            .field("jobs", &self.shared.state.lock().jobs)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn record(&self, job: &Job, action: AuditAction) {
        if let Some(sink) = self.audit.lock().as_mut() {
            sink.record(AuditEvent::new(job, action));
        }
    }

    fn publish(&self, event: &SchedulerEvent) {
        self.observers.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Called without the state lock: cancelling an idle job finishes it,
    /// which re-enters [`Shared::on_job_finished`].
    fn cancel_job(&self, job: &Job) -> bool {
        if job.is_finished() {
            return false;
        }
        self.record(job, AuditAction::Cancelled);
        let cancelled = job.cancel();
        if cancelled {
            info!(job_id = %job.id(), "job cancelled");
        }
        cancelled
    }

    /// Preempt whatever `job` conflicts with, then start it.
    fn start_job(&self, jobs: &[Job], job: &Job) -> Result<bool, SchedulerError> {
        for victim in conflicting_jobs(jobs, job) {
            if victim.pause(false) {
                info!(job_id = %victim.id(), by = %job.id(), "job preempted");
                self.record(&victim, AuditAction::Preempted);
            }
        }
        let started = job.try_start()?;
        if started {
            info!(job_id = %job.id(), tier = ?job.priority_hints().tier(), "job started");
            self.record(job, AuditAction::Started);
        }
        Ok(started)
    }

    fn schedule_locked(&self, state: &SchedulerState) -> FailedStarts {
        let mut failed = FailedStarts::new();
        for long_running_pass in [false, true] {
            let candidates: Vec<Job> = query::in_state(&state.jobs, JobState::Scheduled)
                .filter(|job| (job.priority_hints().tier() == PriorityTier::LongRunning) == long_running_pass)
                .cloned()
                .collect();
            for job in candidates {
                if can_start(&state.jobs, &job) {
                    if let Err(err) = self.start_job(&state.jobs, &job) {
                        failed.push((job, err));
                    }
                }
            }
        }
        failed
    }

    fn on_job_finished(&self, job: &Job) {
        let failed = {
            let mut state = self.state.lock();
            let Some(index) = query::position(&state.jobs, job) else {
                return;
            };
            state.jobs.remove(index);
            info!(job_id = %job.id(), state = ?job.state(), live = state.jobs.len(), "job removed");
            self.record(job, AuditAction::Removed);
            self.publish(&SchedulerEvent::JobRemoved(job.clone()));
            self.schedule_locked(&state)
        };
        finish_failed(failed);
    }
}

fn finish_failed(failed: FailedStarts) {
    for (job, err) in failed {
        job.fail_to_start(&err);
    }
}

/// Admission predicate. Only Scheduled jobs are admissible.
fn can_start(jobs: &[Job], job: &Job) -> bool {
    if job.state() != JobState::Scheduled {
        return false;
    }
    match job.priority_hints().tier() {
        PriorityTier::SpeedSensitive => true,
        PriorityTier::Normal => {
            !query::running_overlapping(jobs, job).any(|other| other.priority_hints().tier() != PriorityTier::LongRunning)
        }
        PriorityTier::LongRunning => query::running_overlapping(jobs, job).next().is_none(),
    }
}

/// Running jobs that must be preempted before `job` starts.
fn conflicting_jobs(jobs: &[Job], job: &Job) -> Vec<Job> {
    let victim_tier = |other: &Job| other.priority_hints().tier();
    match job.priority_hints().tier() {
        PriorityTier::SpeedSensitive => query::running_overlapping(jobs, job)
            .filter(|other| victim_tier(other) != PriorityTier::SpeedSensitive)
            .cloned()
            .collect(),
        PriorityTier::Normal => query::running_overlapping(jobs, job)
            .filter(|other| victim_tier(other) == PriorityTier::LongRunning)
            .cloned()
            .collect(),
        PriorityTier::LongRunning => Vec::new(),
    }
}
