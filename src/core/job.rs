//! The job state machine.
//!
//! A [`Job`] is a shared handle to one schedulable unit of work. Its run body
//! executes on a dedicated worker (see [`super::runner`]) and cooperates with
//! the scheduler through a single checkpoint, [`Job::yield_to_scheduler`]:
//!
//! ```rust,ignore
//! let job = Job::builder("Export library")
//!     .with_hints(PriorityHints::LONG_RUNNING)
//!     .with_resource(Resource::disk())
//!     .build(|job: &Job| {
//!         for (i, item) in items.iter().enumerate() {
//!             job.yield_to_scheduler()?;
//!             export(item)?;
//!             job.set_progress(i as f64 / items.len() as f64);
//!         }
//!         Ok(())
//!     });
//! ```
//!
//! Suspension is strictly cooperative. A body that runs for a long time
//! without reaching the checkpoint cannot be preempted, paused or cancelled
//! until it does.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::error::{Interrupted, SchedulerError};
use super::events::{JobEvent, Listeners, SubscriptionId};
use super::hints::PriorityHints;
use super::resource::Resource;
use super::runner::{JobRunner, JobWork};
use crate::config::WorkerConfig;
use crate::util::clock::now_ms;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub(crate) u64);

impl JobId {
    fn next() -> Self {
        Self(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Not yet handed to a scheduler.
    None,
    /// Owned by a scheduler and waiting for admission, or preempted.
    Scheduled,
    /// Actively executing.
    Running,
    /// Withdrawn from scheduling by a caller.
    Paused,
    /// Terminal: cancellation was requested.
    Cancelled,
    /// Terminal: the body finished.
    Completed,
}

impl JobState {
    /// True for the two terminal states.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// Display metadata, guarded separately from the control block.
#[derive(Debug)]
struct Meta {
    title: String,
    status: String,
    progress: f64,
    icon_names: Vec<String>,
    cancel_message: Option<String>,
    failure: Option<String>,
    freeze_depth: u32,
    update_pending: bool,
}

/// State machine fields; every transition happens under this lock.
#[derive(Debug)]
struct Control {
    state: JobState,
    cancel_requested: bool,
    aborted: bool,
    worker_started: bool,
    finished_fired: bool,
}

struct JobInner {
    id: JobId,
    hints: PriorityHints,
    resources: Vec<Resource>,
    can_cancel: bool,
    is_background: bool,
    created_at_ms: u128,
    meta: Mutex<Meta>,
    control: Mutex<Control>,
    /// Suspend gate. Workers wait here while the state is Scheduled or Paused.
    gate: Condvar,
    has_scheduler: AtomicBool,
    listeners: Listeners,
    runner: JobRunner,
}

/// Shared handle to a schedulable unit of work.
///
/// Cloning is cheap and every clone refers to the same job. Jobs are not
/// value-comparable; use [`Job::id`] or [`Job::ptr_eq`].
#[derive(Clone)]
pub struct Job {
    inner: Arc<JobInner>,
}

fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl Job {
    /// Start building a job with the given title.
    pub fn builder(title: impl Into<String>) -> JobBuilder {
        JobBuilder::new(title)
    }

    /// Identifier, unique within the process.
    #[must_use]
    pub fn id(&self) -> JobId {
        self.inner.id
    }

    /// True if both handles refer to the same job.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> JobState {
        self.inner.control.lock().state
    }

    /// True once the job is Cancelled or Completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// True once cancellation has been requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.inner.control.lock().cancel_requested
    }

    /// True if the job has ever been handed to a scheduler.
    #[must_use]
    pub fn has_scheduler(&self) -> bool {
        self.inner.has_scheduler.load(Ordering::Acquire)
    }

    /// Priority hints attached at construction.
    #[must_use]
    pub fn priority_hints(&self) -> PriorityHints {
        self.inner.hints
    }

    /// True iff every bit of `hints` is set on this job.
    #[must_use]
    pub fn has(&self, hints: PriorityHints) -> bool {
        self.inner.hints.contains(hints)
    }

    /// Resources the job needs.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.inner.resources
    }

    /// Whether a UI should offer to cancel the job.
    #[must_use]
    pub fn can_cancel(&self) -> bool {
        self.inner.can_cancel
    }

    /// Whether the job runs without a visible progress surface.
    #[must_use]
    pub fn is_background(&self) -> bool {
        self.inner.is_background
    }

    /// Creation timestamp in milliseconds since epoch.
    #[must_use]
    pub fn created_at_ms(&self) -> u128 {
        self.inner.created_at_ms
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> String {
        self.inner.meta.lock().title.clone()
    }

    /// Free-text status line.
    #[must_use]
    pub fn status(&self) -> String {
        self.inner.meta.lock().status.clone()
    }

    /// Progress in `[0.0, 1.0]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.inner.meta.lock().progress
    }

    /// Icon names for progress surfaces.
    #[must_use]
    pub fn icon_names(&self) -> Vec<String> {
        self.inner.meta.lock().icon_names.clone()
    }

    /// Message shown when asking the user to confirm cancellation.
    #[must_use]
    pub fn cancel_message(&self) -> Option<String> {
        self.inner.meta.lock().cancel_message.clone()
    }

    /// Last error reported by the run body, if it failed.
    ///
    /// Failure is not a state of its own: a failed job still finishes as
    /// Completed (or Cancelled).
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        self.inner.meta.lock().failure.clone()
    }

    /// Attach a listener for this job's notifications.
    ///
    /// Listeners run on whichever thread fired the event and must not block.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Self, JobEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(listener))
    }

    /// Detach a listener. Returns false if it was not attached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.remove(id)
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    fn mutate_meta(&self, f: impl FnOnce(&mut Meta)) {
        let fire = {
            let mut meta = self.inner.meta.lock();
            f(&mut meta);
            if meta.freeze_depth > 0 {
                meta.update_pending = true;
                false
            } else {
                true
            }
        };
        if fire {
            self.inner.listeners.emit(self, JobEvent::Updated);
        }
    }

    /// Set title, status and progress together, firing one `Updated`.
    pub fn update(&self, title: impl Into<String>, status: impl Into<String>, progress: f64) {
        let (title, status) = (title.into(), status.into());
        self.mutate_meta(|meta| {
            meta.title = title;
            meta.status = status;
            meta.progress = clamp_progress(progress);
        });
    }

    /// Set the display title.
    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.mutate_meta(|meta| meta.title = title);
    }

    /// Set the status line.
    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.mutate_meta(|meta| meta.status = status);
    }

    /// Set progress; the stored value is clamped to `[0.0, 1.0]`.
    pub fn set_progress(&self, progress: f64) {
        self.mutate_meta(|meta| meta.progress = clamp_progress(progress));
    }

    /// Replace the icon names.
    pub fn set_icon_names(&self, icon_names: Vec<String>) {
        self.mutate_meta(|meta| meta.icon_names = icon_names);
    }

    /// Set the cancellation confirmation message.
    pub fn set_cancel_message(&self, message: Option<String>) {
        self.mutate_meta(|meta| meta.cancel_message = message);
    }

    /// Suppress `Updated` notifications until the matching [`Job::thaw_updates`].
    /// Calls nest.
    pub fn freeze_updates(&self) {
        self.inner.meta.lock().freeze_depth += 1;
    }

    /// Undo one [`Job::freeze_updates`]. When the last freeze is released and
    /// anything changed meanwhile, a single `Updated` fires.
    pub fn thaw_updates(&self) {
        let fire = {
            let mut meta = self.inner.meta.lock();
            meta.freeze_depth = meta.freeze_depth.saturating_sub(1);
            if meta.freeze_depth == 0 && meta.update_pending {
                meta.update_pending = false;
                true
            } else {
                false
            }
        };
        if fire {
            self.inner.listeners.emit(self, JobEvent::Updated);
        }
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    /// Run the job: Scheduled or Paused → Running.
    ///
    /// Releases a worker blocked at the checkpoint, or spawns the worker on
    /// first start. Returns false (and does nothing) from any other state.
    /// If the worker cannot be spawned the failure is recorded and the job
    /// finishes.
    pub fn start(&self) -> bool {
        match self.try_start() {
            Ok(started) => started,
            Err(err) => {
                self.fail_to_start(&err);
                false
            }
        }
    }

    /// Like [`Job::start`] but reports a spawn failure instead of finishing
    /// the job, so callers holding a lock can finish it later.
    pub(crate) fn try_start(&self) -> Result<bool, SchedulerError> {
        let spawn = {
            let mut control = self.inner.control.lock();
            if !matches!(control.state, JobState::Scheduled | JobState::Paused) {
                debug!(job_id = %self.id(), state = ?control.state, "start ignored");
                return Ok(false);
            }
            control.state = JobState::Running;
            self.inner.gate.notify_all();
            let spawn = !control.worker_started;
            control.worker_started = true;
            spawn
        };
        debug!(job_id = %self.id(), "job running");
        if spawn {
            self.inner.runner.spawn(self)?;
        }
        Ok(true)
    }

    pub(crate) fn fail_to_start(&self, err: &SchedulerError) {
        error!(job_id = %self.id(), error = %err, "job could not start");
        self.record_failure(err.to_string());
        self.finish();
    }

    /// Withdraw the job from running.
    ///
    /// `unschedule = true` is a user pause (→ Paused); `false` is a scheduler
    /// preemption (→ Scheduled). Either way the suspend gate is re-armed and
    /// the worker blocks at its next checkpoint. Returns whether the
    /// transition happened. Jobs that were never scheduled or are finished
    /// are left alone, and a preemption never undoes a user pause.
    pub fn pause(&self, unschedule: bool) -> bool {
        let mut control = self.inner.control.lock();
        let target = if unschedule {
            JobState::Paused
        } else {
            JobState::Scheduled
        };
        let current = control.state;
        if current.is_finished()
            || current == JobState::None
            || current == target
            || (current == JobState::Paused && !unschedule)
        {
            debug!(job_id = %self.id(), state = ?current, unschedule, "pause ignored");
            return false;
        }
        control.state = target;
        debug!(job_id = %self.id(), state = ?control.state, "job suspended");
        true
    }

    /// Request cooperative cancellation.
    ///
    /// Sets the cancel flag, moves the job to Cancelled and fires
    /// `CancelRequested`. A worker blocked at its checkpoint is woken and
    /// sees [`Interrupted::Cancelled`]. The worker is never forcibly stopped.
    /// A job whose body never started finishes right away.
    pub fn cancel(&self) -> bool {
        let finish_now = {
            let mut control = self.inner.control.lock();
            if control.state.is_finished() {
                debug!(job_id = %self.id(), state = ?control.state, "cancel ignored");
                return false;
            }
            control.cancel_requested = true;
            control.state = JobState::Cancelled;
            self.inner.gate.notify_all();
            !control.worker_started
        };
        debug!(job_id = %self.id(), "cancel requested");
        self.inner.listeners.emit(self, JobEvent::CancelRequested);
        if finish_now {
            self.finish();
        }
        true
    }

    /// Checkpoint for the run body.
    ///
    /// Blocks while the job is Scheduled or Paused and returns once it is
    /// started again. Returns an error as soon as the job is cancelled or
    /// aborted so bodies can bail out with `?`.
    ///
    /// # Errors
    ///
    /// [`Interrupted::Cancelled`] after [`Job::cancel`],
    /// [`Interrupted::Aborted`] after [`Job::abort`].
    pub fn yield_to_scheduler(&self) -> Result<(), Interrupted> {
        let mut control = self.inner.control.lock();
        let mut suspended = false;
        loop {
            if control.aborted {
                return Err(Interrupted::Aborted);
            }
            if control.cancel_requested {
                return Err(Interrupted::Cancelled);
            }
            match control.state {
                JobState::Scheduled | JobState::Paused => {
                    if !suspended {
                        debug!(job_id = %self.id(), state = ?control.state, "worker suspended at checkpoint");
                        suspended = true;
                    }
                    self.inner.gate.wait(&mut control);
                }
                _ => {
                    if suspended {
                        debug!(job_id = %self.id(), "worker resumed");
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Signal the end of the work. Called once by the runner when the body
    /// returns; calling it from the body first is harmless.
    ///
    /// Moves the job to Completed unless it was Cancelled and fires
    /// `Finished`. Returns false if the job had already finished.
    pub fn finish(&self) -> bool {
        let state = {
            let mut control = self.inner.control.lock();
            if control.finished_fired {
                return false;
            }
            control.finished_fired = true;
            if control.state != JobState::Cancelled {
                control.state = JobState::Completed;
            }
            self.inner.gate.notify_all();
            control.state
        };
        debug!(job_id = %self.id(), state = ?state, "job finished");
        self.inner.listeners.emit(self, JobEvent::Finished);
        true
    }

    /// Forcibly tear the job down.
    ///
    /// Unlike [`Job::cancel`] this does not wait for the body: the job is
    /// finished immediately (so a scheduler frees its resources) and the
    /// worker thread is detached. The body sees [`Interrupted::Aborted`] at
    /// its next checkpoint; until then it keeps running unobserved.
    pub fn abort(&self) -> bool {
        {
            let mut control = self.inner.control.lock();
            if control.finished_fired {
                return false;
            }
            control.aborted = true;
            control.cancel_requested = true;
            control.state = JobState::Cancelled;
            self.inner.gate.notify_all();
        }
        warn!(job_id = %self.id(), "job aborted");
        self.inner.runner.detach();
        self.inner.listeners.emit(self, JobEvent::CancelRequested);
        self.finish();
        true
    }

    /// Wait for the worker thread to exit.
    ///
    /// Returns true if there is no worker or it exited within `timeout`.
    #[must_use]
    pub fn join_worker(&self, timeout: Duration) -> bool {
        self.inner.runner.join(timeout)
    }

    // ------------------------------------------------------------------
    // Scheduler hooks
    // ------------------------------------------------------------------

    /// Claim ownership for a scheduler. Succeeds at most once per job.
    pub(crate) fn claim_scheduler(&self) -> bool {
        self.inner
            .has_scheduler
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// None → Scheduled on admission to a scheduler.
    pub(crate) fn mark_scheduled(&self) -> bool {
        let mut control = self.inner.control.lock();
        if control.state != JobState::None {
            return false;
        }
        control.state = JobState::Scheduled;
        true
    }

    /// Paused → Scheduled when a caller resumes the job.
    pub(crate) fn requeue(&self) -> bool {
        let mut control = self.inner.control.lock();
        if control.state != JobState::Paused {
            return false;
        }
        control.state = JobState::Scheduled;
        true
    }

    pub(crate) fn configure_worker(&self, config: WorkerConfig) {
        self.inner.runner.configure(config);
    }

    pub(crate) fn record_failure(&self, message: String) {
        self.mutate_meta(|meta| meta.failure = Some(message));
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.inner.id)
            .field("title", &self.title())
            .field("state", &self.state())
            .field("hints", &self.inner.hints)
            .field("resources", &self.inner.resources)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Job`].
#[derive(Debug)]
pub struct JobBuilder {
    title: String,
    status: String,
    hints: PriorityHints,
    resources: Vec<Resource>,
    icon_names: Vec<String>,
    can_cancel: bool,
    is_background: bool,
    cancel_message: Option<String>,
}

impl JobBuilder {
    /// Create a builder with defaults: no hints, no resources, cancellable.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: String::new(),
            hints: PriorityHints::NONE,
            resources: Vec::new(),
            icon_names: Vec::new(),
            can_cancel: true,
            is_background: false,
            cancel_message: None,
        }
    }

    /// Set the initial status line.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Add priority hints.
    #[must_use]
    pub fn with_hints(mut self, hints: PriorityHints) -> Self {
        self.hints |= hints;
        self
    }

    /// Declare a needed resource. Duplicates are ignored.
    #[must_use]
    pub fn with_resource(mut self, resource: Resource) -> Self {
        if !self.resources.contains(&resource) {
            self.resources.push(resource);
        }
        self
    }

    /// Declare several needed resources.
    #[must_use]
    pub fn with_resources(self, resources: impl IntoIterator<Item = Resource>) -> Self {
        resources.into_iter().fold(self, Self::with_resource)
    }

    /// Add an icon name.
    #[must_use]
    pub fn with_icon_name(mut self, icon: impl Into<String>) -> Self {
        self.icon_names.push(icon.into());
        self
    }

    /// Whether a UI should offer cancellation.
    #[must_use]
    pub const fn with_can_cancel(mut self, can_cancel: bool) -> Self {
        self.can_cancel = can_cancel;
        self
    }

    /// Mark as a background job.
    #[must_use]
    pub const fn with_background(mut self, is_background: bool) -> Self {
        self.is_background = is_background;
        self
    }

    /// Set the cancellation confirmation message.
    #[must_use]
    pub fn with_cancel_message(mut self, message: impl Into<String>) -> Self {
        self.cancel_message = Some(message.into());
        self
    }

    /// Finish building with the given run body.
    pub fn build<W: JobWork>(self, work: W) -> Job {
        self.build_boxed(Box::new(work))
    }

    pub(crate) fn build_boxed(self, work: Box<dyn JobWork>) -> Job {
        let inner = JobInner {
            id: JobId::next(),
            hints: self.hints,
            resources: self.resources,
            can_cancel: self.can_cancel,
            is_background: self.is_background,
            created_at_ms: now_ms(),
            meta: Mutex::new(Meta {
                title: self.title,
                status: self.status,
                progress: 0.0,
                icon_names: self.icon_names,
                cancel_message: self.cancel_message,
                failure: None,
                freeze_depth: 0,
                update_pending: false,
            }),
            control: Mutex::new(Control {
                state: JobState::None,
                cancel_requested: false,
                aborted: false,
                worker_started: false,
                finished_fired: false,
            }),
            gate: Condvar::new(),
            has_scheduler: AtomicBool::new(false),
            listeners: Listeners::default(),
            runner: JobRunner::new(work),
        };
        Job {
            inner: Arc::new(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AppResult;
    use std::sync::atomic::AtomicUsize;

    fn idle_job() -> Job {
        Job::builder("idle").build(|_: &Job| -> AppResult<()> { Ok(()) })
    }

    fn counting(job: &Job) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let updated = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (u, f) = (Arc::clone(&updated), Arc::clone(&finished));
        job.subscribe(move |_, event| match event {
            JobEvent::Updated => {
                u.fetch_add(1, Ordering::SeqCst);
            }
            JobEvent::Finished => {
                f.fetch_add(1, Ordering::SeqCst);
            }
            JobEvent::CancelRequested => {}
        });
        (updated, finished)
    }

    #[test]
    fn test_progress_is_clamped() {
        let job = idle_job();
        for (input, expected) in [(-3.0, 0.0), (0.25, 0.25), (1.0, 1.0), (7.5, 1.0), (f64::NAN, 0.0)] {
            job.set_progress(input);
            assert!((job.progress() - expected).abs() < f64::EPSILON, "{input} -> {}", job.progress());
        }
        job.update("t", "s", f64::INFINITY);
        assert!((job.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_start_requires_scheduled_or_paused() {
        let job = idle_job();
        assert!(!job.start());
        assert_eq!(job.state(), JobState::None);
        assert!(!job.pause(true));
    }

    #[test]
    fn test_pause_modes() {
        let job = idle_job();
        assert!(job.mark_scheduled());
        assert!(!job.pause(false), "already scheduled");
        assert!(job.pause(true));
        assert_eq!(job.state(), JobState::Paused);
        assert!(!job.pause(true), "already paused");
        assert!(!job.pause(false), "preemption keeps a user pause");
        assert_eq!(job.state(), JobState::Paused);
        assert!(job.requeue());
        assert_eq!(job.state(), JobState::Scheduled);
    }

    #[test]
    fn test_pause_running_job() {
        let job = idle_job();
        job.mark_scheduled();
        job.inner.control.lock().state = JobState::Running;
        assert!(job.pause(false));
        assert_eq!(job.state(), JobState::Scheduled);

        job.inner.control.lock().state = JobState::Running;
        assert!(job.pause(true));
        assert_eq!(job.state(), JobState::Paused);
    }

    #[test]
    fn test_cancel_unstarted_job_finishes_once() {
        let job = idle_job();
        let (_, finished) = counting(&job);
        job.mark_scheduled();
        assert!(job.cancel());
        assert_eq!(job.state(), JobState::Cancelled);
        assert!(job.is_cancel_requested());
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        assert!(!job.cancel());
        assert!(!job.finish());
        assert!(!job.start());
        assert!(!job.pause(false));
        assert_eq!(job.state(), JobState::Cancelled);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finish_completes_unless_cancelled() {
        let job = idle_job();
        job.mark_scheduled();
        assert!(job.finish());
        assert_eq!(job.state(), JobState::Completed);
        assert!(job.is_finished());
        assert!(!job.cancel());
    }

    #[test]
    fn test_yield_reports_cancellation() {
        let job = idle_job();
        job.mark_scheduled();
        job.cancel();
        assert_eq!(job.yield_to_scheduler(), Err(Interrupted::Cancelled));
    }

    #[test]
    fn test_freeze_coalesces_updates() {
        let job = idle_job();
        let (updated, _) = counting(&job);
        job.set_status("one");
        assert_eq!(updated.load(Ordering::SeqCst), 1);

        job.freeze_updates();
        job.freeze_updates();
        job.set_status("two");
        job.set_progress(0.5);
        job.thaw_updates();
        assert_eq!(updated.load(Ordering::SeqCst), 1);
        job.thaw_updates();
        assert_eq!(updated.load(Ordering::SeqCst), 2);
        assert_eq!(job.status(), "two");

        job.freeze_updates();
        job.thaw_updates();
        assert_eq!(updated.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let job = idle_job();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let id = job.subscribe(move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        job.set_title("a");
        assert!(job.unsubscribe(id));
        assert!(!job.unsubscribe(id));
        job.set_title("b");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_dedups_resources_and_sets_flags() {
        let job = Job::builder("copy")
            .with_hints(PriorityHints::LONG_RUNNING)
            .with_hints(PriorityHints::DATA_LOSS_IF_STOPPED)
            .with_resources([Resource::disk(), Resource::disk(), Resource::cpu()])
            .with_can_cancel(false)
            .with_background(true)
            .with_cancel_message("Copy will be incomplete")
            .with_icon_name("copy")
            .build(|_: &Job| -> AppResult<()> { Ok(()) });
        assert_eq!(job.resources().len(), 2);
        assert!(job.has(PriorityHints::LONG_RUNNING | PriorityHints::DATA_LOSS_IF_STOPPED));
        assert!(!job.has(PriorityHints::SPEED_SENSITIVE));
        assert!(!job.can_cancel());
        assert!(job.is_background());
        assert_eq!(job.cancel_message().as_deref(), Some("Copy will be incomplete"));
        assert_eq!(job.icon_names(), vec!["copy".to_string()]);
        assert_ne!(job.id(), idle_job().id());
    }

    #[test]
    fn test_claim_scheduler_once() {
        let job = idle_job();
        assert!(!job.has_scheduler());
        assert!(job.claim_scheduler());
        assert!(!job.claim_scheduler());
        assert!(job.has_scheduler());
    }
}
