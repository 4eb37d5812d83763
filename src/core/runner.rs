//! Dedicated worker threads for job bodies.
//!
//! Each job gets its own OS thread, spawned lazily the first time the job
//! starts, so the scheduler's coordination logic never blocks on work.
//! Bodies that are not speed sensitive run at a lowered OS priority.
//!
//! Lowering the priority is the crate's only `unsafe` code: a single
//! `libc::setpriority` call in `lower_current_thread_priority`, compiled on
//! Linux only, which opts out of the crate-wide `unsafe_code` deny.
//!
//! Errors returned by a body and panics escaping it are caught and logged
//! here; either way the job is finished so the scheduler can release its
//! resources.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use tracing::{debug, error};

use super::error::{AppResult, Interrupted, SchedulerError};
use super::hints::PriorityHints;
use super::job::Job;
use crate::config::WorkerConfig;

/// A synchronous run body.
///
/// The body should call [`Job::yield_to_scheduler`] at safe points, exit
/// early when it returns an error, and report progress through the job's
/// setters. Closures `FnOnce(&Job) -> AppResult<()>` implement this trait.
pub trait JobWork: Send + 'static {
    /// Do the work.
    ///
    /// # Errors
    ///
    /// Any error is logged and recorded as the job's failure; the job still
    /// finishes normally.
    fn run(self: Box<Self>, job: &Job) -> AppResult<()>;
}

impl<F> JobWork for F
where
    F: FnOnce(&Job) -> AppResult<()> + Send + 'static,
{
    fn run(self: Box<Self>, job: &Job) -> AppResult<()> {
        (*self)(job)
    }
}

/// Owns a job's body until it is handed to the worker, and the worker
/// thread afterwards.
pub(crate) struct JobRunner {
    work: Mutex<Option<Box<dyn JobWork>>>,
    config: Mutex<WorkerConfig>,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Disconnects when the worker thread exits.
    exited: Mutex<Option<Receiver<()>>>,
}

impl JobRunner {
    pub fn new(work: Box<dyn JobWork>) -> Self {
        Self {
            work: Mutex::new(Some(work)),
            config: Mutex::new(WorkerConfig::default()),
            worker: Mutex::new(None),
            exited: Mutex::new(None),
        }
    }

    pub fn configure(&self, config: WorkerConfig) {
        *self.config.lock() = config;
    }

    /// Spawn the worker thread for `job`. Called once, on first start.
    pub fn spawn(&self, job: &Job) -> Result<(), SchedulerError> {
        let Some(work) = self.work.lock().take() else {
            return Err(SchedulerError::WorkerSpawn(format!(
                "job {} has no run body left",
                job.id()
            )));
        };
        let config = self.config.lock().clone();
        let niceness = if job.has(PriorityHints::SPEED_SENSITIVE) {
            0
        } else {
            config.background_niceness
        };
        let (exit_tx, exit_rx) = bounded::<()>(0);
        let worker_job = job.clone();

        let name = format!("{}-{}", config.name_prefix, job.id().get());
        if name.contains('\0') {
            return Err(SchedulerError::WorkerSpawn(format!("invalid thread name {name:?}")));
        }
        let mut builder = thread::Builder::new().name(name);
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        let handle = builder
            .spawn(move || {
                let _exit_tx = exit_tx;
                run_worker(&worker_job, work, niceness);
            })
            .map_err(|e| SchedulerError::WorkerSpawn(e.to_string()))?;

        debug!(job_id = %job.id(), niceness, "worker spawned");
        *self.worker.lock() = Some(handle);
        *self.exited.lock() = Some(exit_rx);
        Ok(())
    }

    /// Drop the join handle so the thread runs on detached.
    pub fn detach(&self) {
        if self.worker.lock().take().is_some() {
            debug!("worker detached");
        }
    }

    /// Wait up to `timeout` for the worker to exit. True if it has (or was
    /// never spawned).
    pub fn join(&self, timeout: Duration) -> bool {
        let exited = self.exited.lock().clone();
        let Some(exited) = exited else {
            return true;
        };
        match exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.worker.lock().take() {
                    let _ = handle.join();
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

impl fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRunner")
            .field("spawned", &self.exited.lock().is_some())
            .finish_non_exhaustive()
    }
}

fn run_worker(job: &Job, work: Box<dyn JobWork>, niceness: i32) {
    if niceness > 0 {
        lower_current_thread_priority(niceness);
    }
    debug!(job_id = %job.id(), "worker started");

    match panic::catch_unwind(AssertUnwindSafe(|| work.run(job))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => match err.downcast_ref::<Interrupted>() {
            Some(reason) => debug!(job_id = %job.id(), %reason, "job body interrupted"),
            None => {
                error!(job_id = %job.id(), error = %err, "job body failed");
                job.record_failure(format!("{err:#}"));
            }
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(job_id = %job.id(), panic = %message, "job body panicked");
            job.record_failure(message);
        }
    }

    job.finish();
    debug!(job_id = %job.id(), "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
fn lower_current_thread_priority(niceness: i32) {
    // With PRIO_PROCESS and who == 0, Linux applies the value to the calling
    // thread only.
    // SAFETY: setpriority takes no pointers and only touches scheduler state.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, niceness) };
    if rc != 0 {
        tracing::warn!(niceness, error = %std::io::Error::last_os_error(), "failed to lower worker priority");
    }
}

#[cfg(not(target_os = "linux"))]
fn lower_current_thread_priority(niceness: i32) {
    debug!(niceness, "worker niceness is not supported on this platform");
}
