//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use prometheus_job_scheduler::core::{AppResult, Job, PriorityHints, Resource};

pub const WAIT: Duration = Duration::from_secs(5);

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// A job whose body keeps checkpointing until the test releases it.
pub struct Controlled {
    pub job: Job,
    release: Sender<()>,
    checkpoints: Arc<AtomicUsize>,
}

impl Controlled {
    /// Let the body return at its next checkpoint.
    pub fn release(&self) {
        let _ = self.release.try_send(());
    }

    /// Number of checkpoints the body has passed.
    pub fn checkpoints(&self) -> usize {
        self.checkpoints.load(Ordering::SeqCst)
    }

    /// Wait until the body has passed at least one more checkpoint.
    pub fn wait_for_progress(&self) -> bool {
        let seen = self.checkpoints();
        wait_until(WAIT, || self.checkpoints() > seen)
    }
}

pub fn controlled(title: &str, hints: PriorityHints, resources: &[Resource]) -> Controlled {
    let (release, released) = bounded::<()>(1);
    let checkpoints = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&checkpoints);
    let job = Job::builder(title)
        .with_hints(hints)
        .with_resources(resources.iter().cloned())
        .build(move |job: &Job| -> AppResult<()> {
            loop {
                job.yield_to_scheduler()?;
                counter.fetch_add(1, Ordering::SeqCst);
                match released.recv_timeout(Duration::from_millis(2)) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        });
    Controlled {
        job,
        release,
        checkpoints,
    }
}

/// A job whose body returns immediately.
pub fn instant(title: &str, hints: PriorityHints, resources: &[Resource]) -> Job {
    Job::builder(title)
        .with_hints(hints)
        .with_resources(resources.iter().cloned())
        .build(|_: &Job| -> AppResult<()> { Ok(()) })
}
