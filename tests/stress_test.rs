//! Randomized concurrent stress test.
//!
//! Several threads add, pause, resume, cancel and release jobs at random
//! while an audit sink checks, at every admission, that no two overlapping
//! jobs are running unless both are speed sensitive.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{controlled, Controlled};
use parking_lot::Mutex;
use prometheus_job_scheduler::core::{
    AuditAction, AuditEvent, AuditSink, Job, JobState, PriorityHints, PriorityTier, Resource,
    Scheduler,
};
use rand::Rng;

/// Checks overlapping Running pairs each time the scheduler starts a job.
/// Every state change into Running happens under the scheduler lock, which
/// is held while `record` runs.
struct OverlapChecker {
    jobs: Arc<Mutex<Vec<Job>>>,
    violations: Arc<AtomicUsize>,
}

impl AuditSink for OverlapChecker {
    fn record(&mut self, event: AuditEvent) {
        if event.action != AuditAction::Started {
            return;
        }
        let jobs = self.jobs.lock();
        let running: Vec<&Job> = jobs.iter().filter(|j| j.state() == JobState::Running).collect();
        for (i, a) in running.iter().enumerate() {
            for b in &running[i + 1..] {
                let overlap = a.resources().iter().any(|r| b.resources().contains(r));
                let both_fast = a.priority_hints().tier() == PriorityTier::SpeedSensitive
                    && b.priority_hints().tier() == PriorityTier::SpeedSensitive;
                if overlap && !both_fast {
                    self.violations.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }
}

fn random_job(rng: &mut impl Rng, index: usize) -> Controlled {
    let hints = match rng.random_range(0..4) {
        0 => PriorityHints::SPEED_SENSITIVE,
        1 => PriorityHints::LONG_RUNNING,
        2 => PriorityHints::LONG_RUNNING | PriorityHints::DATA_LOSS_IF_STOPPED,
        _ => PriorityHints::NONE,
    };
    let pool = [Resource::cpu(), Resource::disk(), Resource::database()];
    let resources: Vec<Resource> = pool.into_iter().filter(|_| rng.random_bool(0.5)).collect();
    controlled(&format!("stress-{index}"), hints, &resources)
}

#[test]
fn test_random_operations_never_run_conflicting_jobs_together() {
    const JOBS: usize = 48;
    const WORKERS: usize = 4;
    const OPS_PER_WORKER: usize = 200;

    let registry: Arc<Mutex<Vec<Job>>> = Arc::default();
    let violations = Arc::new(AtomicUsize::new(0));
    let scheduler = Scheduler::default().with_audit(Box::new(OverlapChecker {
        jobs: Arc::clone(&registry),
        violations: Arc::clone(&violations),
    }));

    let mut rng = rand::rng();
    let jobs: Vec<Controlled> = (0..JOBS).map(|i| random_job(&mut rng, i)).collect();
    registry.lock().extend(jobs.iter().map(|c| c.job.clone()));

    thread::scope(|scope| {
        for _ in 0..WORKERS {
            scope.spawn(|| {
                let mut rng = rand::rng();
                for _ in 0..OPS_PER_WORKER {
                    let target = &jobs[rng.random_range(0..JOBS)];
                    match rng.random_range(0..10) {
                        0..=3 => {
                            let _ = scheduler.add(&target.job);
                        }
                        4 => {
                            let _ = scheduler.pause(&target.job);
                        }
                        5 | 6 => {
                            let _ = scheduler.resume(&target.job);
                        }
                        7 => {
                            let _ = scheduler.cancel(&target.job);
                        }
                        8 => target.release(),
                        _ => scheduler.schedule(),
                    }
                    if rng.random_bool(0.1) {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
            });
        }
    });

    // Drain: finish everything that was ever added.
    for job in &jobs {
        job.release();
    }
    let deadline = Instant::now() + Duration::from_secs(30);
    while scheduler.job_count() > 0 && Instant::now() < deadline {
        for job in scheduler.jobs() {
            if job.state() == JobState::Paused {
                let _ = scheduler.resume(&job);
            }
        }
        for job in &jobs {
            job.release();
        }
        thread::sleep(Duration::from_millis(2));
    }

    assert_eq!(scheduler.job_count(), 0, "live set drained");
    assert_eq!(violations.load(Ordering::SeqCst), 0, "overlapping non-speed-sensitive jobs ran together");
    for job in &jobs {
        let state = job.job.state();
        assert!(
            state == JobState::None || state.is_finished(),
            "job {} left in {state:?}",
            job.job.id()
        );
        assert!(job.job.join_worker(Duration::from_secs(5)));
    }
}
