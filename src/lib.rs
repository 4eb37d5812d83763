//! # Prometheus Job Scheduler
//!
//! A resource-aware background job scheduler with cooperative preemption,
//! for running imports, exports, thumbnailing, transfers and database
//! maintenance inside one process without blocking its interactive thread.
//!
//! ## Model
//!
//! - **Resource**: a named capacity token (`cpu`, `disk`, `database`, or
//!   anything the application defines). Jobs declare which ones they need.
//! - **PriorityHints**: `SPEED_SENSITIVE` jobs preempt everything else on a
//!   shared resource, `LONG_RUNNING` jobs never preempt and are preempted
//!   first, everything else is normal. `DATA_LOSS_IF_STOPPED` only affects
//!   bulk cancellation.
//! - **Job**: a state machine (`None → Scheduled → Running ⇄ Scheduled/Paused
//!   → Cancelled | Completed`) wrapping a run body that executes on its own
//!   worker thread.
//! - **Scheduler**: owns the live jobs, admits them by tier and preempts
//!   lower tiers when a higher one needs a contended resource.
//!
//! ## Cooperative suspension
//!
//! Preemption and pausing never stop a thread. They move the job's state and
//! the body blocks the next time it calls [`core::Job::yield_to_scheduler`].
//! Bodies that go a long time between checkpoints are effectively
//! non-preemptible.
//!
//! ```rust,ignore
//! use prometheus_job_scheduler::core::{Job, PriorityHints, Resource, Scheduler};
//!
//! let scheduler = Scheduler::default();
//!
//! let reindex = Job::builder("Rebuild search index")
//!     .with_hints(PriorityHints::LONG_RUNNING)
//!     .with_resource(Resource::database())
//!     .build(|job: &Job| {
//!         for step in 0..100 {
//!             job.yield_to_scheduler()?;
//!             rebuild_step(step)?;
//!             job.set_progress(f64::from(step + 1) / 100.0);
//!         }
//!         Ok(())
//!     });
//! scheduler.add(&reindex)?;
//!
//! // A normal-tier import on the same resource preempts the reindex; the
//! // reindex resumes once the import finishes.
//! let import = Job::builder("Import photos")
//!     .with_resource(Resource::database())
//!     .build(|job: &Job| import_photos(job));
//! scheduler.add(&import)?;
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Jobs, resources, hints and the scheduler.
pub mod core;
/// Configuration models for the scheduler and its workers.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// Runtime adapters and serializable views.
pub mod runtime;
/// Shared utilities.
pub mod util;
