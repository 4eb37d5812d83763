//! Jobs, resources, priority hints and the scheduler that coordinates them.

pub mod audit;
pub mod error;
pub mod events;
pub mod hints;
pub mod job;
pub mod query;
pub mod resource;
pub mod runner;
pub mod scheduler;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, Interrupted, SchedulerError};
pub use events::{JobEvent, SubscriptionId};
pub use hints::{PriorityHints, PriorityTier};
pub use job::{Job, JobBuilder, JobId, JobState};
pub use resource::Resource;
pub use runner::JobWork;
pub use scheduler::{Scheduler, SchedulerEvent};
