//! Configuration models for the scheduler and its workers.

pub mod scheduler;
pub mod worker;

pub use scheduler::SchedulerConfig;
pub use worker::WorkerConfig;
