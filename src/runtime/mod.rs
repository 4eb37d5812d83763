//! Runtime adapters and the serializable API surface.

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_body;

pub use api::{snapshot, JobSnapshot, SchedulerSnapshot};
#[cfg(feature = "tokio-runtime")]
pub use tokio_body::{AsyncJobWork, JobBuilderAsyncExt};
