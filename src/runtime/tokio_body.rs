//! Async run bodies on the job's own worker thread.
//!
//! The worker builds a single-threaded tokio runtime and blocks on the body,
//! so async I/O (network transfers, for example) never touches the
//! application's main runtime. [`Job::yield_to_scheduler`] is still the only
//! suspension point; while it blocks, the whole worker runtime is parked.

use anyhow::Context;
use async_trait::async_trait;

use crate::core::{AppResult, Job, JobBuilder, JobWork};

/// An asynchronous run body.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Download { url: String }
///
/// #[async_trait]
/// impl AsyncJobWork for Download {
///     async fn run(&self, job: Job) -> AppResult<()> {
///         for chunk in 0..10 {
///             job.yield_to_scheduler()?;
///             fetch_chunk(&self.url, chunk).await?;
///             job.set_progress(f64::from(chunk + 1) / 10.0);
///         }
///         Ok(())
///     }
/// }
///
/// let job = Job::builder("Download").build_async(Download { url });
/// ```
#[async_trait]
pub trait AsyncJobWork: Send + Sync + 'static {
    /// Do the work.
    ///
    /// # Errors
    ///
    /// Any error is logged and recorded as the job's failure.
    async fn run(&self, job: Job) -> AppResult<()>;
}

struct AsyncBody<W>(W);

impl<W: AsyncJobWork> JobWork for AsyncBody<W> {
    fn run(self: Box<Self>, job: &Job) -> AppResult<()> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to create worker runtime")?;
        rt.block_on(self.0.run(job.clone()))
    }
}

/// Adds [`JobBuilderAsyncExt::build_async`] to [`JobBuilder`].
pub trait JobBuilderAsyncExt {
    /// Finish building with an async run body.
    fn build_async<W: AsyncJobWork>(self, work: W) -> Job;
}

impl JobBuilderAsyncExt for JobBuilder {
    fn build_async<W: AsyncJobWork>(self, work: W) -> Job {
        self.build(AsyncBody(work))
    }
}
