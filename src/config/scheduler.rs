//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use super::worker::WorkerConfig;

/// Prefix of the environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "JOB_SCHEDULER_";

/// Root scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Settings applied to every job's worker thread.
    pub worker: WorkerConfig,
    /// Number of audit events kept in memory; `0` disables auditing.
    pub audit_capacity: usize,
}

impl SchedulerConfig {
    /// Validate all sections.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        self.worker.validate().map_err(|e| format!("worker invalid: {e}"))
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build from `JOB_SCHEDULER_*` environment variables, loading a `.env`
    /// file first if one exists. Unset variables keep their defaults.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `JOB_SCHEDULER_WORKER_NAME_PREFIX` | `worker.name_prefix` |
    /// | `JOB_SCHEDULER_WORKER_STACK_SIZE` | `worker.stack_size` |
    /// | `JOB_SCHEDULER_BACKGROUND_NICENESS` | `worker.background_niceness` |
    /// | `JOB_SCHEDULER_AUDIT_CAPACITY` | `audit_capacity` |
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable or invalid value.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup using the same variable names as
    /// [`SchedulerConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable or invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(prefix) = var("WORKER_NAME_PREFIX") {
            cfg.worker.name_prefix = prefix;
        }
        if let Some(raw) = var("WORKER_STACK_SIZE") {
            cfg.worker.stack_size = Some(parse_var("WORKER_STACK_SIZE", &raw)?);
        }
        if let Some(raw) = var("BACKGROUND_NICENESS") {
            cfg.worker.background_niceness = parse_var("BACKGROUND_NICENESS", &raw)?;
        }
        if let Some(raw) = var("AUDIT_CAPACITY") {
            cfg.audit_capacity = parse_var("AUDIT_CAPACITY", &raw)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}={raw:?}: {e}"))
}
