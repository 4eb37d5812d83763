//! Worker thread configuration.

use serde::{Deserialize, Serialize};

/// Smallest stack size accepted for worker threads.
pub const MIN_STACK_SIZE: usize = 64 * 1024;

/// Settings for the dedicated thread each job runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Thread name prefix; the job id is appended.
    pub name_prefix: String,
    /// Stack size in bytes, or the platform default.
    pub stack_size: Option<usize>,
    /// Niceness applied to workers of jobs that are not speed sensitive.
    /// `0` leaves them at normal priority.
    pub background_niceness: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name_prefix: "job-worker".to_string(),
            stack_size: None,
            background_niceness: 10,
        }
    }
}

impl WorkerConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread name prefix.
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the worker stack size in bytes.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Set the niceness used for background workers.
    #[must_use]
    pub const fn with_background_niceness(mut self, niceness: i32) -> Self {
        self.background_niceness = niceness;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.name_prefix.is_empty() {
            return Err("name_prefix must not be empty".into());
        }
        if self.name_prefix.contains('\0') {
            return Err("name_prefix must not contain NUL bytes".into());
        }
        if let Some(stack_size) = self.stack_size {
            if stack_size < MIN_STACK_SIZE {
                return Err(format!("stack_size must be at least {MIN_STACK_SIZE} bytes"));
            }
        }
        if !(0..=19).contains(&self.background_niceness) {
            return Err("background_niceness must be between 0 and 19".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(WorkerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(WorkerConfig::new().with_name_prefix("").validate().is_err());
        assert!(WorkerConfig::new().with_name_prefix("a\0b").validate().is_err());
        assert!(WorkerConfig::new().with_stack_size(1024).validate().is_err());
        assert!(WorkerConfig::new().with_background_niceness(25).validate().is_err());
        assert!(WorkerConfig::new().with_background_niceness(-1).validate().is_err());
        assert!(WorkerConfig::new()
            .with_stack_size(MIN_STACK_SIZE)
            .with_background_niceness(0)
            .validate()
            .is_ok());
    }
}
