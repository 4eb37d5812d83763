//! Composition-root helper for [`Scheduler`].

use crate::config::SchedulerConfig;
use crate::core::{InMemoryAuditSink, Scheduler, SchedulerError};

/// Validate `cfg` and build a scheduler from it.
///
/// When `audit_capacity` is non-zero an [`InMemoryAuditSink`] of that size is
/// attached and a handle to it is returned alongside the scheduler.
///
/// # Errors
///
/// [`SchedulerError::InvalidConfig`] if validation fails.
pub fn build_scheduler(
    cfg: &SchedulerConfig,
) -> Result<(Scheduler, Option<InMemoryAuditSink>), SchedulerError> {
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let scheduler = Scheduler::new(cfg.clone());
    if cfg.audit_capacity == 0 {
        return Ok((scheduler, None));
    }
    let sink = InMemoryAuditSink::new(cfg.audit_capacity);
    let scheduler = scheduler.with_audit(Box::new(sink.clone()));
    Ok((scheduler, Some(sink)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;

    #[test]
    fn test_audit_sink_only_when_capacity_set() {
        let (_, audit) = build_scheduler(&SchedulerConfig::default()).unwrap();
        assert!(audit.is_none());

        let cfg = SchedulerConfig {
            audit_capacity: 8,
            ..SchedulerConfig::default()
        };
        let (scheduler, audit) = build_scheduler(&cfg).unwrap();
        assert!(audit.is_some());
        assert_eq!(scheduler.config().audit_capacity, 8);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = SchedulerConfig {
            worker: WorkerConfig::default().with_name_prefix(""),
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            build_scheduler(&cfg),
            Err(SchedulerError::InvalidConfig(_))
        ));
    }
}
