//! Priority hints and the scheduling tier derived from them.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Independent flags that alter how a job is scheduled and shut down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityHints(u8);

impl PriorityHints {
    /// No hints; the job is scheduled in the normal tier.
    pub const NONE: Self = Self(0);
    /// Stopping the job loses user data. Consulted by bulk cancellation and
    /// shutdown warnings only.
    pub const DATA_LOSS_IF_STOPPED: Self = Self(1);
    /// Latency-critical work; may preempt anything that is not itself
    /// speed sensitive.
    pub const SPEED_SENSITIVE: Self = Self(1 << 1);
    /// Long background work; never preempts and is preempted first.
    pub const LONG_RUNNING: Self = Self(1 << 2);

    /// True iff every bit of `other` is set on `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True iff no hint is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Tier these hints place a job in.
    #[must_use]
    pub const fn tier(self) -> PriorityTier {
        if self.contains(Self::SPEED_SENSITIVE) {
            PriorityTier::SpeedSensitive
        } else if self.contains(Self::LONG_RUNNING) {
            PriorityTier::LongRunning
        } else {
            PriorityTier::Normal
        }
    }
}

impl BitOr for PriorityHints {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PriorityHints {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PriorityHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names = [
            (Self::DATA_LOSS_IF_STOPPED, "data-loss-if-stopped"),
            (Self::SPEED_SENSITIVE, "speed-sensitive"),
            (Self::LONG_RUNNING, "long-running"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Preemption power of a job. Ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    /// Background work, first to be preempted.
    LongRunning,
    /// Neither speed sensitive nor long running.
    Normal,
    /// Interactive work, never preempted.
    SpeedSensitive,
}
