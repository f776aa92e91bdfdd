//! Wall-clock budgets for the iterative algorithms.

use std::time::{Duration, Instant};

use crate::{Error, Result};

/// A point in time after which a long-running loop gives up.
///
/// `Deadline::none()` never expires; checking it costs one branch.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Self {
        Self { at: None }
    }

    /// Deadline `limit` from now. `None`, or a limit too far out to represent, never expires.
    pub fn after(limit: Option<Duration>) -> Self {
        Self { at: limit.and_then(|d| Instant::now().checked_add(d)) }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.at, Some(at) if Instant::now() >= at)
    }

    /// `Err(DeadlineExceeded(stage))` once expired.
    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_expired() {
            tracing::debug!(stage, "deadline exceeded");
            return Err(Error::DeadlineExceeded(stage));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_expires() {
        assert!(Deadline::none().check("x").is_ok());
        assert!(Deadline::after(None).check("x").is_ok());
    }

    #[test]
    fn huge_limit_does_not_overflow() {
        let d = Deadline::after(Some(Duration::MAX));
        assert!(!d.is_expired());
        assert!(d.check("k_walk").is_ok());
    }

    #[test]
    fn zero_limit_expires_immediately() {
        let d = Deadline::after(Some(Duration::ZERO));
        assert!(matches!(d.check("mcl"), Err(Error::DeadlineExceeded("mcl"))));
    }
}
