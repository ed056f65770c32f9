//! Quiescence timer with a short and a standard grace period.

use std::fmt;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Which grace period an armed timer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grace {
    /// The very first scan of a run found nothing.
    Initial,
    /// Every other case.
    Settle,
}

impl fmt::Display for Grace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grace::Initial => write!(f, "short"),
            Grace::Settle => write!(f, "standard"),
        }
    }
}

/// Decides when the tree has been quiet long enough to re-check it.
///
/// The detector only times; the caller performs the confirming re-scan on
/// expiry and either completes the run or treats it as a false alarm.
#[derive(Debug)]
pub struct QuiescenceDetector {
    initial: Duration,
    settle: Duration,
    armed: Option<(Instant, Grace)>,
}

impl QuiescenceDetector {
    pub fn new(initial: Duration, settle: Duration) -> Self {
        Self {
            initial,
            settle,
            armed: None,
        }
    }

    pub fn grace(&self, grace: Grace) -> Duration {
        match grace {
            Grace::Initial => self.initial,
            Grace::Settle => self.settle,
        }
    }

    /// Arm the timer unless it already is. Returns whether it was armed now.
    pub fn arm(&mut self, grace: Grace) -> bool {
        if self.armed.is_some() {
            return false;
        }
        self.armed = Some((Instant::now() + self.grace(grace), grace));
        true
    }

    /// Disarm. Returns whether a timer was pending.
    pub fn cancel(&mut self) -> bool {
        self.armed.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|(deadline, _)| deadline)
    }

    /// Resolves when the armed timer expires, disarming it. Never resolves
    /// while disarmed.
    pub async fn expired(&mut self) -> Grace {
        match self.armed {
            Some((deadline, grace)) => {
                sleep_until(deadline).await;
                self.armed = None;
                grace
            }
            None => std::future::pending().await,
        }
    }
}
