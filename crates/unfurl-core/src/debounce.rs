//! Trailing-edge debounce timer.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Coalesces a burst of triggers into one firing, `wait` after the last
/// trigger.
#[derive(Debug)]
pub struct Debouncer {
    wait: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            deadline: None,
        }
    }

    /// Restart the countdown.
    pub fn trigger(&mut self) {
        self.deadline = Some(Instant::now() + self.wait);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves when the pending call is due and clears it. Never resolves
    /// while nothing is pending. Cancel safe: dropping the future keeps the
    /// pending call.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}
