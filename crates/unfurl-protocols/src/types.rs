//! Run state and progress counters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of an expansion run.
///
/// "Awaiting completion" is not a separate state: it is `Running` with the
/// quiescence timer armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Never started, or stopped.
    #[default]
    Idle,
    /// Scanning, actuating or waiting for quiescence.
    Running,
    /// Quiescence confirmed. Terminal until the next start.
    Completed,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Completed => write!(f, "completed"),
        }
    }
}

/// Progress counters of a single run.
///
/// Both values only grow during a run and `actuated <= discovered` holds at
/// every observation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    /// Newly found unprocessed candidates, summed over all scans.
    pub discovered: u64,
    /// Actions fired (or attempted after marking).
    pub actuated: u64,
}

impl Counters {
    /// Rounded completion percentage, 0 when nothing was discovered.
    pub fn percent(&self) -> u64 {
        if self.discovered == 0 {
            return 0;
        }
        ((self.actuated as f64 / self.discovered as f64) * 100.0).round() as u64
    }

    pub fn is_settled(&self) -> bool {
        self.actuated == self.discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_default_is_idle() {
        assert_eq!(RunState::default(), RunState::Idle);
        assert!(!RunState::Idle.is_running());
        assert!(RunState::Running.is_running());
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Completed.to_string(), "completed");
        assert_eq!(
            serde_json::to_string(&RunState::Running).unwrap(),
            "\"running\""
        );
    }

    #[test]
    fn test_counters_percent() {
        let counters = Counters {
            discovered: 3,
            actuated: 2,
        };
        assert_eq!(counters.percent(), 67);
        assert!(!counters.is_settled());
        assert_eq!(Counters::default().percent(), 0);
        assert!(Counters::default().is_settled());
    }
}
