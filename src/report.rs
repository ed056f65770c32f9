//! Progress output for the expand command.

use tracing::info;

use unfurl_core::{Counters, ExpansionObserver};

/// Logs progress after every actuation and a summary on completion.
#[derive(Debug, Default)]
pub(crate) struct ProgressReporter;

impl ExpansionObserver for ProgressReporter {
    fn on_discovered(&self, counters: Counters) {
        info!(discovered = counters.discovered, "Found more sections to expand");
    }

    fn on_progress(&self, actuated: u64, discovered: u64) {
        info!("{}", progress_line(Counters { discovered, actuated }));
    }

    fn on_completed(&self, total_actuated: u64) {
        info!("{}", completion_line(total_actuated));
    }
}

pub(crate) fn progress_line(counters: Counters) -> String {
    format!(
        "Expanded {} / {} ({}%)",
        counters.actuated,
        counters.discovered,
        counters.percent()
    )
}

pub(crate) fn completion_line(total: u64) -> String {
    let noun = if total == 1 { "section" } else { "sections" };
    format!("Complete! Expanded {} {}.", total, noun)
}
