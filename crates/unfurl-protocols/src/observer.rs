//! Outbound notifications consumed by the view layer.

use crate::types::Counters;

/// Receives progress and completion notifications from a controller.
///
/// Callbacks are invoked from the controller's run task and must not block.
pub trait ExpansionObserver: Send + Sync {
    /// A scan found new candidates and the discovered total grew.
    fn on_discovered(&self, _counters: Counters) {}

    /// Fired after every single actuation.
    fn on_progress(&self, _actuated: u64, _discovered: u64) {}

    /// Fired exactly once per run, when quiescence is confirmed.
    fn on_completed(&self, _total_actuated: u64) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExpansionObserver for NoopObserver {}
