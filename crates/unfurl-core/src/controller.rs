//! Public controller: run lifecycle, counters and notifications.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use unfurl_protocols::{
    Counters, DocumentTree, ExpansionObserver, MarkerStore, NoopObserver, RunState,
};

use crate::config::ExpanderConfig;
use crate::error::ExpanderError;
use crate::run::{Run, RunReporter};

/// State shared between the controller and its run task.
#[derive(Default)]
pub(crate) struct ControllerState {
    /// Bumped on every start; a run task only reports while it matches.
    pub(crate) generation: u64,
    pub(crate) counters: Counters,
    pub(crate) state: RunState,
    /// Task of the latest run and its cancel token.
    active: Option<ActiveRun>,
}

struct ActiveRun {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ControllerState {
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state.is_running()
    }

    pub(crate) fn finish(&mut self) {
        self.state = RunState::Completed;
    }

    /// End the run without completing it.
    pub(crate) fn abandon(&mut self) {
        self.state = RunState::Idle;
    }
}

/// Drives expansion runs over one tree.
///
/// Each controller owns its state; independent controllers over different
/// trees never interfere. `start` spawns the run onto the current Tokio
/// runtime and returns immediately.
pub struct Controller<T: DocumentTree, M> {
    tree: Arc<T>,
    markers: Arc<M>,
    config: ExpanderConfig,
    observer: Arc<dyn ExpansionObserver>,
    shared: Arc<Mutex<ControllerState>>,
    state_tx: Arc<watch::Sender<RunState>>,
}

impl<T, M> Controller<T, M>
where
    T: DocumentTree,
    M: MarkerStore<T::Node> + 'static,
{
    pub fn new(
        tree: Arc<T>,
        markers: Arc<M>,
        config: ExpanderConfig,
    ) -> Result<Self, ExpanderError> {
        config.validate()?;
        let (state_tx, _) = watch::channel(RunState::Idle);
        Ok(Self {
            tree,
            markers,
            config,
            observer: Arc::new(NoopObserver),
            shared: Arc::new(Mutex::new(ControllerState::default())),
            state_tx: Arc::new(state_tx),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExpansionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ExpanderConfig {
        &self.config
    }

    /// Start a run. Does nothing and returns `false` while a run is active.
    ///
    /// Counters are reset; processed markers are kept, so nodes handled by an
    /// earlier run are not actuated again.
    ///
    /// A new run waits for the previous run's task to exit before its first
    /// scan, so an action still in flight from a stopped run never overlaps
    /// the new one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut shared = self.shared.lock();
        if shared.state.is_running() {
            info!("Expansion already running, ignoring start");
            return false;
        }

        shared.generation += 1;
        shared.counters = Counters::default();
        shared.state = RunState::Running;
        let previous = shared.active.take().map(|previous| {
            previous.cancel.cancel();
            previous.task
        });

        let cancel = CancellationToken::new();
        let reporter = RunReporter::new(
            shared.generation,
            Arc::clone(&self.shared),
            Arc::clone(&self.state_tx),
            Arc::clone(&self.observer),
        );
        let run = Run::new(
            Arc::clone(&self.tree),
            Arc::clone(&self.markers),
            self.config.clone(),
            reporter,
            cancel.clone(),
        );
        info!(generation = shared.generation, "Expansion started");
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                // A panicked run has nothing left in flight either.
                let _ = previous.await;
            }
            run.drive().await;
        });
        shared.active = Some(ActiveRun { cancel, task });
        self.state_tx.send_replace(RunState::Running);
        true
    }

    /// Stop the active run. Actuation halts before the next action, the
    /// quiescence timer is dropped and the watcher unsubscribes. Markers are
    /// left in place. Returns whether a run was stopped.
    pub fn stop(&self) -> bool {
        let mut shared = self.shared.lock();
        if !shared.state.is_running() {
            return false;
        }
        shared.state = RunState::Idle;
        if let Some(active) = &shared.active {
            active.cancel.cancel();
        }
        self.state_tx.send_replace(RunState::Idle);
        info!(
            actuated = shared.counters.actuated,
            discovered = shared.counters.discovered,
            "Expansion stopped"
        );
        true
    }

    pub fn state(&self) -> RunState {
        self.shared.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn counters(&self) -> Counters {
        self.shared.lock().counters
    }

    /// Receiver that sees every run state change.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    /// Wait until no run is active and return the state it ended in.
    pub async fn wait(&self) -> RunState {
        let mut rx = self.state_tx.subscribe();
        match rx.wait_for(|state| !state.is_running()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }
}

impl<T: DocumentTree, M> Drop for Controller<T, M> {
    fn drop(&mut self) {
        if let Some(active) = self.shared.lock().active.take() {
            active.cancel.cancel();
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
