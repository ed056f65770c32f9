//! The per-run event loop.
//!
//! One task owns every component of a run and handles a single event at a
//! time: cancellation, mutation batches, actuation steps, debounced re-scans
//! and quiescence expiry.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use unfurl_protocols::{
    DocumentTree, ExpansionObserver, MarkerStore, MutationBatch, RunState, Selector, TreeError,
};

use crate::actuator::{Actuation, Actuator};
use crate::config::ExpanderConfig;
use crate::controller::ControllerState;
use crate::debounce::Debouncer;
use crate::filter::CandidateFilter;
use crate::query::TreeQuery;
use crate::quiescence::{Grace, QuiescenceDetector};
use crate::watcher::MutationWatcher;

/// Publishes counters and state on behalf of one run generation. Every
/// method returns `false` once the run is no longer current.
pub(crate) struct RunReporter {
    generation: u64,
    shared: Arc<Mutex<ControllerState>>,
    state_tx: Arc<watch::Sender<RunState>>,
    observer: Arc<dyn ExpansionObserver>,
}

impl RunReporter {
    pub(crate) fn new(
        generation: u64,
        shared: Arc<Mutex<ControllerState>>,
        state_tx: Arc<watch::Sender<RunState>>,
        observer: Arc<dyn ExpansionObserver>,
    ) -> Self {
        Self {
            generation,
            shared,
            state_tx,
            observer,
        }
    }

    fn discovered(&self, added: usize) -> bool {
        let counters = {
            let mut shared = self.shared.lock();
            if !shared.is_current(self.generation) {
                return false;
            }
            shared.counters.discovered += added as u64;
            shared.counters
        };
        self.observer.on_discovered(counters);
        true
    }

    fn actuated(&self) -> bool {
        let counters = {
            let mut shared = self.shared.lock();
            if !shared.is_current(self.generation) {
                return false;
            }
            shared.counters.actuated += 1;
            shared.counters
        };
        debug!(
            actuated = counters.actuated,
            discovered = counters.discovered,
            "Actuated {}/{} ({}%)",
            counters.actuated,
            counters.discovered,
            counters.percent()
        );
        self.observer
            .on_progress(counters.actuated, counters.discovered);
        true
    }

    fn completed(&self) -> bool {
        let total = {
            let mut shared = self.shared.lock();
            if !shared.is_current(self.generation) {
                return false;
            }
            shared.finish();
            self.state_tx.send_replace(RunState::Completed);
            shared.counters.actuated
        };
        info!(total_actuated = total, "Expansion complete");
        self.observer.on_completed(total);
        true
    }

    /// End the run as `Idle` without a completion notification.
    fn abandoned(&self) -> bool {
        let mut shared = self.shared.lock();
        if !shared.is_current(self.generation) {
            return false;
        }
        shared.abandon();
        self.state_tx.send_replace(RunState::Idle);
        true
    }
}

/// Consecutive failed final checks before a run gives up.
const MAX_RECHECK_FAILURES: u32 = 3;

/// What woke the loop up.
enum RunEvent<N> {
    Cancelled,
    Mutation(Option<MutationBatch<N>>),
    Actuate,
    Rescan,
    Quiet(Grace),
}

/// Whether the loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Scan then filter.
struct Scanner<T: DocumentTree, M> {
    query: TreeQuery<T>,
    filter: CandidateFilter<T, M>,
    candidate: Selector,
}

impl<T, M> Scanner<T, M>
where
    T: DocumentTree,
    M: MarkerStore<T::Node>,
{
    /// Eligible candidates under `root`.
    async fn scan(&self, root: &T::Node) -> Result<Vec<T::Node>, TreeError> {
        debug!("Scanning for candidates");
        let found = self.query.find_all(root, &self.candidate).await?;
        Ok(self.filter.retain(found).await)
    }
}

/// All state of one run, owned by its task.
pub(crate) struct Run<T: DocumentTree, M> {
    root: T::Node,
    scanner: Scanner<T, M>,
    actuator: Actuator<T, M>,
    watcher: MutationWatcher<T>,
    debouncer: Debouncer,
    quiescence: QuiescenceDetector,
    reporter: RunReporter,
    cancel: CancellationToken,
    recheck_failures: u32,
}

impl<T, M> Run<T, M>
where
    T: DocumentTree,
    M: MarkerStore<T::Node> + 'static,
{
    pub(crate) fn new(
        tree: Arc<T>,
        markers: Arc<M>,
        config: ExpanderConfig,
        reporter: RunReporter,
        cancel: CancellationToken,
    ) -> Self {
        let scanner = Scanner {
            query: TreeQuery::new(Arc::clone(&tree), config.max_depth),
            filter: CandidateFilter::new(
                Arc::clone(&tree),
                Arc::clone(&markers),
                config.exclude.clone(),
            ),
            candidate: config.candidate.clone(),
        };
        Self {
            root: tree.root(),
            actuator: Actuator::new(Arc::clone(&tree), markers, config.action_delay),
            watcher: MutationWatcher::new(Arc::clone(&tree), config.container.clone()),
            debouncer: Debouncer::new(config.debounce),
            quiescence: QuiescenceDetector::new(config.initial_grace, config.settle_grace),
            scanner,
            reporter,
            cancel,
            recheck_failures: 0,
        }
    }

    /// Run to completion or cancellation.
    pub(crate) async fn drive(mut self) {
        let first = self.scan_or_empty().await;
        if self.discover(first, Grace::Initial) == Flow::Exit {
            return;
        }

        let root = self.root.clone();
        if let Err(e) = self.watcher.start(&root, self.cancel.child_token()).await {
            warn!("Mutation watcher unavailable, relying on quiescence re-checks: {}", e);
        }

        loop {
            let ready = self.actuator.ready_at();
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => RunEvent::Cancelled,
                batch = self.watcher.next_batch() => RunEvent::Mutation(batch),
                _ = sleep_until(ready.unwrap_or_else(Instant::now)), if ready.is_some() => {
                    RunEvent::Actuate
                }
                _ = self.debouncer.fired() => RunEvent::Rescan,
                grace = self.quiescence.expired() => RunEvent::Quiet(grace),
            };

            let flow = match event {
                RunEvent::Cancelled => {
                    info!("Run cancelled, halting");
                    Flow::Exit
                }
                RunEvent::Mutation(Some(batch)) => {
                    if self.watcher.is_relevant(&batch).await {
                        debug!("Tree change detected, queueing a re-scan");
                        self.debouncer.trigger();
                    }
                    Flow::Continue
                }
                RunEvent::Mutation(None) => Flow::Continue,
                RunEvent::Actuate => self.actuate().await,
                RunEvent::Rescan => {
                    info!("Re-scanning after tree change");
                    let found = self.scan_or_empty().await;
                    self.discover(found, Grace::Settle)
                }
                RunEvent::Quiet(grace) => self.confirm(grace).await,
            };
            if flow == Flow::Exit {
                break;
            }
        }

        self.debouncer.cancel();
        self.quiescence.cancel();
        self.actuator.clear();
        self.watcher.stop();
    }

    /// Eligible candidates this run has not queued yet.
    async fn scan_new(&self) -> Result<Vec<T::Node>, TreeError> {
        let mut found = self.scanner.scan(&self.root).await?;
        found.retain(|node| !self.actuator.is_known(node));
        Ok(found)
    }

    /// Discovery scans treat a failure as finding nothing; the quiescence
    /// re-check decides whether the run is really done.
    async fn scan_or_empty(&self) -> Vec<T::Node> {
        self.scan_new().await.unwrap_or_else(|e| {
            warn!("Scan failed, treating as empty: {}", e);
            Vec::new()
        })
    }

    /// Feed scan results to the actuator. An empty result arms the
    /// quiescence timer with `grace_if_empty`.
    fn discover(&mut self, found: Vec<T::Node>, grace_if_empty: Grace) -> Flow {
        let added = self.actuator.enqueue(found);
        if added == 0 {
            info!("No new candidates in this scan");
            self.arm_if_idle(grace_if_empty);
            return Flow::Continue;
        }

        info!(count = added, "Found {} new candidate(s)", added);
        if self.quiescence.cancel() {
            debug!("Quiescence timer cancelled");
        }
        if self.reporter.discovered(added) {
            Flow::Continue
        } else {
            Flow::Exit
        }
    }

    fn arm_if_idle(&mut self, grace: Grace) {
        if self.cancel.is_cancelled() || !self.actuator.is_idle() {
            return;
        }
        if self.quiescence.arm(grace) {
            info!(
                "Quiescence timer armed ({} grace, {:?})",
                grace,
                self.quiescence.grace(grace)
            );
        }
    }

    async fn actuate(&mut self) -> Flow {
        if self.cancel.is_cancelled() {
            return Flow::Exit;
        }
        let Some(outcome) = self.actuator.actuate_next().await else {
            return Flow::Continue;
        };
        if let Actuation::Skipped(node) | Actuation::Unmarked(node) = &outcome {
            debug!("Counted {:?} without firing its action", node);
        }
        if !self.reporter.actuated() {
            return Flow::Exit;
        }
        if self.actuator.is_idle() {
            self.arm_if_idle(Grace::Settle);
        }
        Flow::Continue
    }

    /// Re-check after the grace period: complete, or resume on a false alarm.
    async fn confirm(&mut self, grace: Grace) -> Flow {
        info!("Quiescence timer fired ({} grace), final check", grace);
        let remaining = match self.scan_new().await {
            Ok(found) => {
                self.recheck_failures = 0;
                found
            }
            Err(e) => return self.recheck_failed(e),
        };
        if !remaining.is_empty() {
            info!(
                count = remaining.len(),
                "False alarm, more candidates appeared; continuing"
            );
            return self.discover(remaining, Grace::Settle);
        }

        self.watcher.stop();
        self.debouncer.cancel();
        self.reporter.completed();
        Flow::Exit
    }

    /// A final check that cannot see the tree proves nothing: retry after
    /// the standard grace, then give up without reporting completion.
    fn recheck_failed(&mut self, error: TreeError) -> Flow {
        self.recheck_failures += 1;
        if self.recheck_failures < MAX_RECHECK_FAILURES {
            warn!(
                attempt = self.recheck_failures,
                "Final check failed, retrying: {}", error
            );
            self.arm_if_idle(Grace::Settle);
            return Flow::Continue;
        }

        warn!(
            attempts = self.recheck_failures,
            "Final check kept failing, stopping without completion: {}", error
        );
        self.watcher.stop();
        self.debouncer.cancel();
        self.reporter.abandoned();
        Flow::Exit
    }
}
