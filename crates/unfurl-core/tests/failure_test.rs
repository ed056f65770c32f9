//! Runs against a tree whose backend misbehaves.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use unfurl_core::{Controller, Counters, ExpanderConfig, ExpansionObserver, RunState, Selector};
use unfurl_dom::{AttributeMarkers, Document, NodeId};
use unfurl_protocols::{DocumentTree, MarkerStore, MutationSubscription, TreeError};

const MARKER: &str = "data-unfurl-processed";

#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<(u64, u64)>>,
    completed: Mutex<Vec<(u64, Instant)>>,
}

impl Recorder {
    fn completions(&self) -> Vec<u64> {
        self.completed.lock().iter().map(|(total, _)| *total).collect()
    }
}

impl ExpansionObserver for Recorder {
    fn on_progress(&self, actuated: u64, discovered: u64) {
        self.progress.lock().push((actuated, discovered));
    }

    fn on_completed(&self, total_actuated: u64) {
        self.completed.lock().push((total_actuated, Instant::now()));
    }
}

/// Failure switches for [`Faulty`].
#[derive(Default)]
struct Faults {
    /// Number of upcoming `select_all` calls that fail.
    failing_scans: AtomicUsize,
    /// Scans queued to fail once the first action fired.
    failing_scans_after_activate: AtomicUsize,
    /// Every scan fails once an action fired.
    dies_after_activate: AtomicBool,
    activated: AtomicBool,
    /// Nodes reported as gone when activated.
    gone: Mutex<HashSet<NodeId>>,
    /// Time an activation takes.
    activate_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Faults {
    fn take_failing_scan(&self) -> bool {
        self.failing_scans
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory document with injectable backend failures.
struct Faulty {
    doc: Document,
    faults: Arc<Faults>,
}

#[async_trait]
impl DocumentTree for Faulty {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.doc.root()
    }

    async fn select_all(
        &self,
        scope: &NodeId,
        selector: &Selector,
    ) -> Result<Vec<NodeId>, TreeError> {
        let dead = self.faults.dies_after_activate.load(Ordering::SeqCst)
            && self.faults.activated.load(Ordering::SeqCst);
        if dead || self.faults.take_failing_scan() {
            return Err(TreeError::Backend("socket closed".to_string()));
        }
        DocumentTree::select_all(&self.doc, scope, selector).await
    }

    async fn encapsulated_roots(&self, scope: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        DocumentTree::encapsulated_roots(&self.doc, scope).await
    }

    async fn matches(&self, node: &NodeId, selector: &Selector) -> Result<bool, TreeError> {
        DocumentTree::matches(&self.doc, node, selector).await
    }

    async fn closest(
        &self,
        node: &NodeId,
        selector: &Selector,
    ) -> Result<Option<NodeId>, TreeError> {
        DocumentTree::closest(&self.doc, node, selector).await
    }

    async fn activate(&self, node: &NodeId) -> Result<(), TreeError> {
        let faults = &self.faults;
        if !faults.activated.swap(true, Ordering::SeqCst) {
            let queued = faults.failing_scans_after_activate.load(Ordering::SeqCst);
            faults.failing_scans.fetch_add(queued, Ordering::SeqCst);
        }
        if faults.gone.lock().contains(node) {
            return Err(TreeError::NodeGone(format!("{:?}", node)));
        }

        let running = faults.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        faults.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = *faults.activate_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = DocumentTree::activate(&self.doc, node).await;
        faults.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn observe(
        &self,
        scope: &NodeId,
        cancel: CancellationToken,
    ) -> Result<MutationSubscription<NodeId>, TreeError> {
        DocumentTree::observe(&self.doc, scope, cancel).await
    }
}

/// Marker store that cannot write.
struct ReadOnlyMarkers(AttributeMarkers);

#[async_trait]
impl MarkerStore<NodeId> for ReadOnlyMarkers {
    async fn is_marked(&self, node: &NodeId) -> Result<bool, TreeError> {
        self.0.is_marked(node).await
    }

    async fn mark(&self, _node: &NodeId) -> Result<(), TreeError> {
        Err(TreeError::Unsupported("read-only page".to_string()))
    }
}

fn more_comments(doc: &Document, id: &str) -> NodeId {
    let partial = doc
        .element(
            doc.root(),
            "faceplate-partial",
            &[("src", &format!("/svc/shreddit/more-comments/{id}"))],
        )
        .unwrap();
    doc.element(partial, "button", &[]).unwrap()
}

fn faulty_controller(
    doc: &Document,
    faults: &Arc<Faults>,
    recorder: &Arc<Recorder>,
) -> Controller<Faulty, AttributeMarkers> {
    let tree = Faulty {
        doc: doc.clone(),
        faults: faults.clone(),
    };
    let markers = Arc::new(AttributeMarkers::new(doc.clone(), MARKER));
    Controller::new(Arc::new(tree), markers, ExpanderConfig::default())
        .unwrap()
        .with_observer(recorder.clone())
}

#[tokio::test(start_paused = true)]
async fn test_dead_backend_is_not_reported_complete() {
    let doc = Document::new();
    let button = more_comments(&doc, "t1_a");
    let faults = Arc::new(Faults::default());
    faults.dies_after_activate.store(true, Ordering::SeqCst);
    let recorder = Arc::new(Recorder::default());
    let controller = faulty_controller(&doc, &faults, &recorder);

    let start = Instant::now();
    controller.start();
    assert_eq!(controller.wait().await, RunState::Idle);

    // Three failed final checks, one standard grace apart.
    assert_eq!(Instant::now() - start, Duration::from_millis(9000));
    assert_eq!(doc.activation_count(button), 1);
    assert!(recorder.completions().is_empty());
    assert_eq!(*recorder.progress.lock(), vec![(1, 1)]);
    assert_eq!(doc.observer_count(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(recorder.completions().is_empty());
    assert_eq!(controller.state(), RunState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_failed_final_check_is_retried() {
    let doc = Document::new();
    let button = more_comments(&doc, "t1_a");
    let faults = Arc::new(Faults::default());
    faults.failing_scans_after_activate.store(1, Ordering::SeqCst);
    let recorder = Arc::new(Recorder::default());
    let controller = faulty_controller(&doc, &faults, &recorder);

    let start = Instant::now();
    controller.start();
    assert_eq!(controller.wait().await, RunState::Completed);

    assert_eq!(doc.activation_count(button), 1);
    assert_eq!(recorder.completions(), vec![1]);
    assert_eq!(recorder.completed.lock()[0].1 - start, Duration::from_millis(6000));
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_scan_counts_as_empty() {
    let doc = Document::new();
    let button = more_comments(&doc, "t1_a");
    let faults = Arc::new(Faults::default());
    faults.failing_scans.store(1, Ordering::SeqCst);
    let recorder = Arc::new(Recorder::default());
    let controller = faulty_controller(&doc, &faults, &recorder);

    let start = Instant::now();
    controller.start();
    assert_eq!(controller.wait().await, RunState::Completed);

    // The short grace re-check finds the button as a false alarm.
    assert_eq!(doc.activation_count(button), 1);
    assert_eq!(recorder.completions(), vec![1]);
    assert_eq!(recorder.completed.lock()[0].1 - start, Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn test_vanished_candidate_still_counts() {
    let doc = Document::new();
    let gone = more_comments(&doc, "t1_gone");
    let kept = more_comments(&doc, "t1_kept");
    let faults = Arc::new(Faults::default());
    faults.gone.lock().insert(gone);
    let recorder = Arc::new(Recorder::default());
    let controller = faulty_controller(&doc, &faults, &recorder);

    controller.start();
    assert_eq!(controller.wait().await, RunState::Completed);

    assert_eq!(doc.activation_count(gone), 0);
    assert_eq!(doc.activation_count(kept), 1);
    assert_eq!(*recorder.progress.lock(), vec![(1, 2), (2, 2)]);
    assert_eq!(recorder.completions(), vec![2]);
    assert_eq!(
        controller.counters(),
        Counters {
            discovered: 2,
            actuated: 2
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_unmarkable_candidates_count_without_firing() {
    let doc = Document::new();
    let buttons = [more_comments(&doc, "t1_a"), more_comments(&doc, "t1_b")];
    let markers = Arc::new(ReadOnlyMarkers(AttributeMarkers::new(doc.clone(), MARKER)));
    let recorder = Arc::new(Recorder::default());
    let controller = Controller::new(Arc::new(doc.clone()), markers, ExpanderConfig::default())
        .unwrap()
        .with_observer(recorder.clone());

    let start = Instant::now();
    controller.start();
    assert_eq!(controller.wait().await, RunState::Completed);

    for button in buttons {
        assert_eq!(doc.activation_count(button), 0);
    }
    assert_eq!(recorder.completions(), vec![2]);
    assert!(controller.counters().is_settled());
    assert_eq!(recorder.completed.lock()[0].1 - start, Duration::from_millis(3200));
}

#[tokio::test(start_paused = true)]
async fn test_restart_waits_for_action_in_flight() {
    let doc = Document::new();
    let first = more_comments(&doc, "t1_a");
    let second = more_comments(&doc, "t1_b");
    let faults = Arc::new(Faults::default());
    *faults.activate_delay.lock() = Some(Duration::from_millis(100));
    let recorder = Arc::new(Recorder::default());
    let controller = faulty_controller(&doc, &faults, &recorder);

    controller.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(controller.stop());
    assert!(controller.start());
    assert_eq!(controller.wait().await, RunState::Completed);

    assert_eq!(faults.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(doc.activation_count(first), 1);
    assert_eq!(doc.activation_count(second), 1);
    assert_eq!(recorder.completions(), vec![1]);
}
