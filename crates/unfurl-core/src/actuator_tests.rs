use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use unfurl_dom::{AttributeMarkers, Document, NodeId};
use unfurl_protocols::{MarkerStore, TreeError};

use super::*;

struct RefusingMarkers;

#[async_trait]
impl MarkerStore<NodeId> for RefusingMarkers {
    async fn is_marked(&self, _node: &NodeId) -> Result<bool, TreeError> {
        Ok(false)
    }

    async fn mark(&self, _node: &NodeId) -> Result<(), TreeError> {
        Err(TreeError::Unsupported("read-only tree".to_string()))
    }
}

fn setup(count: usize) -> (Document, Vec<NodeId>) {
    let doc = Document::new();
    let root = doc.root();
    let nodes = (0..count)
        .map(|_| doc.element(root, "button", &[]).unwrap())
        .collect();
    (doc, nodes)
}

#[tokio::test]
async fn test_enqueue_dedupes_by_identity() {
    let (doc, nodes) = setup(2);
    let markers = Arc::new(AttributeMarkers::new(doc.clone(), "data-done"));
    let mut actuator = Actuator::new(Arc::new(doc), markers, Duration::ZERO);

    assert_eq!(actuator.enqueue(nodes.clone()), 2);
    assert_eq!(actuator.enqueue(nodes.clone()), 0);
    assert_eq!(actuator.pending(), 2);

    actuator.actuate_next().await.unwrap();
    // Already handled nodes are not queued again either.
    assert_eq!(actuator.enqueue(vec![nodes[0]]), 0);
}

#[tokio::test]
async fn test_actuate_marks_before_firing() {
    let (doc, nodes) = setup(1);
    let button = nodes[0];
    let seen_marker = Arc::new(parking_lot::Mutex::new(None));
    let seen = seen_marker.clone();
    doc.on_activate(button, move |doc, node| {
        *seen.lock() = doc.attribute(node, "data-done");
    });

    let markers = Arc::new(AttributeMarkers::new(doc.clone(), "data-done"));
    let mut actuator = Actuator::new(Arc::new(doc.clone()), markers, Duration::ZERO);
    actuator.enqueue(nodes);

    let outcome = actuator.actuate_next().await.unwrap();
    assert_eq!(outcome, Actuation::Fired(button));
    assert_eq!(seen_marker.lock().as_deref(), Some("true"));
    assert_eq!(doc.activation_count(button), 1);
    assert!(actuator.is_idle());
    assert!(actuator.actuate_next().await.is_none());
}

#[tokio::test]
async fn test_vanished_node_is_skipped() {
    let (doc, nodes) = setup(2);
    doc.remove(nodes[0]).unwrap();

    let markers = Arc::new(AttributeMarkers::new(doc.clone(), "data-done"));
    let mut actuator = Actuator::new(Arc::new(doc.clone()), markers, Duration::ZERO);
    actuator.enqueue(nodes.clone());

    assert_eq!(
        actuator.actuate_next().await,
        Some(Actuation::Skipped(nodes[0]))
    );
    assert_eq!(
        actuator.actuate_next().await,
        Some(Actuation::Fired(nodes[1]))
    );
}

#[tokio::test]
async fn test_failed_mark_does_not_fire() {
    let (doc, nodes) = setup(1);
    let mut actuator = Actuator::new(
        Arc::new(doc.clone()),
        Arc::new(RefusingMarkers),
        Duration::ZERO,
    );
    actuator.enqueue(nodes.clone());

    let outcome = actuator.actuate_next().await.unwrap();
    assert!(!outcome.fired());
    assert_eq!(outcome.node(), &nodes[0]);
    assert_eq!(doc.activation_count(nodes[0]), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ready_at_paces_actions() {
    let (doc, nodes) = setup(2);
    let markers = Arc::new(AttributeMarkers::new(doc.clone(), "data-done"));
    let mut actuator = Actuator::new(Arc::new(doc), markers, Duration::from_millis(200));
    assert!(actuator.ready_at().is_none());

    actuator.enqueue(nodes);
    let start = Instant::now();
    assert_eq!(actuator.ready_at(), Some(start));

    actuator.actuate_next().await.unwrap();
    assert_eq!(actuator.ready_at(), Some(start + Duration::from_millis(200)));

    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(actuator.ready_at(), Some(Instant::now()));

    actuator.clear();
    assert!(actuator.ready_at().is_none());
}
