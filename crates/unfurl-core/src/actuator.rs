//! Sequential, throttled actuation of discovered candidates.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use unfurl_protocols::{DocumentTree, MarkerStore};

/// Outcome of one actuation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actuation<N> {
    /// Marked and activated.
    Fired(N),
    /// Marked, but the action could not be dispatched (node gone or the
    /// backend refused). Still counts as actuated.
    Skipped(N),
    /// The marker could not be written, so the action was not fired.
    /// Still counts as actuated so the run can settle.
    Unmarked(N),
}

impl<N> Actuation<N> {
    pub fn node(&self) -> &N {
        match self {
            Actuation::Fired(n) | Actuation::Skipped(n) | Actuation::Unmarked(n) => n,
        }
    }

    pub fn fired(&self) -> bool {
        matches!(self, Actuation::Fired(_))
    }
}

/// FIFO of candidates waiting to be actuated, paced by a fixed delay.
///
/// A node is queued at most once per actuator. The actuator itself never
/// sleeps: callers wait until [`Actuator::ready_at`] and then call
/// [`Actuator::actuate_next`], so other events can be handled in between.
pub struct Actuator<T: DocumentTree, M> {
    tree: Arc<T>,
    markers: Arc<M>,
    delay: Duration,
    queue: VecDeque<T::Node>,
    queued: HashSet<T::Node>,
    last_action: Option<Instant>,
}

impl<T, M> Actuator<T, M>
where
    T: DocumentTree,
    M: MarkerStore<T::Node>,
{
    pub fn new(tree: Arc<T>, markers: Arc<M>, delay: Duration) -> Self {
        Self {
            tree,
            markers,
            delay,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            last_action: None,
        }
    }

    /// Queue candidates not seen before. Returns how many were added.
    pub fn enqueue(&mut self, nodes: impl IntoIterator<Item = T::Node>) -> usize {
        let mut added = 0;
        for node in nodes {
            if self.queued.insert(node.clone()) {
                self.queue.push_back(node);
                added += 1;
            }
        }
        added
    }

    /// Whether the node was ever queued by this actuator.
    pub fn is_known(&self, node: &T::Node) -> bool {
        self.queued.contains(node)
    }

    /// Nothing left to actuate.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// When the next step may run, or `None` while the queue is empty.
    pub fn ready_at(&self) -> Option<Instant> {
        if self.queue.is_empty() {
            return None;
        }
        let now = Instant::now();
        Some(match self.last_action {
            Some(last) => (last + self.delay).max(now),
            None => now,
        })
    }

    /// Drop everything still queued.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Mark the next queued node, then fire its action.
    pub async fn actuate_next(&mut self) -> Option<Actuation<T::Node>> {
        let node = self.queue.pop_front()?;
        self.last_action = Some(Instant::now());

        if let Err(e) = self.markers.mark(&node).await {
            warn!("Failed to mark {:?}, not firing: {}", node, e);
            return Some(Actuation::Unmarked(node));
        }

        match self.tree.activate(&node).await {
            Ok(()) => Some(Actuation::Fired(node)),
            Err(e) if e.is_node_gone() => {
                debug!("Candidate vanished before activation: {:?}", node);
                Some(Actuation::Skipped(node))
            }
            Err(e) => {
                warn!("Activation of {:?} failed: {}", node, e);
                Some(Actuation::Skipped(node))
            }
        }
    }
}

#[cfg(test)]
#[path = "actuator_tests.rs"]
mod tests;
