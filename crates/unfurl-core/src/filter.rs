//! Candidate filtering: exclusion regions and processed markers.

use std::sync::Arc;

use tracing::debug;
use unfurl_protocols::{DocumentTree, MarkerStore, Selector, TreeError};

/// Drops candidates that sit inside an excluded region or were already
/// processed. Nothing is cached; every call reads the tree afresh.
pub struct CandidateFilter<T: DocumentTree, M> {
    tree: Arc<T>,
    markers: Arc<M>,
    exclude: Selector,
}

impl<T, M> CandidateFilter<T, M>
where
    T: DocumentTree,
    M: MarkerStore<T::Node>,
{
    pub fn new(tree: Arc<T>, markers: Arc<M>, exclude: Selector) -> Self {
        Self {
            tree,
            markers,
            exclude,
        }
    }

    /// Whether a single candidate is still worth actuating.
    pub async fn is_eligible(&self, node: &T::Node) -> Result<bool, TreeError> {
        if self.tree.closest(node, &self.exclude).await?.is_some() {
            return Ok(false);
        }
        Ok(!self.markers.is_marked(node).await?)
    }

    /// Keep eligible candidates, preserving order. A candidate whose check
    /// fails is dropped.
    pub async fn retain(&self, candidates: Vec<T::Node>) -> Vec<T::Node> {
        let mut kept = Vec::with_capacity(candidates.len());
        for node in candidates {
            match self.is_eligible(&node).await {
                Ok(true) => kept.push(node),
                Ok(false) => {}
                Err(e) => debug!("Dropping candidate {:?}: {}", node, e),
            }
        }
        kept
    }
}
