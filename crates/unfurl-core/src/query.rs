//! Candidate search across encapsulated sub-trees.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace};
use unfurl_protocols::{DocumentTree, Selector, TreeError};

/// Searches a scope and every encapsulated sub-tree beneath it.
///
/// An ordinary `select_all` stops at encapsulation boundaries. `TreeQuery`
/// keeps a worklist of (scope, depth) pairs: each scope is searched, and the
/// roots of the sub-trees it hosts are pushed one level deeper. Sub-trees
/// nested deeper than `max_depth` are not visited.
pub struct TreeQuery<T: DocumentTree> {
    tree: Arc<T>,
    max_depth: usize,
}

impl<T: DocumentTree> Clone for TreeQuery<T> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            max_depth: self.max_depth,
        }
    }
}

impl<T: DocumentTree> TreeQuery<T> {
    pub fn new(tree: Arc<T>, max_depth: usize) -> Self {
        Self { tree, max_depth }
    }

    pub fn tree(&self) -> &Arc<T> {
        &self.tree
    }

    /// All nodes under `scope` matching `selector`, each exactly once.
    ///
    /// Side-effect free. A nested scope that disappears mid-walk is skipped;
    /// any other failure aborts the search.
    pub async fn find_all(
        &self,
        scope: &T::Node,
        selector: &Selector,
    ) -> Result<Vec<T::Node>, TreeError> {
        let mut found = Vec::new();
        let mut seen: HashSet<T::Node> = HashSet::new();
        let mut visited: HashSet<T::Node> = HashSet::new();
        let mut worklist: VecDeque<(T::Node, usize)> = VecDeque::from([(scope.clone(), 0)]);

        while let Some((current, depth)) = worklist.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }

            let matches = match self.tree.select_all(&current, selector).await {
                Ok(matches) => matches,
                Err(e) if depth > 0 && e.is_node_gone() => {
                    trace!("Encapsulated scope vanished during scan: {:?}", current);
                    continue;
                }
                Err(e) => return Err(e),
            };
            found.extend(matches.into_iter().filter(|node| seen.insert(node.clone())));

            if depth >= self.max_depth {
                debug!(depth, "Nesting cap reached, not descending further");
                continue;
            }

            match self.tree.encapsulated_roots(&current).await {
                Ok(roots) => worklist.extend(roots.into_iter().map(|root| (root, depth + 1))),
                Err(e) if depth > 0 && e.is_node_gone() => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
