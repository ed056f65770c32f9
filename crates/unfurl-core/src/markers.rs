//! Side-table marker store.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use unfurl_protocols::{MarkerStore, TreeError, TreeNode};

/// Processed markers kept next to the tree instead of on it, keyed by node
/// identity. Use it when nodes cannot carry extra data. Markers live as long
/// as the store, so share one store across runs to keep them.
#[derive(Debug)]
pub struct SideTableMarkers<N> {
    marked: Mutex<HashSet<N>>,
}

impl<N: TreeNode> SideTableMarkers<N> {
    pub fn new() -> Self {
        Self {
            marked: Mutex::new(HashSet::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.marked.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.lock().is_empty()
    }
}

impl<N: TreeNode> Default for SideTableMarkers<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<N: TreeNode> MarkerStore<N> for SideTableMarkers<N> {
    async fn is_marked(&self, node: &N) -> Result<bool, TreeError> {
        Ok(self.marked.lock().contains(node))
    }

    async fn mark(&self, node: &N) -> Result<(), TreeError> {
        self.marked.lock().insert(node.clone());
        Ok(())
    }
}
