//! Processed marker kept as an attribute on page nodes.

use async_trait::async_trait;
use serde_json::json;

use unfurl_protocols::{MarkerStore, TreeError};

use crate::tree::{CdpTree, NodeHandle};

/// Marks nodes by setting `attribute="true"` on the page element, so the
/// marker survives across runs and separate processes.
#[derive(Clone)]
pub struct DatasetMarkers {
    tree: CdpTree,
    attribute: String,
}

impl DatasetMarkers {
    pub fn new(tree: CdpTree, attribute: impl Into<String>) -> Self {
        Self {
            tree,
            attribute: attribute.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

#[async_trait]
impl MarkerStore<NodeHandle> for DatasetMarkers {
    async fn is_marked(&self, node: &NodeHandle) -> Result<bool, TreeError> {
        self.tree
            .call("isMarked", &[json!(node), json!(self.attribute)], None)
            .await
    }

    async fn mark(&self, node: &NodeHandle) -> Result<(), TreeError> {
        self.tree
            .call::<bool>("mark", &[json!(node), json!(self.attribute)], None)
            .await?;
        Ok(())
    }
}
