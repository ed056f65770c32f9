//! [`DocumentTree`] implementation for the in-memory document.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use unfurl_protocols::{DocumentTree, MutationSubscription, Selector, TreeError};

use crate::document::{Document, NodeId};

#[async_trait]
impl DocumentTree for Document {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        Document::root(self)
    }

    async fn select_all(
        &self,
        scope: &NodeId,
        selector: &Selector,
    ) -> Result<Vec<NodeId>, TreeError> {
        Ok(self.query_selector_all(*scope, selector.as_str())?)
    }

    async fn encapsulated_roots(&self, scope: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        Ok(self.shadow_roots_under(*scope)?)
    }

    async fn matches(&self, node: &NodeId, selector: &Selector) -> Result<bool, TreeError> {
        Ok(Document::matches(self, *node, selector.as_str())?)
    }

    async fn closest(
        &self,
        node: &NodeId,
        selector: &Selector,
    ) -> Result<Option<NodeId>, TreeError> {
        Ok(Document::closest(self, *node, selector.as_str())?)
    }

    async fn activate(&self, node: &NodeId) -> Result<(), TreeError> {
        Ok(Document::activate(self, *node)?)
    }

    async fn observe(
        &self,
        scope: &NodeId,
        cancel: CancellationToken,
    ) -> Result<MutationSubscription<NodeId>, TreeError> {
        Ok(self.observe_until(*scope, cancel))
    }
}
