//! Processed marker stored as an attribute on the node.

use async_trait::async_trait;
use unfurl_protocols::{MarkerStore, TreeError};

use crate::document::{Document, NodeId};

/// Marker kept as an attribute on the element itself, so it survives
/// independently of any controller.
#[derive(Debug, Clone)]
pub struct AttributeMarkers {
    document: Document,
    attribute: String,
}

impl AttributeMarkers {
    pub fn new(document: Document, attribute: impl Into<String>) -> Self {
        Self {
            document,
            attribute: attribute.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

#[async_trait]
impl MarkerStore<NodeId> for AttributeMarkers {
    async fn is_marked(&self, node: &NodeId) -> Result<bool, TreeError> {
        Ok(self.document.attribute(*node, &self.attribute).is_some())
    }

    async fn mark(&self, node: &NodeId) -> Result<(), TreeError> {
        Ok(self.document.set_attribute(*node, &self.attribute, "true")?)
    }
}
