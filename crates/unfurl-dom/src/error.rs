//! Document errors.

use thiserror::Error;
use unfurl_protocols::TreeError;

use crate::document::NodeId;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0:?} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Node {0:?} already hosts a shadow root")]
    ShadowRootExists(NodeId),

    #[error("Inserting {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("Unsupported selector: {0}")]
    UnsupportedSelector(String),
}

impl From<DomError> for TreeError {
    fn from(e: DomError) -> Self {
        match e {
            DomError::UnknownNode(id) => TreeError::NodeGone(format!("{:?}", id)),
            DomError::UnsupportedSelector(s) => {
                TreeError::invalid_selector(s, "unsupported by the in-memory engine")
            }
            other => TreeError::Backend(other.to_string()),
        }
    }
}
