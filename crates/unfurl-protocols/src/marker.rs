//! Processed-marker storage.
//!
//! The marker is a one-bit flag keyed by node identity. Backends may keep it on
//! the node itself (an attribute) or in a side table when nodes cannot carry
//! extra data.

use async_trait::async_trait;

use crate::error::TreeError;

/// Storage for the one-shot "processed" marker.
#[async_trait]
pub trait MarkerStore<N>: Send + Sync
where
    N: Send + Sync,
{
    /// Check whether the node was marked.
    async fn is_marked(&self, node: &N) -> Result<bool, TreeError>;

    /// Mark the node. Marking twice is not an error.
    async fn mark(&self, node: &N) -> Result<(), TreeError>;
}
