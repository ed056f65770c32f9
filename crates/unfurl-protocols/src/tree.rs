//! Tree-side contract the expansion core depends on.

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TreeError;
use crate::mutation::MutationSubscription;
use crate::selector::Selector;

/// Bounds for node handles: cheap to clone, compared by identity.
pub trait TreeNode: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> TreeNode for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// A searchable, observable tree whose nodes can carry actions.
///
/// Searches never cross encapsulation boundaries on their own; the core walks
/// into encapsulated sub-trees through [`DocumentTree::encapsulated_roots`].
#[async_trait]
pub trait DocumentTree: Send + Sync + 'static {
    type Node: TreeNode;

    /// The node scans and subscriptions start from.
    fn root(&self) -> Self::Node;

    /// Regular descendants of `scope` matching `selector`, in tree order.
    async fn select_all(
        &self,
        scope: &Self::Node,
        selector: &Selector,
    ) -> Result<Vec<Self::Node>, TreeError>;

    /// Roots of the encapsulated sub-trees hosted by `scope` or by any of its
    /// regular descendants. Sub-trees nested inside those roots are not listed.
    async fn encapsulated_roots(&self, scope: &Self::Node) -> Result<Vec<Self::Node>, TreeError>;

    /// Whether `node` itself matches `selector`.
    async fn matches(&self, node: &Self::Node, selector: &Selector) -> Result<bool, TreeError>;

    /// Nearest inclusive ancestor of `node` matching `selector`.
    async fn closest(
        &self,
        node: &Self::Node,
        selector: &Selector,
    ) -> Result<Option<Self::Node>, TreeError>;

    /// Invoke the node's action. Returns once the action was dispatched; its
    /// asynchronous effects show up later as mutations.
    async fn activate(&self, node: &Self::Node) -> Result<(), TreeError>;

    /// Subscribe to child-list changes anywhere in the subtree of `scope`.
    ///
    /// The subscription ends when `cancel` is cancelled or the returned
    /// subscription is dropped, whichever comes first.
    async fn observe(
        &self,
        scope: &Self::Node,
        cancel: CancellationToken,
    ) -> Result<MutationSubscription<Self::Node>, TreeError>;
}
