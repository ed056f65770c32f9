//! Mutation watcher: decides which structural changes warrant a re-scan.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use unfurl_protocols::{DocumentTree, MutationBatch, MutationSubscription, Selector, TreeError};

/// Subscription to the tree plus the relevance check for its batches.
///
/// A batch is relevant when one of its added nodes matches the container
/// selector or contains a match. Scheduling the re-scan is left to the
/// caller's [`Debouncer`](crate::Debouncer).
pub struct MutationWatcher<T: DocumentTree> {
    tree: Arc<T>,
    container: Selector,
    subscription: Option<MutationSubscription<T::Node>>,
}

impl<T: DocumentTree> MutationWatcher<T> {
    /// A watcher that is not subscribed to anything yet.
    pub fn new(tree: Arc<T>, container: Selector) -> Self {
        Self {
            tree,
            container,
            subscription: None,
        }
    }

    /// Subscribe to changes under `scope`. The subscription ends when
    /// `cancel` fires or [`MutationWatcher::stop`] is called.
    pub async fn start(
        &mut self,
        scope: &T::Node,
        cancel: CancellationToken,
    ) -> Result<(), TreeError> {
        self.stop();
        self.subscription = Some(self.tree.observe(scope, cancel).await?);
        info!("Mutation watcher started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!("Mutation watcher stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(MutationSubscription::is_active)
    }

    /// Next batch. Never resolves while not subscribed; once the backend
    /// ends the stream the watcher drops its subscription.
    pub async fn next_batch(&mut self) -> Option<MutationBatch<T::Node>> {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };
        let batch = subscription.next_batch().await;
        if batch.is_none() {
            debug!("Mutation stream ended");
            self.subscription = None;
        }
        batch
    }

    /// Whether the batch may have introduced new candidates. Checks stop at
    /// the first relevant node.
    pub async fn is_relevant(&self, batch: &MutationBatch<T::Node>) -> bool {
        for node in batch.added_nodes() {
            match self.introduces_container(node).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => trace!("Skipping added node {:?}: {}", node, e),
            }
        }
        false
    }

    async fn introduces_container(&self, node: &T::Node) -> Result<bool, TreeError> {
        if self.tree.matches(node, &self.container).await? {
            return Ok(true);
        }
        Ok(!self.tree.select_all(node, &self.container).await?.is_empty())
    }
}

impl<T: DocumentTree> Drop for MutationWatcher<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;
    use unfurl_dom::Document;

    fn watcher(doc: &Document) -> MutationWatcher<Document> {
        MutationWatcher::new(
            Arc::new(doc.clone()),
            Selector::new("faceplate-partial").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_container_insertion_is_relevant() {
        let doc = Document::new();
        let root = doc.root();
        let mut watcher = watcher(&doc);
        watcher.start(&root, CancellationToken::new()).await.unwrap();

        doc.element(root, "faceplate-partial", &[]).unwrap();
        let batch = watcher.next_batch().await.unwrap();
        assert!(watcher.is_relevant(&batch).await);
    }

    #[tokio::test]
    async fn test_wrapped_container_is_relevant() {
        let doc = Document::new();
        let root = doc.root();
        let mut watcher = watcher(&doc);
        watcher.start(&root, CancellationToken::new()).await.unwrap();

        let wrapper = doc.create_element("shreddit-comment");
        let partial = doc.create_element("faceplate-partial");
        doc.append(wrapper, partial).unwrap();
        doc.append(root, wrapper).unwrap();

        let batch = watcher.next_batch().await.unwrap();
        assert!(watcher.is_relevant(&batch).await);
    }

    #[tokio::test]
    async fn test_unrelated_insertion_is_ignored() {
        let doc = Document::new();
        let root = doc.root();
        let mut watcher = watcher(&doc);
        watcher.start(&root, CancellationToken::new()).await.unwrap();

        doc.element(root, "p", &[]).unwrap();
        let batch = watcher.next_batch().await.unwrap();
        assert!(!watcher.is_relevant(&batch).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_unsubscribes_immediately() {
        let doc = Document::new();
        let root = doc.root();
        let mut watcher = watcher(&doc);
        let cancel = CancellationToken::new();
        watcher.start(&root, cancel.child_token()).await.unwrap();
        assert!(watcher.is_active());
        assert_eq!(doc.observer_count(), 1);

        cancel.cancel();
        assert!(!watcher.is_active());
        doc.element(root, "faceplate-partial", &[]).unwrap();
        assert_eq!(doc.observer_count(), 0);

        watcher.stop();
        let next = timeout(Duration::from_secs(5), watcher.next_batch()).await;
        assert!(next.is_err());
    }
}
