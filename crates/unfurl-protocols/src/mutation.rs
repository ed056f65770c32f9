//! Structural change notifications.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One structural change: nodes added under a single parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
    /// Nodes inserted by this change.
    pub added: Vec<N>,
    /// Number of nodes removed by this change. Removals never matter for
    /// discovery, so only the count is kept.
    pub removed: usize,
}

impl<N> MutationRecord<N> {
    pub fn added(added: Vec<N>) -> Self {
        Self { added, removed: 0 }
    }

    pub fn removed(count: usize) -> Self {
        Self {
            added: Vec::new(),
            removed: count,
        }
    }
}

/// Records delivered together in one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch<N> {
    pub records: Vec<MutationRecord<N>>,
}

impl<N> MutationBatch<N> {
    pub fn new(records: Vec<MutationRecord<N>>) -> Self {
        Self { records }
    }

    /// All added nodes, in record order.
    pub fn added_nodes(&self) -> impl Iterator<Item = &N> {
        self.records.iter().flat_map(|r| r.added.iter())
    }
}

/// A live subscription to mutation batches.
///
/// Dropping the subscription or calling [`MutationSubscription::unsubscribe`]
/// stops delivery immediately; batches already queued are discarded.
pub struct MutationSubscription<N> {
    receiver: mpsc::UnboundedReceiver<MutationBatch<N>>,
    cancel: CancellationToken,
}

impl<N> MutationSubscription<N> {
    /// Build a subscription from a batch channel. Backends watch `cancel` to
    /// release their side of the subscription.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<MutationBatch<N>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { receiver, cancel }
    }

    /// Create a channel-backed subscription; returns the sender for the backend.
    pub fn channel(cancel: CancellationToken) -> (mpsc::UnboundedSender<MutationBatch<N>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx, cancel))
    }

    /// Next batch, or `None` once unsubscribed or the backend closed.
    pub async fn next_batch(&mut self) -> Option<MutationBatch<N>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            batch = self.receiver.recv() => batch,
        }
    }

    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Token cancelled when this subscription ends.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<N> Drop for MutationSubscription<N> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_delivers_batches() {
        let (tx, mut sub) = MutationSubscription::channel(CancellationToken::new());
        tx.send(MutationBatch::new(vec![MutationRecord::added(vec![1u32, 2])]))
            .unwrap();

        let batch = sub.next_batch().await.unwrap();
        assert_eq!(batch.added_nodes().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unsubscribe_discards_queued_batches() {
        let (tx, mut sub) = MutationSubscription::channel(CancellationToken::new());
        tx.send(MutationBatch::new(vec![MutationRecord::added(vec![7u32])]))
            .unwrap();

        sub.unsubscribe();
        assert!(!sub.is_active());
        assert!(sub.next_batch().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_cancels_token() {
        let token = CancellationToken::new();
        let (_tx, sub) = MutationSubscription::<u32>::channel(token.clone());
        drop(sub);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_closed_backend_ends_stream() {
        let (tx, mut sub) = MutationSubscription::<u32>::channel(CancellationToken::new());
        drop(tx);
        assert!(sub.next_batch().await.is_none());
    }

    #[test]
    fn test_removed_record_has_no_added_nodes() {
        let batch = MutationBatch::new(vec![MutationRecord::<u32>::removed(3)]);
        assert_eq!(batch.added_nodes().count(), 0);
        assert_eq!(batch.records[0].removed, 3);
    }
}
