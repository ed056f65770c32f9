//! [`DocumentTree`] over a live page.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use unfurl_protocols::{
    DocumentTree, MutationBatch, MutationRecord, MutationSubscription, Selector, TreeError,
};

use crate::cdp::{BindingCalled, CdpError, CdpEvent, PageSession};
use crate::script::{BINDING_NAME, HELPER_SCRIPT, helper_call};

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;

/// Handle of a page node in the helper's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub u64);

impl NodeHandle {
    pub const DOCUMENT: NodeHandle = NodeHandle(0);
}

/// Live page tree driven through a [`PageSession`].
#[derive(Clone)]
pub struct CdpTree {
    session: Arc<PageSession>,
    next_observer: Arc<AtomicU64>,
}

impl CdpTree {
    /// Install the page-side helper and its mutation binding.
    ///
    /// The helper is also registered for future documents, so a reload keeps
    /// working (with a fresh handle table).
    pub async fn attach(session: Arc<PageSession>) -> Result<Self, CdpError> {
        session.add_binding(BINDING_NAME).await?;
        session.add_script_on_new_document(HELPER_SCRIPT).await?;
        session.evaluate(HELPER_SCRIPT).await?;
        debug!("Installed page helper in session {}", session.session_id());

        Ok(Self {
            session,
            next_observer: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn session(&self) -> &Arc<PageSession> {
        &self.session
    }

    /// Call a helper function and decode its return value.
    pub(crate) async fn call<R: DeserializeOwned>(
        &self,
        function: &str,
        args: &[Value],
        selector: Option<&Selector>,
    ) -> Result<R, TreeError> {
        let value = self
            .session
            .evaluate(&helper_call(function, args))
            .await
            .map_err(|e| to_tree_error(e, selector))?;
        serde_json::from_value(value).map_err(|e| {
            TreeError::Backend(format!("{} returned unexpected value: {}", function, e))
        })
    }
}

/// Map a failed helper call onto the tree error it stands for.
fn to_tree_error(err: CdpError, selector: Option<&Selector>) -> TreeError {
    if let CdpError::JavaScript(message) = &err {
        if message.contains("node gone") {
            return TreeError::NodeGone(message.clone());
        }
        if let Some(selector) = selector {
            if message.starts_with("SyntaxError") || message.contains("not a valid selector") {
                return TreeError::invalid_selector(selector.as_str(), message.clone());
            }
        }
    }
    TreeError::Backend(err.to_string())
}

#[derive(Debug, Deserialize)]
struct MutationPayload {
    observer: u64,
    records: Vec<RecordPayload>,
}

#[derive(Debug, Deserialize)]
struct RecordPayload {
    added: Vec<NodeHandle>,
    removed: usize,
}

/// Decode a binding call posted by observer `observer`. Other events give `None`.
fn parse_mutation_event(event: &CdpEvent, observer: u64) -> Option<MutationBatch<NodeHandle>> {
    if event.method != "Runtime.bindingCalled" {
        return None;
    }
    let call: BindingCalled = serde_json::from_value(event.params.clone()).ok()?;
    if call.name != BINDING_NAME {
        return None;
    }
    let payload: MutationPayload = match serde_json::from_str(&call.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Malformed mutation payload: {}", e);
            return None;
        }
    };
    if payload.observer != observer {
        return None;
    }
    let records = payload
        .records
        .into_iter()
        .map(|r| MutationRecord {
            added: r.added,
            removed: r.removed,
        })
        .collect();
    Some(MutationBatch::new(records))
}

#[async_trait]
impl DocumentTree for CdpTree {
    type Node = NodeHandle;

    fn root(&self) -> NodeHandle {
        NodeHandle::DOCUMENT
    }

    async fn select_all(
        &self,
        scope: &NodeHandle,
        selector: &Selector,
    ) -> Result<Vec<NodeHandle>, TreeError> {
        self.call(
            "selectAll",
            &[json!(scope), json!(selector.as_str())],
            Some(selector),
        )
        .await
    }

    async fn encapsulated_roots(&self, scope: &NodeHandle) -> Result<Vec<NodeHandle>, TreeError> {
        self.call("shadowRoots", &[json!(scope)], None).await
    }

    async fn matches(&self, node: &NodeHandle, selector: &Selector) -> Result<bool, TreeError> {
        self.call("matches", &[json!(node), json!(selector.as_str())], Some(selector))
            .await
    }

    async fn closest(
        &self,
        node: &NodeHandle,
        selector: &Selector,
    ) -> Result<Option<NodeHandle>, TreeError> {
        self.call("closest", &[json!(node), json!(selector.as_str())], Some(selector))
            .await
    }

    async fn activate(&self, node: &NodeHandle) -> Result<(), TreeError> {
        self.call::<bool>("activate", &[json!(node)], None).await?;
        Ok(())
    }

    async fn observe(
        &self,
        scope: &NodeHandle,
        cancel: CancellationToken,
    ) -> Result<MutationSubscription<NodeHandle>, TreeError> {
        let observer = self.next_observer.fetch_add(1, Ordering::Relaxed);
        // Subscribe before the observer exists so no record is missed.
        let mut events = self.session.events();
        self.call::<bool>("observe", &[json!(scope), json!(observer)], None)
            .await?;

        let (tx, subscription) = MutationSubscription::channel(cancel.clone());
        let tree = self.clone();

        tokio::spawn(async move {
            let page_alive = loop {
                tokio::select! {
                    _ = cancel.cancelled() => break true,
                    _ = tx.closed() => break true,
                    event = events.recv() => match event {
                        Ok(event) => {
                            if let Some(batch) = parse_mutation_event(&event, observer) {
                                if tx.send(batch).is_err() {
                                    break true;
                                }
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(
                                "Mutation observer {} lagged, {} events dropped",
                                observer, skipped
                            );
                        }
                        Err(RecvError::Closed) => break false,
                    },
                }
            };

            if page_alive {
                let released = tree
                    .call::<bool>("disconnect", &[json!(observer)], None)
                    .await;
                if let Err(e) = released {
                    debug!("Failed to disconnect observer {}: {}", observer, e);
                }
            }
            debug!("Mutation observer {} released", observer);
        });

        Ok(subscription)
    }
}
