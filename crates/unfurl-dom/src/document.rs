//! Arena document with shadow roots, activation handlers and mutation observers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use unfurl_protocols::{MutationBatch, MutationRecord, MutationSubscription};

use crate::error::DomError;
use crate::selector::{ElementView, SelectorList};

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;

/// Handle to a node of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Action run when a node is activated. Receives the document and the node.
pub type ActivationHandler = Arc<dyn Fn(&Document, NodeId) + Send + Sync>;

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    ShadowRoot {
        host: NodeId,
    },
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    shadow_root: Option<NodeId>,
    activations: u64,
}

#[derive(Default)]
struct DomState {
    nodes: Vec<NodeData>,
    handlers: HashMap<NodeId, ActivationHandler>,
}

struct ObserverEntry {
    scope: NodeId,
    sender: mpsc::UnboundedSender<MutationBatch<NodeId>>,
    cancel: CancellationToken,
}

/// Shared, cloneable in-memory document.
///
/// Clones refer to the same tree. All operations take `&self`; activation
/// handlers may mutate the document they are called with.
#[derive(Clone)]
pub struct Document {
    state: Arc<RwLock<DomState>>,
    observers: Arc<Mutex<Vec<ObserverEntry>>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.state.read().nodes.len())
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}

impl ElementView for DomState {
    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    fn attr(&self, node: NodeId, key: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(key).map(String::as_str),
            _ => None,
        }
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(node.0)?.parent?;
        self.tag_name(parent).map(|_| parent)
    }
}

impl DomState {
    fn node(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
            shadow_root: None,
            activations: 0,
        });
        id
    }

    /// Inclusive ancestor check through regular parents only.
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current.0).and_then(|n| n.parent);
        }
        false
    }

    /// Connected to the document, crossing shadow boundaries through hosts.
    fn is_connected(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            let Some(data) = self.nodes.get(current.0) else {
                return false;
            };
            cursor = match data.kind {
                NodeKind::Document => return true,
                NodeKind::ShadowRoot { host } => Some(host),
                NodeKind::Element { .. } => data.parent,
            };
        }
        false
    }

    /// Regular descendants of `scope` in tree order, excluding `scope`.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .nodes
            .get(scope.0)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(id.0) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }
}

impl Document {
    /// Create an empty document. Its root is the document node.
    pub fn new() -> Self {
        let mut state = DomState::default();
        state.push(NodeKind::Document);
        Self {
            state: Arc::new(RwLock::new(state)),
            observers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.state.write().push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
        })
    }

    /// Create an element with attributes and append it to `parent`.
    pub fn element(
        &self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<NodeId, DomError> {
        let id = self.create_element(tag);
        for (key, value) in attrs {
            self.set_attribute(id, key, value)?;
        }
        self.append(parent, id)?;
        Ok(id)
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        {
            let mut state = self.state.write();
            state.node(parent)?;
            let data = state.node(child)?;
            if data.parent.is_some() || matches!(data.kind, NodeKind::Document) {
                return Err(DomError::AlreadyAttached(child));
            }
            if let NodeKind::ShadowRoot { .. } = data.kind {
                return Err(DomError::AlreadyAttached(child));
            }
            if state.is_inclusive_ancestor(child, parent) {
                return Err(DomError::Cycle { parent, child });
            }
            state.node_mut(child)?.parent = Some(parent);
            state.node_mut(parent)?.children.push(child);
        }
        trace!("append {:?} -> {:?}", child, parent);
        self.notify(parent, MutationRecord::added(vec![child]));
        Ok(())
    }

    /// Detach `node` from its parent.
    pub fn remove(&self, node: NodeId) -> Result<(), DomError> {
        let parent = {
            let mut state = self.state.write();
            let Some(parent) = state.node(node)?.parent else {
                return Ok(());
            };
            state.node_mut(parent)?.children.retain(|c| *c != node);
            state.node_mut(node)?.parent = None;
            parent
        };
        self.notify(parent, MutationRecord::removed(1));
        Ok(())
    }

    /// Attach an open shadow root to an element.
    pub fn attach_shadow(&self, host: NodeId) -> Result<NodeId, DomError> {
        let mut state = self.state.write();
        let data = state.node(host)?;
        if !matches!(data.kind, NodeKind::Element { .. }) {
            return Err(DomError::NotAnElement(host));
        }
        if data.shadow_root.is_some() {
            return Err(DomError::ShadowRootExists(host));
        }
        let root = state.push(NodeKind::ShadowRoot { host });
        state.node_mut(host)?.shadow_root = Some(root);
        Ok(root)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.state.read().nodes.get(host.0)?.shadow_root
    }

    pub fn set_attribute(&self, node: NodeId, key: &str, value: &str) -> Result<(), DomError> {
        let mut state = self.state.write();
        match &mut state.node_mut(node)?.kind {
            NodeKind::Element { attrs, .. } => {
                attrs.insert(key.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(DomError::NotAnElement(node)),
        }
    }

    pub fn remove_attribute(&self, node: NodeId, key: &str) -> Result<(), DomError> {
        let mut state = self.state.write();
        match &mut state.node_mut(node)?.kind {
            NodeKind::Element { attrs, .. } => {
                attrs.remove(key);
                Ok(())
            }
            _ => Err(DomError::NotAnElement(node)),
        }
    }

    pub fn attribute(&self, node: NodeId, key: &str) -> Option<String> {
        self.state.read().attr(node, key).map(str::to_string)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.state.read().tag_name(node).map(str::to_string)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.state.read().nodes.get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.state
            .read()
            .nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Whether the node is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.state.read().is_connected(node)
    }

    /// Install the action run when `node` is activated.
    pub fn on_activate<F>(&self, node: NodeId, handler: F)
    where
        F: Fn(&Document, NodeId) + Send + Sync + 'static,
    {
        self.state.write().handlers.insert(node, Arc::new(handler));
    }

    /// How many times `node` was activated.
    pub fn activation_count(&self, node: NodeId) -> u64 {
        self.state
            .read()
            .nodes
            .get(node.0)
            .map(|n| n.activations)
            .unwrap_or(0)
    }

    /// Activate a connected node, running its handler if one is installed.
    pub fn activate(&self, node: NodeId) -> Result<(), DomError> {
        let handler = {
            let mut state = self.state.write();
            if !state.is_connected(node) {
                return Err(DomError::UnknownNode(node));
            }
            state.node_mut(node)?.activations += 1;
            state.handlers.get(&node).cloned()
        };
        if let Some(handler) = handler {
            handler(self, node);
        }
        Ok(())
    }

    /// Regular descendants of `scope` matching `selector`, in tree order.
    pub fn query_selector_all(
        &self,
        scope: NodeId,
        selector: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        let state = self.state.read();
        state.node(scope)?;
        Ok(state
            .descendants(scope)
            .into_iter()
            .filter(|id| list.matches(&*state, *id))
            .collect())
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        let list = SelectorList::parse(selector)?;
        let state = self.state.read();
        state.node(node)?;
        Ok(list.matches(&*state, node))
    }

    /// Nearest inclusive ancestor element matching `selector`. Does not leave
    /// the node's own tree.
    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        let state = self.state.read();
        state.node(node)?;
        let mut cursor = state.tag_name(node).map(|_| node);
        while let Some(current) = cursor {
            if list.matches(&*state, current) {
                return Ok(Some(current));
            }
            cursor = state.parent_element(current);
        }
        Ok(None)
    }

    /// Shadow roots hosted by `scope` or its regular descendants.
    pub fn shadow_roots_under(&self, scope: NodeId) -> Result<Vec<NodeId>, DomError> {
        let state = self.state.read();
        let data = state.node(scope)?;
        let mut roots: Vec<NodeId> = data.shadow_root.into_iter().collect();
        roots.extend(
            state
                .descendants(scope)
                .into_iter()
                .filter_map(|id| state.nodes.get(id.0).and_then(|n| n.shadow_root)),
        );
        Ok(roots)
    }

    /// Observe child-list changes in the subtree of `scope`. Changes inside
    /// shadow trees are not reported to observers outside them.
    pub fn observe(&self, scope: NodeId) -> MutationSubscription<NodeId> {
        self.observe_until(scope, CancellationToken::new())
    }

    /// Like [`Document::observe`], ending when `cancel` is cancelled.
    pub fn observe_until(
        &self,
        scope: NodeId,
        cancel: CancellationToken,
    ) -> MutationSubscription<NodeId> {
        let (sender, subscription) = MutationSubscription::channel(cancel.clone());
        self.observers.lock().push(ObserverEntry {
            scope,
            sender,
            cancel,
        });
        subscription
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        let mut observers = self.observers.lock();
        observers.retain(|o| !o.cancel.is_cancelled() && !o.sender.is_closed());
        observers.len()
    }

    fn notify(&self, target: NodeId, record: MutationRecord<NodeId>) {
        let state = self.state.read();
        let mut observers = self.observers.lock();
        observers.retain(|o| !o.cancel.is_cancelled() && !o.sender.is_closed());
        for observer in observers.iter() {
            if state.is_inclusive_ancestor(observer.scope, target) {
                let _ = observer
                    .sender
                    .send(MutationBatch::new(vec![record.clone()]));
            }
        }
    }
}
