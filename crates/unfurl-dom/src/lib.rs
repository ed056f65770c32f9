//! In-memory document tree for unfurl.
//!
//! A small arena DOM: elements with attributes, open shadow roots, activation
//! handlers standing in for click listeners, and child-list mutation observers.
//! It implements [`DocumentTree`](unfurl_protocols::DocumentTree) so the
//! expansion core can run against it without a browser.
//!
//! ## Selectors
//!
//! A CSS subset is supported: type, `*`, `#id`, `.class`, `[attr]`,
//! `[attr=v]`, `[attr*=v]`, `[attr^=v]`, `[attr$=v]`, descendant and child
//! combinators, and comma-separated groups.

mod document;
mod error;
mod markers;
mod selector;
mod tree;

pub use document::{ActivationHandler, Document, NodeId};
pub use error::DomError;
pub use markers::AttributeMarkers;
