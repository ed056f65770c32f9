//! # unfurl Protocols
//!
//! Interface definitions shared by the expansion core and its tree backends.
//! Contains only contracts and plain data - no implementations.
//!
//! ## Core Traits
//!
//! - [`DocumentTree`] - Searchable, observable tree whose nodes carry actions
//! - [`MarkerStore`] - One-bit "processed" marker attached to nodes
//! - [`ExpansionObserver`] - Progress and completion notifications for the view layer

pub mod error;
pub mod marker;
pub mod mutation;
pub mod observer;
pub mod selector;
pub mod tree;
pub mod types;

pub use error::TreeError;
pub use marker::MarkerStore;
pub use mutation::{MutationBatch, MutationRecord, MutationSubscription};
pub use observer::{ExpansionObserver, NoopObserver};
pub use selector::Selector;
pub use tree::{DocumentTree, TreeNode};
pub use types::{Counters, RunState};
