//! Error types for the unfurl protocol layer.

mod tree;

pub use tree::*;
