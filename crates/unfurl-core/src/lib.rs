//! # unfurl Core
//!
//! Incrementally discovers and triggers expansion actions on a mutating tree
//! and decides, without any end-of-stream signal, when no work is left.
//!
//! ## Components
//!
//! - [`TreeQuery`]: candidate search that walks into encapsulated sub-trees
//! - [`CandidateFilter`]: drops excluded and already processed candidates
//! - [`Actuator`]: sequential, throttled actuation queue
//! - [`Debouncer`] / [`MutationWatcher`]: mutation-driven re-scan requests
//! - [`QuiescenceDetector`]: two-tier grace timer with re-check on expiry
//! - [`Controller`]: run lifecycle, counters and notifications
//!
//! ## Scheduling
//!
//! Each run is driven by a single task that handles one event at a time:
//! mutation batches, debounced re-scans, actuation steps and quiescence
//! expiry. Shared state (markers, counters, the armed timer) is therefore
//! always observed fresh, and no two actions ever fire concurrently.
//!
//! Quiescence is a heuristic: "no new candidates for a grace period" stands in
//! for an end-of-stream signal the tree does not provide.
//!
//! ## Example
//!
//! ```rust,ignore
//! let controller = Controller::new(tree, markers, ExpanderConfig::default())?
//!     .with_observer(Arc::new(MyView));
//! controller.start();
//! let state = controller.wait().await;
//! ```

mod actuator;
mod config;
mod controller;
mod debounce;
mod error;
mod filter;
mod markers;
mod query;
mod quiescence;
mod run;
mod watcher;

pub use actuator::{Actuation, Actuator};
pub use config::ExpanderConfig;
pub use controller::Controller;
pub use debounce::Debouncer;
pub use error::ExpanderError;
pub use filter::CandidateFilter;
pub use markers::SideTableMarkers;
pub use query::TreeQuery;
pub use quiescence::{Grace, QuiescenceDetector};
pub use watcher::MutationWatcher;

// Re-export protocol types callers need alongside the controller.
pub use unfurl_protocols::{Counters, ExpansionObserver, RunState, Selector};
