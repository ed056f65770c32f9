//! Chrome DevTools Protocol backend for unfurl.
//!
//! Runs the expansion controller against a live page: [`CdpTree`] installs a
//! small page-side helper that hands out integer node handles, answers
//! selector queries per scope, lists open shadow roots, clicks nodes and
//! forwards `MutationObserver` records back through a CDP binding.
//!
//! ## Setup
//!
//! Start Chrome with remote debugging enabled:
//!
//! ```bash
//! # macOS
//! /Applications/Google\ Chrome.app/Contents/MacOS/Google\ Chrome --remote-debugging-port=9222
//!
//! # Linux
//! google-chrome --remote-debugging-port=9222
//! ```
//!
//! Using your everyday profile keeps logins, so pages that need a session
//! expand the same way they do in the browser.
//!
//! ## Example
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://localhost:9222").await?;
//! let page = Arc::new(client.new_page(Some(url)).await?);
//! let tree = Arc::new(CdpTree::attach(Arc::clone(&page)).await?);
//! let markers = Arc::new(DatasetMarkers::new((*tree).clone(), "data-unfurl-processed"));
//! ```

pub mod cdp;
mod markers;
mod script;
mod tree;

pub use cdp::{CdpClient, CdpError, PageSession};
pub use markers::DatasetMarkers;
pub use script::BINDING_NAME;
pub use tree::{CdpTree, NodeHandle};
