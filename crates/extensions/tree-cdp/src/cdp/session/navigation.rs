//! Loading the thread page before a run.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;

use super::core::PageSession;

/// Interval between `readyState` checks.
const READY_POLL: Duration = Duration::from_millis(100);

impl PageSession {
    /// Open `url` in this page and return once its DOM can be scanned.
    pub async fn navigate(&self, url: &str, load_timeout: Duration) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(reason) = result.get("errorText").and_then(|e| e.as_str()) {
            return Err(CdpError::NavigationFailed(format!("{}: {}", url, reason)));
        }

        self.wait_for_load(load_timeout).await?;
        debug!("Page ready at {}", url);
        Ok(())
    }

    /// Wait until the document is parsed. Comment threads keep loading
    /// after that point; the expansion run picks those up through
    /// mutations, so `interactive` is enough.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        let start = Instant::now();
        loop {
            let state = self.evaluate("document.readyState").await?;
            if state.as_str().is_some_and(Self::is_loaded) {
                return Ok(());
            }
            if start.elapsed() > timeout {
                return Err(CdpError::Timeout(format!(
                    "document not ready after {:?}",
                    timeout
                )));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    pub(super) fn is_loaded(ready_state: &str) -> bool {
        matches!(ready_state, "complete" | "interactive")
    }

    pub async fn get_url(&self) -> Result<String, CdpError> {
        let href = self.evaluate("window.location.href").await?;
        Ok(href.as_str().unwrap_or_default().to_string())
    }

    /// Title shown in the final summary line.
    pub async fn get_title(&self) -> Result<String, CdpError> {
        let title = self.evaluate("document.title").await?;
        Ok(title.as_str().unwrap_or_default().to_string())
    }
}
