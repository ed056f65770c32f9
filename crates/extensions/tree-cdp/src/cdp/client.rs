//! CDP WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::error::CdpError;
use super::protocol::{BrowserVersion, PageInfo};
use super::session::PageSession;
use super::transport::Transport;

/// Default timeout for a single CDP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// CDP client for browser automation.
///
/// Holds one WebSocket to the browser; page sessions share it.
pub struct CdpClient {
    /// HTTP endpoint for page discovery.
    http_endpoint: String,
    transport: Arc<Transport>,
    /// Background receive task.
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given endpoint (e.g. `http://localhost:9222`).
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        Self::connect_with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Connect with a custom per-request timeout.
    pub async fn connect_with_timeout(
        endpoint: &str,
        request_timeout: Duration,
    ) -> Result<Self, CdpError> {
        let http_endpoint = Url::parse(endpoint)?.as_str().trim_end_matches('/').to_string();

        // Get browser version info to find WebSocket URL
        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        info!("Connected to browser: {}", version.browser);

        let browser_ws_url = version.web_socket_debugger_url;
        let (ws_stream, _) = tokio_tungstenite::connect_async(&browser_ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let transport = Arc::new(Transport::new(ws_sink, request_timeout));
        let recv_task = tokio::spawn(Arc::clone(&transport).receive_loop(ws_source));

        debug!("CDP client connected to {}", browser_ws_url);

        Ok(Self {
            http_endpoint,
            transport,
            recv_task,
        })
    }

    /// List all open pages.
    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        let url = format!("{}/json/list", self.http_endpoint);
        let pages: Vec<PageInfo> = reqwest::get(&url).await?.json().await?;
        Ok(pages.into_iter().filter(|p| p.page_type == "page").collect())
    }

    /// Open a new tab, optionally at `url`, and attach to it.
    pub async fn new_page(&self, url: Option<&str>) -> Result<PageSession, CdpError> {
        // Chrome requires PUT method for /json/new
        let create_url = match url {
            Some(u) => format!("{}/json/new?{}", self.http_endpoint, u),
            None => format!("{}/json/new", self.http_endpoint),
        };

        let client = reqwest::Client::new();
        let page_info: PageInfo = client.put(&create_url).send().await?.json().await?;
        debug!("Created new page: {} - {}", page_info.id, page_info.url);

        self.attach_page(&page_info.id).await
    }

    /// Attach to an existing page.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .transport
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
                None,
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        self.transport.router().register(&session_id);
        let session = PageSession::new(
            target_id.to_string(),
            session_id,
            Arc::clone(&self.transport),
        );
        session.enable_domains().await?;

        Ok(session)
    }

    /// Attach to the first open page whose URL matches `url`, ignoring the
    /// fragment and a trailing slash.
    pub async fn attach_matching(&self, url: &str) -> Result<PageSession, CdpError> {
        let pages = self.list_pages().await?;
        let page = find_matching_page(&pages, url)?
            .ok_or_else(|| CdpError::PageNotFound(url.to_string()))?;
        info!("Attaching to open page: {}", page.title);
        self.attach_page(&page.id).await
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

fn normalize(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.as_str().trim_end_matches('/').to_string()
}

/// First page whose URL equals `url` after normalization.
fn find_matching_page<'a>(
    pages: &'a [PageInfo],
    url: &str,
) -> Result<Option<&'a PageInfo>, CdpError> {
    let wanted = normalize(&Url::parse(url)?);
    Ok(pages.iter().find(|page| {
        Url::parse(&page.url)
            .map(|u| normalize(&u) == wanted)
            .unwrap_or(false)
    }))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
