//! Failures of the browser connection and page session.

use thiserror::Error;

/// Errors from talking to the browser. [`crate::tree`] maps them onto
/// `TreeError` for the expansion core.
#[derive(Debug, Error)]
pub enum CdpError {
    /// The debugging socket could not be opened.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Nothing answers on the debugging endpoint.
    #[error("No browser at {0}. Launch it with --remote-debugging-port=9222 and retry")]
    ChromeNotAvailable(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The browser rejected a command.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Endpoint discovery over HTTP failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// `--attach` found no open page with a matching URL.
    #[error("No open page matches {0}")]
    PageNotFound(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// An exception thrown by the page helper or an evaluated expression.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The socket closed while a command was pending.
    #[error("Session closed")]
    SessionClosed,

    /// A reply was missing a field the command promises.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = CdpError::Protocol {
            code: -32000,
            message: "Could not find node with given id".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("Could not find node with given id"));
        assert!(display.contains("-32000"));
    }

    #[test]
    fn test_missing_browser_hint() {
        let err = CdpError::ChromeNotAvailable("http://localhost:9222".to_string());
        let display = err.to_string();
        assert!(display.contains("http://localhost:9222"));
        assert!(display.contains("--remote-debugging-port"));
    }

    #[test]
    fn test_page_not_found_names_url() {
        let err = CdpError::PageNotFound("reddit.com/r/rust".to_string());
        assert_eq!(err.to_string(), "No open page matches reddit.com/r/rust");
    }

    #[test]
    fn test_url_parse_error_from() {
        let err = CdpError::from(url::Url::parse("not a url").unwrap_err());
        assert!(matches!(err, CdpError::ConnectionFailed(_)));
    }
}
