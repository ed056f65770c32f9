//! Wire messages exchanged with the browser over the debugging socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing command. `session_id` routes it to an attached page.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Anything the browser sends: a reply carries `id`, an event carries
/// `method` and `params`.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

impl CdpResponse {
    /// The message as an event, if it is one.
    pub fn into_event(self) -> Option<CdpEvent> {
        if self.id.is_some() {
            return None;
        }
        Some(CdpEvent {
            method: self.method?,
            params: self.params.unwrap_or(Value::Null),
        })
    }
}

/// Failure reported in a reply.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// An event delivered to a page session.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

/// Params of `Runtime.bindingCalled`, which carries the page helper's
/// mutation records.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingCalled {
    pub name: String,
    pub payload: String,
    pub execution_context_id: Option<i64>,
}

/// Entry of the `/json/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub url: String,
    pub web_socket_debugger_url: Option<String>,
}

/// The parts of `/json/version` needed to open the browser socket. The
/// endpoint uses PascalCase keys.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Thrown value in `exceptionDetails`.
#[derive(Debug, Clone, Deserialize)]
pub struct ThrownValue {
    pub description: Option<String>,
}

/// `exceptionDetails` of a failed `Runtime.evaluate`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionDetails {
    pub text: String,
    pub exception: Option<ThrownValue>,
}

impl ExceptionDetails {
    /// First line of the thrown error, so helper messages such as
    /// `node gone: 17` survive; otherwise the summary text.
    pub fn message(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.as_deref())
            .and_then(|d| d.lines().next())
            .unwrap_or(&self.text)
            .to_string()
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
