//! WebSocket transport shared by the client and its page sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{CdpEvent, CdpRequest, CdpResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type WsSource = SplitStream<WsStream>;

/// Events buffered per session before slow subscribers start lagging.
const SESSION_EVENT_CAPACITY: usize = 1024;

type PendingRequest = oneshot::Sender<Result<Value, CdpError>>;

/// Routes incoming messages: responses to their waiting request, events to
/// the session they belong to.
#[derive(Default)]
pub(crate) struct Router {
    pending: Mutex<HashMap<u64, PendingRequest>>,
    sessions: Mutex<HashMap<String, broadcast::Sender<CdpEvent>>>,
}

impl Router {
    pub(crate) fn expect(&self, id: u64) -> oneshot::Receiver<Result<Value, CdpError>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        rx
    }

    pub(crate) fn forget(&self, id: u64) {
        self.pending.lock().remove(&id);
    }

    /// Event sender for a session, created on first use.
    pub(crate) fn register(&self, session_id: &str) -> broadcast::Sender<CdpEvent> {
        self.sessions
            .lock()
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(SESSION_EVENT_CAPACITY).0)
            .clone()
    }

    pub(crate) fn unregister(&self, session_id: &str) {
        self.sessions.lock().remove(session_id);
    }

    pub(crate) fn route(&self, resp: CdpResponse) {
        if let Some(id) = resp.id {
            let Some(tx) = self.pending.lock().remove(&id) else {
                trace!("Response for unknown request {}", id);
                return;
            };
            let result = match resp.error {
                Some(error) => Err(CdpError::Protocol {
                    code: error.code,
                    message: error.message,
                }),
                None => Ok(resp.result.unwrap_or(Value::Null)),
            };
            let _ = tx.send(result);
            return;
        }

        let session_id = resp.session_id.clone().unwrap_or_default();
        if let Some(event) = resp.into_event() {
            if let Some(tx) = self.sessions.lock().get(&session_id) {
                // No subscriber is fine: events nobody listens to are dropped.
                let _ = tx.send(event);
            }
        }
    }

    /// Fail every waiting request and end every event stream.
    pub(crate) fn close(&self) {
        self.pending.lock().clear();
        self.sessions.lock().clear();
    }
}

/// Request/response correlation over one browser WebSocket.
pub(crate) struct Transport {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    router: Router,
    timeout: Duration,
}

impl Transport {
    pub(crate) fn new(ws_tx: WsSink, timeout: Duration) -> Self {
        Self {
            ws_tx: tokio::sync::Mutex::new(ws_tx),
            request_id: AtomicU64::new(1),
            router: Router::default(),
            timeout,
        }
    }

    pub(crate) fn router(&self) -> &Router {
        &self.router
    }

    /// Send a CDP command and wait for its response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let rx = self.router.expect(id);
        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.router.forget(id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.router.forget(id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Read messages until the socket closes.
    pub(crate) async fn receive_loop(self: Arc<Self>, mut ws_source: WsSource) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => self.router.route(resp),
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        self.router.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> CdpResponse {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_route_response_to_request() {
        let router = Router::default();
        let rx = router.expect(7);
        router.route(response(r#"{"id": 7, "result": {"ok": true}}"#));

        let value = rx.await.unwrap().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_route_protocol_error() {
        let router = Router::default();
        let rx = router.expect(3);
        router.route(response(
            r#"{"id": 3, "error": {"code": -32601, "message": "'Foo.bar' wasn't found"}}"#,
        ));

        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, CdpError::Protocol { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_route_event_to_session() {
        let router = Router::default();
        let mut events = router.register("S1").subscribe();
        let mut other = router.register("S2").subscribe();

        router.route(response(
            r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}, "sessionId": "S1"}"#,
        ));

        let event = events.recv().await.unwrap();
        assert_eq!(event.method, "Page.loadEventFired");
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_fails_pending_and_ends_streams() {
        let router = Router::default();
        let rx = router.expect(1);
        let mut events = router.register("S1").subscribe();

        router.close();
        assert!(rx.await.is_err());
        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn test_forget_drops_pending() {
        let router = Router::default();
        let _rx = router.expect(9);
        router.forget(9);
        assert!(router.pending.lock().is_empty());
    }
}
