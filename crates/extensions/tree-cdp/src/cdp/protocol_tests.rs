use super::*;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 1,
        method: "Runtime.addBinding".to_string(),
        params: Some(serde_json::json!({"name": "__unfurlMutation"})),
        session_id: Some("S1".to_string()),
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("Runtime.addBinding"));
    assert!(json.contains("\"sessionId\":\"S1\""));
}

#[test]
fn test_request_without_session_omits_field() {
    let req = CdpRequest {
        id: 2,
        method: "Target.getTargets".to_string(),
        params: None,
        session_id: None,
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("sessionId"));
    assert!(!json.contains("params"));
}

#[test]
fn test_cdp_response_deserialize() {
    let json = r#"{"id": 1, "result": {"frameId": "abc"}}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.id, Some(1));
    assert!(resp.result.is_some());
    assert!(resp.into_event().is_none());
}

#[test]
fn test_binding_event_deserialize() {
    let json = r#"{
        "method": "Runtime.bindingCalled",
        "params": {"name": "__unfurlMutation", "payload": "{}", "executionContextId": 3},
        "sessionId": "S1"
    }"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.session_id.as_deref(), Some("S1"));

    let event = resp.into_event().unwrap();
    assert_eq!(event.method, "Runtime.bindingCalled");
    let binding: BindingCalled = serde_json::from_value(event.params).unwrap();
    assert_eq!(binding.name, "__unfurlMutation");
    assert_eq!(binding.execution_context_id, Some(3));
}

#[test]
fn test_page_info_deserialize() {
    let json = r#"{
        "id": "page123",
        "type": "page",
        "title": "Thread",
        "url": "https://www.reddit.com/r/rust/comments/abc/",
        "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/page123"
    }"#;
    let info: PageInfo = serde_json::from_str(json).unwrap();
    assert_eq!(info.id, "page123");
    assert_eq!(info.page_type, "page");
}

#[test]
fn test_exception_message_prefers_description() {
    let json = r#"{
        "exceptionId": 1,
        "text": "Uncaught",
        "lineNumber": 0,
        "columnNumber": 10,
        "exception": {
            "type": "object",
            "subtype": "error",
            "className": "Error",
            "description": "Error: node gone: 17\n    at resolve (<anonymous>:5:11)"
        }
    }"#;
    let details: ExceptionDetails = serde_json::from_str(json).unwrap();
    assert_eq!(details.message(), "Error: node gone: 17");
}

#[test]
fn test_exception_message_falls_back_to_text() {
    let json = r#"{"exceptionId": 1, "text": "Uncaught", "lineNumber": 0, "columnNumber": 0}"#;
    let details: ExceptionDetails = serde_json::from_str(json).unwrap();
    assert_eq!(details.message(), "Uncaught");
}
