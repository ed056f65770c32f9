//! JavaScript execution operations for CDP page session.

use serde_json::{Value, json};

use crate::cdp::error::CdpError;
use crate::cdp::protocol::ExceptionDetails;

use super::core::PageSession;

impl PageSession {
    /// Evaluate a JavaScript expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        Self::check_exception(&result)?;
        Ok(result["result"]["value"].clone())
    }

    /// Expose `window[name](payload)` to the page; calls arrive as
    /// `Runtime.bindingCalled` events.
    pub async fn add_binding(&self, name: &str) -> Result<(), CdpError> {
        self.call("Runtime.addBinding", Some(json!({"name": name})))
            .await?;
        Ok(())
    }

    /// Run `source` in every document loaded into this page from now on.
    pub async fn add_script_on_new_document(&self, source: &str) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.addScriptToEvaluateOnNewDocument",
                Some(json!({"source": source})),
            )
            .await?;
        Ok(result["identifier"].as_str().unwrap_or_default().to_string())
    }

    pub(super) fn check_exception(result: &Value) -> Result<(), CdpError> {
        let Some(exception) = result.get("exceptionDetails") else {
            return Ok(());
        };
        let message = serde_json::from_value::<ExceptionDetails>(exception.clone())
            .map(|details| details.message())
            .unwrap_or_else(|_| {
                exception["text"]
                    .as_str()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        Err(CdpError::JavaScript(message))
    }
}
