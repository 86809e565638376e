//! Interaction tools: click, type, script evaluation, scrolling.

use async_trait::async_trait;
use browser_use_core::types::{ClickResult, ExecuteScriptResult, TypeTextResult};
use browser_use_core::{Error, Result, ToolStatus};
use serde_json::{json, Value};

use super::CLICK_SETTLE;
use crate::scope;
use crate::session::BrowserSession;
use crate::{BrowserTool, ToolOutput, ToolSchema};

/// CDP keyboard modifier bits.
const MODIFIER_CTRL: i32 = 2;
const MODIFIER_META: i32 = 8;

pub struct ClickElement;

#[async_trait]
impl BrowserTool for ClickElement {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "click_element",
            description: "Click an element identified by a CSS selector.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": "CSS selector for the element"}
                },
                "required": ["selector"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let selector = params["selector"]
            .as_str()
            .ok_or_else(|| Error::Tool("click_element requires 'selector'".into()))?;
        let session = scope::current()?;

        let result = match click(&session, selector).await {
            Ok(result) => result,
            Err(e) => ClickResult::error(selector.to_string(), e.to_string()),
        };
        ToolOutput::json(result)
    }
}

/// Resolve the element, dispatch a press/release pair at its center, then
/// wait [`CLICK_SETTLE`] for page-side handlers. Shared with `type_text`.
pub(crate) async fn click(session: &BrowserSession, selector: &str) -> Result<ClickResult> {
    let Some(node_id) = session.query_selector(selector).await? else {
        return Ok(ClickResult::not_found(selector.to_string()));
    };

    let bounds = session.box_model(node_id).await?;
    let (x, y) = bounds.center();
    session.dispatch_mouse_event("mousePressed", x, y).await?;
    session.dispatch_mouse_event("mouseReleased", x, y).await?;
    tokio::time::sleep(CLICK_SETTLE).await;

    Ok(ClickResult::success(selector.to_string(), bounds))
}

pub struct TypeText;

#[async_trait]
impl BrowserTool for TypeText {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "type_text",
            description: "Type text into an input element, optionally clearing it first.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": "CSS selector for the input element"},
                    "text": {"type": "string", "description": "Text to type"},
                    "clear_first": {
                        "type": "boolean",
                        "description": "Clear existing text before typing (default: true)"
                    }
                },
                "required": ["selector", "text"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let selector = params["selector"]
            .as_str()
            .ok_or_else(|| Error::Tool("type_text requires 'selector'".into()))?
            .to_string();
        let text = params["text"]
            .as_str()
            .ok_or_else(|| Error::Tool("type_text requires 'text'".into()))?
            .to_string();
        let clear_first = params["clear_first"].as_bool().unwrap_or(true);
        let session = scope::current()?;

        let result = match type_text(&session, &selector, &text, clear_first).await {
            Ok(result) => result,
            Err(e) => TypeTextResult {
                status: ToolStatus::Error,
                selector,
                text,
                error_message: Some(e.to_string()),
            },
        };
        ToolOutput::json(result)
    }
}

async fn type_text(
    session: &BrowserSession,
    selector: &str,
    text: &str,
    clear_first: bool,
) -> Result<TypeTextResult> {
    // Click first to focus; a failed click short-circuits with its status.
    let click_result = click(session, selector).await?;
    if click_result.status != ToolStatus::Success {
        return Ok(TypeTextResult {
            status: click_result.status,
            selector: selector.to_string(),
            text: text.to_string(),
            error_message: click_result.error_message,
        });
    }

    if clear_first {
        let modifier = if session.is_mac_platform().await? {
            MODIFIER_META
        } else {
            MODIFIER_CTRL
        };
        session
            .dispatch_key_event("keyDown", "a", "KeyA", modifier)
            .await?;
        session.dispatch_key_event("keyUp", "a", "KeyA", 0).await?;
        session
            .dispatch_key_event("keyDown", "Backspace", "Backspace", 0)
            .await?;
        session
            .dispatch_key_event("keyUp", "Backspace", "Backspace", 0)
            .await?;
    }

    // Insert character by character, as a user would.
    for ch in text.chars() {
        session.insert_text(&ch.to_string()).await?;
    }

    Ok(TypeTextResult {
        status: ToolStatus::Success,
        selector: selector.to_string(),
        text: text.to_string(),
        error_message: None,
    })
}

pub struct ExecuteJavascript;

#[async_trait]
impl BrowserTool for ExecuteJavascript {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "execute_javascript",
            description: "Evaluate JavaScript in the page context and return its value.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "script": {"type": "string", "description": "JavaScript code to evaluate"}
                },
                "required": ["script"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let script = params["script"]
            .as_str()
            .ok_or_else(|| Error::Tool("execute_javascript requires 'script'".into()))?;
        let session = scope::current()?;

        let result = match evaluate_script(&session, script).await {
            Ok(result) => result,
            Err(e) => ExecuteScriptResult {
                status: ToolStatus::Error,
                result: None,
                error_message: Some(e.to_string()),
            },
        };
        ToolOutput::json(result)
    }
}

pub(crate) async fn evaluate_script(
    session: &BrowserSession,
    script: &str,
) -> Result<ExecuteScriptResult> {
    let raw = session.evaluate(script).await?;

    if let Some(details) = raw.get("exceptionDetails") {
        let message = details
            .pointer("/exception/description")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| details.to_string());
        return Ok(ExecuteScriptResult {
            status: ToolStatus::Error,
            result: None,
            error_message: Some(message),
        });
    }

    Ok(ExecuteScriptResult {
        status: ToolStatus::Success,
        result: raw.pointer("/result/value").cloned(),
        error_message: None,
    })
}

pub struct ScrollTo;

#[async_trait]
impl BrowserTool for ScrollTo {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "scroll_to",
            description: "Scroll the page to the given coordinates.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "x": {"type": "integer", "description": "Horizontal scroll position (default: 0)"},
                    "y": {"type": "integer", "description": "Vertical scroll position (default: 0)"}
                }
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let x = params["x"].as_i64().unwrap_or(0);
        let y = params["y"].as_i64().unwrap_or(0);
        let session = scope::current()?;

        let result = match evaluate_script(&session, &format!("window.scrollTo({x}, {y})")).await {
            Ok(result) => result,
            Err(e) => ExecuteScriptResult {
                status: ToolStatus::Error,
                result: None,
                error_message: Some(e.to_string()),
            },
        };
        ToolOutput::json(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scoped_session;

    fn found_element(method: &str, params: &Value) -> Option<std::result::Result<Value, String>> {
        match method {
            "DOM.getDocument" => Some(Ok(json!({"root": {"nodeId": 1}}))),
            "DOM.querySelector" => {
                let selector = params["selector"].as_str().unwrap_or_default();
                let node = if selector == "#missing" { 0 } else { 42 };
                Some(Ok(json!({"nodeId": node})))
            }
            "DOM.getBoxModel" => Some(Ok(json!({
                "model": {"border": [0.0, 0.0, 80.0, 0.0, 80.0, 30.0, 0.0, 30.0]}
            }))),
            "Input.dispatchMouseEvent" | "Input.dispatchKeyEvent" | "Input.insertText" => {
                Some(Ok(json!({})))
            }
            _ => None,
        }
    }

    #[tokio::test]
    async fn click_misses_report_not_found() {
        let session =
            scoped_session(|m, p| found_element(m, p).unwrap_or(Ok(json!({})))).await;

        let output = scope::enter(
            session,
            ClickElement.execute(json!({"selector": "#missing"})),
        )
        .await
        .unwrap();
        assert_eq!(output.value["status"], "not_found");
        assert!(output.value["error_message"]
            .as_str()
            .unwrap()
            .contains("#missing"));
    }

    #[tokio::test]
    async fn click_dispatches_press_and_release_at_center() {
        let session = scoped_session(|method, params| {
            if method == "Input.dispatchMouseEvent" {
                assert_eq!(params["x"], 40.0);
                assert_eq!(params["y"], 15.0);
                assert_eq!(params["button"], "left");
            }
            found_element(method, params).unwrap_or(Ok(json!({})))
        })
        .await;

        let output = scope::enter(
            session,
            ClickElement.execute(json!({"selector": "#button"})),
        )
        .await
        .unwrap();
        assert_eq!(output.value["status"], "success");
        assert_eq!(output.value["element_info"]["width"], 80.0);
    }

    #[tokio::test]
    async fn type_text_short_circuits_on_click_miss() {
        let session =
            scoped_session(|m, p| found_element(m, p).unwrap_or(Ok(json!({})))).await;

        let output = scope::enter(
            session,
            TypeText.execute(json!({"selector": "#missing", "text": "hello"})),
        )
        .await
        .unwrap();
        assert_eq!(output.value["status"], "not_found");
    }

    #[tokio::test]
    async fn type_text_uses_ctrl_on_non_mac() {
        let session = scoped_session(|method, params| {
            if method == "Runtime.evaluate" {
                // Platform probe.
                return Ok(json!({"result": {"type": "boolean", "value": false}}));
            }
            if method == "Input.dispatchKeyEvent"
                && params["type"] == "keyDown"
                && params["key"] == "a"
            {
                assert_eq!(params["modifiers"], MODIFIER_CTRL);
            }
            found_element(method, params).unwrap_or(Ok(json!({})))
        })
        .await;

        let output = scope::enter(
            session,
            TypeText.execute(json!({"selector": "#input", "text": "hi"})),
        )
        .await
        .unwrap();
        assert_eq!(output.value["status"], "success");
    }

    #[tokio::test]
    async fn script_exception_maps_to_error_status() {
        let session = scoped_session(|method, _| match method {
            "Runtime.evaluate" => Ok(json!({
                "result": {"type": "object"},
                "exceptionDetails": {
                    "text": "Uncaught",
                    "exception": {"description": "ReferenceError: nope is not defined"}
                }
            })),
            _ => Ok(json!({})),
        })
        .await;

        let output = scope::enter(
            session,
            ExecuteJavascript.execute(json!({"script": "nope()"})),
        )
        .await
        .unwrap();
        assert_eq!(output.value["status"], "error");
        assert!(output.value["error_message"]
            .as_str()
            .unwrap()
            .contains("ReferenceError"));
    }

    #[tokio::test]
    async fn script_value_returned_verbatim() {
        let session = scoped_session(|method, _| match method {
            "Runtime.evaluate" => Ok(json!({"result": {"type": "number", "value": 6}})),
            _ => Ok(json!({})),
        })
        .await;

        let output = scope::enter(
            session,
            ExecuteJavascript.execute(json!({"script": "2 * 3"})),
        )
        .await
        .unwrap();
        assert_eq!(output.value["status"], "success");
        assert_eq!(output.value["result"], 6);
    }

    #[tokio::test]
    async fn tool_outside_scope_is_a_hard_error() {
        let result = ClickElement.execute(json!({"selector": "#x"})).await;
        assert!(matches!(result, Err(Error::NoSession)));
    }
}
