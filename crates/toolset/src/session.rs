//! Browser session state and page-scoped protocol helpers.
//!
//! One `BrowserSession` exists per open toolset. It pairs the shared CDP
//! client with the attached page's session id and carries the mutable page
//! state (URL, title, navigation history) that tools refresh after observing
//! protocol responses. Invocations are serialized per session by the caller,
//! so the state mutex is never contended within one toolset.

use std::sync::Arc;
use std::time::SystemTime;

use base64::Engine;
use browser_use_core::types::ElementBox;
use browser_use_core::{Error, Result, Viewport};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::cdp::CdpClient;

/// Mutable per-page state, refreshed by tool implementations.
#[derive(Debug, Default)]
pub struct SessionState {
    pub current_url: Option<String>,
    pub current_title: Option<String>,
    /// Append-only; grows on forward navigation, untouched by back/forward.
    pub history: Vec<String>,
    pub last_screenshot: Option<SystemTime>,
}

pub struct BrowserSession {
    cdp: Arc<CdpClient>,
    /// Flattened CDP session id of the attached page target.
    page: String,
    viewport: Viewport,
    state: Mutex<SessionState>,
}

impl BrowserSession {
    pub fn new(cdp: Arc<CdpClient>, page: String, viewport: Viewport) -> Self {
        Self {
            cdp,
            page,
            viewport,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Issue a page-scoped CDP command.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.cdp.send(method, params, Some(&self.page)).await
    }

    // ─── Runtime ──────────────────────────────────────────────────────

    /// Evaluate a script and return the raw CDP result object (including
    /// `exceptionDetails` when the script threw).
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.send(
            "Runtime.evaluate",
            json!({"expression": expression, "returnByValue": true}),
        )
        .await
    }

    /// Evaluate a script and return its string value.
    pub async fn evaluate_string(&self, expression: &str) -> Result<String> {
        let result = self.evaluate(expression).await?;
        result
            .pointer("/result/value")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Protocol("Evaluation returned no string value".into()))
    }

    /// Ask the page for its current URL and title.
    pub async fn page_snapshot(&self) -> Result<(String, String)> {
        let raw = self
            .evaluate_string(
                r#"JSON.stringify({url: window.location.href, title: document.title})"#,
            )
            .await?;
        let info: Value = serde_json::from_str(&raw)?;
        let url = info["url"].as_str().unwrap_or_default().to_string();
        let title = info["title"].as_str().unwrap_or_default().to_string();
        Ok((url, title))
    }

    /// Whether the remote page reports a Mac platform. Decides the
    /// select-all modifier when clearing inputs (Meta vs Ctrl).
    pub async fn is_mac_platform(&self) -> Result<bool> {
        let result = self
            .evaluate("navigator.platform.toLowerCase().includes('mac')")
            .await?;
        Ok(result
            .pointer("/result/value")
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    // ─── DOM ──────────────────────────────────────────────────────────

    /// Resolve a CSS selector to a node id. A miss is `Ok(None)`, never an
    /// error: selector misses are an expected outcome.
    pub async fn query_selector(&self, selector: &str) -> Result<Option<i64>> {
        let doc = self.send("DOM.getDocument", json!({})).await?;
        let root = doc
            .pointer("/root/nodeId")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| Error::Protocol("DOM.getDocument returned no root".into()))?;

        let found = self
            .send(
                "DOM.querySelector",
                json!({"nodeId": root, "selector": selector}),
            )
            .await?;
        Ok(found
            .get("nodeId")
            .and_then(|v| v.as_i64())
            .filter(|id| *id != 0))
    }

    /// Bounding box of a node from its border quad.
    pub async fn box_model(&self, node_id: i64) -> Result<ElementBox> {
        let result = self
            .send("DOM.getBoxModel", json!({"nodeId": node_id}))
            .await?;
        let border: Vec<f64> = result
            .pointer("/model/border")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
            .unwrap_or_default();
        if border.len() != 8 {
            return Err(Error::Protocol("Malformed border quad in box model".into()));
        }
        // Quad order: [x1,y1, x2,y2, x3,y3, x4,y4]
        let xs = [border[0], border[2], border[4], border[6]];
        let ys = [border[1], border[3], border[5], border[7]];
        let x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
        let y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
        let width = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max) - x;
        let height = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max) - y;
        Ok(ElementBox {
            x,
            y,
            width,
            height,
        })
    }

    /// Set the files of a file-input node.
    pub async fn set_file_input_files(&self, node_id: i64, files: &[String]) -> Result<()> {
        self.send(
            "DOM.setFileInputFiles",
            json!({"nodeId": node_id, "files": files}),
        )
        .await?;
        Ok(())
    }

    // ─── Input ────────────────────────────────────────────────────────

    pub async fn dispatch_mouse_event(&self, event_type: &str, x: f64, y: f64) -> Result<()> {
        self.send(
            "Input.dispatchMouseEvent",
            json!({
                "type": event_type,
                "x": x,
                "y": y,
                "button": "left",
                "clickCount": 1,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn dispatch_key_event(
        &self,
        event_type: &str,
        key: &str,
        code: &str,
        modifiers: i32,
    ) -> Result<()> {
        let mut params = json!({
            "type": event_type,
            "key": key,
            "code": code,
        });
        if modifiers != 0 {
            params["modifiers"] = json!(modifiers);
        }
        self.send("Input.dispatchKeyEvent", params).await?;
        Ok(())
    }

    pub async fn insert_text(&self, text: &str) -> Result<()> {
        self.send("Input.insertText", json!({"text": text})).await?;
        Ok(())
    }

    // ─── Page ─────────────────────────────────────────────────────────

    /// Capture raw image bytes from the page. `clip` limits the capture to
    /// an element's bounding box.
    pub async fn capture_screenshot(
        &self,
        format_suffix: &str,
        full_page: bool,
        clip: Option<ElementBox>,
    ) -> Result<Vec<u8>> {
        let mut params = json!({"format": format_suffix});
        if full_page {
            params["captureBeyondViewport"] = json!(true);
        }
        if let Some(rect) = clip {
            params["clip"] = json!({
                "x": rect.x,
                "y": rect.y,
                "width": rect.width,
                "height": rect.height,
                "scale": 1,
            });
        }
        let result = self.send("Page.captureScreenshot", params).await?;
        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Protocol("No screenshot data returned".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| Error::Protocol(format!("Invalid screenshot payload: {e}")))
    }

    /// Current navigation history: (current index, entries).
    pub async fn navigation_history(&self) -> Result<(usize, Vec<Value>)> {
        let result = self.send("Page.getNavigationHistory", json!({})).await?;
        let index = result
            .get("currentIndex")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;
        let entries = result
            .get("entries")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        Ok((index, entries))
    }

    pub async fn navigate_to_history_entry(&self, entry_id: i64) -> Result<()> {
        self.send(
            "Page.navigateToHistoryEntry",
            json!({"entryId": entry_id}),
        )
        .await?;
        Ok(())
    }

    // ─── Session state ────────────────────────────────────────────────

    pub async fn current_url(&self) -> Option<String> {
        self.state.lock().await.current_url.clone()
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Record the page's URL and title after a navigation-like operation.
    /// Forward navigations also append to the history; back/forward and
    /// reload only refresh the current entry.
    pub async fn record_page(&self, url: &str, title: &str, push_history: bool) {
        let mut state = self.state.lock().await;
        state.current_url = Some(url.to_string());
        state.current_title = Some(title.to_string());
        if push_history {
            state.history.push(url.to_string());
        }
    }

    pub async fn mark_screenshot(&self) {
        self.state.lock().await.last_screenshot = Some(SystemTime::now());
    }

    pub async fn last_screenshot(&self) -> Option<SystemTime> {
        self.state.lock().await.last_screenshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{eval_page_info, spawn_fake_cdp};

    async fn session_with<F>(handler: F) -> BrowserSession
    where
        F: FnMut(&str, &Value) -> std::result::Result<Value, String> + Send + 'static,
    {
        let url = spawn_fake_cdp(handler).await;
        let cdp = Arc::new(CdpClient::connect(&url).await.unwrap());
        BrowserSession::new(
            cdp,
            "S1".to_string(),
            Viewport {
                width: 1280,
                height: 720,
            },
        )
    }

    #[tokio::test]
    async fn page_snapshot_parses_url_and_title() {
        let session = session_with(|method, _| match method {
            "Runtime.evaluate" => Ok(eval_page_info("https://example.com/", "Example")),
            _ => Ok(json!({})),
        })
        .await;

        let (url, title) = session.page_snapshot().await.unwrap();
        assert_eq!(url, "https://example.com/");
        assert_eq!(title, "Example");
    }

    #[tokio::test]
    async fn query_selector_miss_is_none() {
        let session = session_with(|method, _| match method {
            "DOM.getDocument" => Ok(json!({"root": {"nodeId": 1}})),
            "DOM.querySelector" => Ok(json!({"nodeId": 0})),
            _ => Ok(json!({})),
        })
        .await;

        assert_eq!(session.query_selector("#missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn box_model_derives_bounds_from_quad() {
        let session = session_with(|method, _| match method {
            "DOM.getBoxModel" => Ok(json!({
                "model": {"border": [10.0, 20.0, 110.0, 20.0, 110.0, 60.0, 10.0, 60.0]}
            })),
            _ => Ok(json!({})),
        })
        .await;

        let b = session.box_model(5).await.unwrap();
        assert_eq!((b.x, b.y, b.width, b.height), (10.0, 20.0, 100.0, 40.0));
        assert_eq!(b.center(), (60.0, 40.0));
    }

    #[tokio::test]
    async fn record_page_appends_history_only_when_asked() {
        let session = session_with(|_, _| Ok(json!({}))).await;

        session.record_page("https://a.test/", "A", true).await;
        session.record_page("https://b.test/", "B", false).await;
        assert_eq!(session.history_len().await, 1);
        assert_eq!(session.current_url().await.as_deref(), Some("https://b.test/"));
    }
}
