//! Navigation tools: navigate, back, forward, reload.

use async_trait::async_trait;
use browser_use_core::types::NavigationResult;
use browser_use_core::{Error, Result};
use serde_json::{json, Value};
use tracing::debug;

use super::{HISTORY_SETTLE, NAV_SETTLE};
use crate::scope;
use crate::session::BrowserSession;
use crate::{BrowserTool, ToolOutput, ToolSchema};

pub struct NavigateToUrl;

#[async_trait]
impl BrowserTool for NavigateToUrl {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "navigate_to_url",
            description: "Navigate the browser to a URL and report the resulting URL and title.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Target URL to navigate to"},
                    "timeout": {
                        "type": "integer",
                        "description": "Navigation timeout in milliseconds (default: 30000)"
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let url = params["url"]
            .as_str()
            .ok_or_else(|| Error::Tool("navigate_to_url requires 'url'".into()))?
            .to_string();
        let timeout_ms = params["timeout"].as_u64().unwrap_or(30_000);
        let session = scope::current()?;

        let result = match navigate(&session, &url).await {
            Ok(result) => result,
            Err(Error::Timeout(_)) => NavigationResult::timeout(
                Some(url),
                format!("Navigation timeout after {timeout_ms}ms"),
            ),
            Err(e) => NavigationResult::error(Some(url), e.to_string()),
        };
        ToolOutput::json(result)
    }
}

async fn navigate(session: &BrowserSession, url: &str) -> Result<NavigationResult> {
    debug!(url, "Navigating");
    session.send("Page.navigate", json!({"url": url})).await?;
    tokio::time::sleep(NAV_SETTLE).await;

    let (url, title) = session.page_snapshot().await?;
    session.record_page(&url, &title, true).await;
    Ok(NavigationResult::success(url, title))
}

pub struct GoBack;

#[async_trait]
impl BrowserTool for GoBack {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "go_back",
            description: "Navigate back in the browser history.",
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _params: Value) -> Result<ToolOutput> {
        let session = scope::current()?;
        let result = match step_history(&session, HistoryDirection::Back).await {
            Ok(result) => result,
            Err(e) => NavigationResult::error(session.current_url().await, e.to_string()),
        };
        ToolOutput::json(result)
    }
}

pub struct GoForward;

#[async_trait]
impl BrowserTool for GoForward {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "go_forward",
            description: "Navigate forward in the browser history.",
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _params: Value) -> Result<ToolOutput> {
        let session = scope::current()?;
        let result = match step_history(&session, HistoryDirection::Forward).await {
            Ok(result) => result,
            Err(e) => NavigationResult::error(session.current_url().await, e.to_string()),
        };
        ToolOutput::json(result)
    }
}

#[derive(Clone, Copy)]
enum HistoryDirection {
    Back,
    Forward,
}

/// Step through the protocol's history-entry list. Hitting a boundary is a
/// defined empty transition: status=error with an explanatory message, the
/// session's current URL untouched.
async fn step_history(
    session: &BrowserSession,
    direction: HistoryDirection,
) -> Result<NavigationResult> {
    let (index, entries) = session.navigation_history().await?;

    let target = match direction {
        HistoryDirection::Back => {
            if index == 0 {
                return Ok(NavigationResult::error(
                    session.current_url().await,
                    "No previous page in history".into(),
                ));
            }
            index - 1
        }
        HistoryDirection::Forward => {
            if index + 1 >= entries.len() {
                return Ok(NavigationResult::error(
                    session.current_url().await,
                    "No next page in history".into(),
                ));
            }
            index + 1
        }
    };

    let entry_id = entries[target]
        .get("id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| Error::Protocol("History entry without id".into()))?;
    session.navigate_to_history_entry(entry_id).await?;
    tokio::time::sleep(HISTORY_SETTLE).await;

    let (url, title) = session.page_snapshot().await?;
    session.record_page(&url, &title, false).await;
    Ok(NavigationResult::success(url, title))
}

pub struct ReloadPage;

#[async_trait]
impl BrowserTool for ReloadPage {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "reload_page",
            description: "Reload the current page.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "ignore_cache": {
                        "type": "boolean",
                        "description": "Reload bypassing the cache (default: false)"
                    }
                }
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let ignore_cache = params["ignore_cache"].as_bool().unwrap_or(false);
        let session = scope::current()?;

        let result = match reload(&session, ignore_cache).await {
            Ok(result) => result,
            Err(e) => NavigationResult::error(session.current_url().await, e.to_string()),
        };
        ToolOutput::json(result)
    }
}

async fn reload(session: &BrowserSession, ignore_cache: bool) -> Result<NavigationResult> {
    session
        .send("Page.reload", json!({"ignoreCache": ignore_cache}))
        .await?;
    tokio::time::sleep(NAV_SETTLE).await;

    let (url, title) = session.page_snapshot().await?;
    session.record_page(&url, &title, false).await;
    Ok(NavigationResult::success(url, title))
}
