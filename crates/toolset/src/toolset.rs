//! Toolset lifecycle: endpoint resolution, session open/close, tool
//! discovery, and dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use browser_use_core::{Error, ResolvedSettings, Result, ToolsetSettings, Viewport};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cdp::CdpClient;
use crate::scope;
use crate::session::BrowserSession;
use crate::tools;
use crate::{BrowserTool, ToolOutput};

const FALLBACK_VIEWPORT: Viewport = Viewport {
    width: 1280,
    height: 720,
};

/// A discoverable tool: prefixed name, description, parameter schema, and
/// the retry budget the host should apply to it.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub max_retries: u32,
}

/// The browser tool catalog bound to one CDP endpoint.
///
/// Construct it, [`open`](Self::open) a session, then dispatch calls by the
/// prefixed names reported by [`tool_defs`](Self::tool_defs). The session the
/// toolset holds is installed as the ambient session for the duration of each
/// call.
pub struct BrowserUseToolset {
    cdp_url: String,
    settings: ResolvedSettings,
    registry: BTreeMap<String, Arc<dyn BrowserTool>>,
    session: Option<Arc<BrowserSession>>,
}

impl BrowserUseToolset {
    /// Build a toolset configured from the environment.
    pub fn new(cdp_url: impl Into<String>) -> Self {
        Self::with_settings(cdp_url, ToolsetSettings::from_env())
    }

    /// Build a toolset with explicit settings. Unset fields still fall back
    /// to the environment, then to defaults.
    pub fn with_settings(cdp_url: impl Into<String>, settings: ToolsetSettings) -> Self {
        let settings = settings.resolve();
        let registry = tools::catalog()
            .into_iter()
            .map(|tool| {
                let name = format!("{}_{}", settings.prefix, tool.schema().name);
                (name, tool)
            })
            .collect();

        Self {
            cdp_url: cdp_url.into(),
            settings,
            registry,
            session: None,
        }
    }

    pub fn settings(&self) -> &ResolvedSettings {
        &self.settings
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Turn the configured endpoint into a WebSocket debugger URL.
    ///
    /// `ws://` and `wss://` endpoints pass through untouched. Any other
    /// endpoint is treated as a DevTools metadata URL (such as
    /// `http://host:9222/json/version`) and fetched exactly as configured.
    pub async fn resolve_websocket_url(&self) -> Result<String> {
        if self.cdp_url.starts_with("ws://") || self.cdp_url.starts_with("wss://") {
            return Ok(self.cdp_url.clone());
        }

        let metadata_url = &self.cdp_url;
        debug!(url = %metadata_url, "resolving websocket debugger url");

        let metadata: Value = reqwest::get(metadata_url)
            .await
            .map_err(|e| Error::Config(format!("Failed to fetch {metadata_url}: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Config(format!("Invalid metadata from {metadata_url}: {e}")))?;

        metadata["webSocketDebuggerUrl"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Config(format!(
                    "No webSocketDebuggerUrl in metadata from {metadata_url}"
                ))
            })
    }

    /// Connect to the browser and attach to a page. Reuses the first existing
    /// page target unless `always_use_new_page` forces a fresh one. Opening
    /// an already open toolset is a no-op.
    pub async fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let ws_url = self.resolve_websocket_url().await?;
        let cdp = Arc::new(CdpClient::connect(&ws_url).await?);

        let target_id = if self.settings.always_use_new_page {
            cdp.create_page("about:blank").await?
        } else {
            match first_page_target(&cdp.targets().await?) {
                Some(id) => id,
                None => cdp.create_page("about:blank").await?,
            }
        };
        let session_id = cdp.attach(&target_id).await?;

        for domain in ["Page.enable", "Runtime.enable", "DOM.enable"] {
            cdp.send(domain, json!({}), Some(&session_id)).await?;
        }
        let viewport = probe_viewport(&cdp, &session_id).await;

        info!(target = %target_id, width = viewport.width, height = viewport.height, "browser session open");
        self.session = Some(Arc::new(BrowserSession::new(cdp, session_id, viewport)));
        Ok(())
    }

    /// Drop the session and its connection. Idempotent.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            info!("browser session closed");
        }
    }

    /// The catalog as the host sees it, in stable name order.
    pub fn tool_defs(&self) -> Vec<ToolDef> {
        self.registry
            .iter()
            .map(|(name, tool)| {
                let schema = tool.schema();
                ToolDef {
                    name: name.clone(),
                    description: schema.description.to_string(),
                    parameters: schema.parameters,
                    max_retries: self.settings.max_retries,
                }
            })
            .collect()
    }

    /// Dispatch one call by prefixed tool name, with the open session
    /// installed as the ambient session for the duration of the call.
    pub async fn call_tool(&self, name: &str, params: Value) -> Result<ToolOutput> {
        let session = self
            .session
            .clone()
            .ok_or_else(|| Error::Session("toolset is not open".into()))?;
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {name}")))?
            .clone();

        debug!(tool = %name, "dispatching tool call");
        scope::enter(session, tool.execute(params)).await
    }
}

fn first_page_target(targets: &[Value]) -> Option<String> {
    targets
        .iter()
        .find(|t| t["type"] == "page")
        .and_then(|t| t["targetId"].as_str())
        .map(str::to_string)
}

async fn probe_viewport(cdp: &CdpClient, session_id: &str) -> Viewport {
    let probe = cdp
        .send(
            "Runtime.evaluate",
            json!({
                "expression":
                    "JSON.stringify({width: window.innerWidth, height: window.innerHeight})",
                "returnByValue": true,
            }),
            Some(session_id),
        )
        .await;

    // The session works without a measured viewport, so failures fall back.
    let raw = match &probe {
        Ok(resp) => resp["result"]["value"].as_str().unwrap_or_default(),
        Err(_) => "",
    };
    serde_json::from_str(raw).unwrap_or(FALLBACK_VIEWPORT)
}
