//! State inspection and screenshot tools.

use async_trait::async_trait;
use browser_use_core::types::{ElementScreenshotResult, PageInfo, ScreenshotResult};
use browser_use_core::{Error, ImageMediaType, ImageSegment, Result, ToolStatus};
use serde_json::{json, Value};

use crate::scope;
use crate::segment::segment_image;
use crate::session::BrowserSession;
use crate::{BrowserTool, ToolOutput, ToolSchema};

/// Maximum height of one screenshot segment, in pixels.
pub const SEGMENT_MAX_HEIGHT: u32 = 4096;
/// Rows of shared content between consecutive segments.
pub const SEGMENT_OVERLAP: u32 = 50;
/// Hard cap on segments attached to one screenshot result. Anything beyond
/// is dropped top-to-bottom and reported via the `truncated` flag.
pub const MAX_SEGMENTS: usize = 20;

/// Keep the first [`MAX_SEGMENTS`] segments and report whether any were
/// dropped.
fn cap_segments(mut segments: Vec<ImageSegment>) -> (Vec<ImageSegment>, bool) {
    let truncated = segments.len() > MAX_SEGMENTS;
    if truncated {
        segments.truncate(MAX_SEGMENTS);
    }
    (segments, truncated)
}

fn media_type_param(params: &Value) -> Result<ImageMediaType> {
    match params["format"].as_str() {
        None => Ok(ImageMediaType::Png),
        Some(raw) => ImageMediaType::parse(raw)
            .ok_or_else(|| Error::Tool(format!("Unsupported image format: {raw}"))),
    }
}

pub struct GetPageInfo;

#[async_trait]
impl BrowserTool for GetPageInfo {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_page_info",
            description: "Get the current page's URL, title, ready state, and viewport.",
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _params: Value) -> Result<ToolOutput> {
        let session = scope::current()?;
        match page_info(&session).await {
            Ok(info) => ToolOutput::json(info),
            Err(e) => ToolOutput::json(json!({
                "status": "error",
                "error_message": e.to_string(),
            })),
        }
    }
}

async fn page_info(session: &BrowserSession) -> Result<PageInfo> {
    let raw = session
        .evaluate_string(
            r#"JSON.stringify({
                url: window.location.href,
                title: document.title,
                readyState: document.readyState,
            })"#,
        )
        .await?;
    let info: Value = serde_json::from_str(&raw)?;
    let url = info["url"].as_str().unwrap_or_default().to_string();
    let title = info["title"].as_str().unwrap_or_default().to_string();
    session.record_page(&url, &title, false).await;

    Ok(PageInfo {
        url,
        title,
        ready_state: info["readyState"].as_str().unwrap_or_default().to_string(),
        viewport: session.viewport(),
    })
}

pub struct GetPageContent;

#[async_trait]
impl BrowserTool for GetPageContent {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_page_content",
            description: "Get the current page content as plain text or HTML.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "content_format": {
                        "type": "string",
                        "enum": ["text", "html"],
                        "description": "Content format (default: text)"
                    }
                }
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let format = params["content_format"].as_str().unwrap_or("text");
        let expression = if format == "html" {
            "document.documentElement.outerHTML"
        } else {
            "document.body.innerText"
        };
        let session = scope::current()?;

        match session.evaluate_string(expression).await {
            Ok(content) => ToolOutput::json(Value::String(content)),
            Err(e) => ToolOutput::json(json!({
                "status": "error",
                "error_message": e.to_string(),
            })),
        }
    }
}

pub struct TakeScreenshot;

#[async_trait]
impl BrowserTool for TakeScreenshot {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "take_screenshot",
            description: "Capture a screenshot of the page. Tall captures are split into \
                          height-bounded segments (at most 20).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "full_page": {
                        "type": "boolean",
                        "description": "Capture the full scrollable page instead of the viewport (default: false)"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["image/png", "image/jpeg", "image/webp"],
                        "description": "Image format (default: image/png)"
                    }
                }
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let full_page = params["full_page"].as_bool().unwrap_or(false);
        let media_type = media_type_param(&params)?;
        let session = scope::current()?;

        match capture_page(&session, full_page, media_type).await {
            Ok((result, segments)) => ToolOutput::with_attachments(result, segments),
            Err(e) => ToolOutput::json(ScreenshotResult {
                status: ToolStatus::Error,
                url: session.current_url().await,
                segments_count: 0,
                truncated: false,
                format: None,
                full_page,
                error_message: Some(e.to_string()),
            }),
        }
    }
}

async fn capture_page(
    session: &BrowserSession,
    full_page: bool,
    media_type: ImageMediaType,
) -> Result<(ScreenshotResult, Vec<ImageSegment>)> {
    let bytes = session
        .capture_screenshot(media_type.suffix(), full_page, None)
        .await?;
    let segments = segment_image(&bytes, SEGMENT_MAX_HEIGHT, SEGMENT_OVERLAP, media_type)?;
    let (segments, truncated) = cap_segments(segments);
    session.mark_screenshot().await;

    let result = ScreenshotResult {
        status: ToolStatus::Success,
        url: session.current_url().await,
        segments_count: segments.len(),
        truncated,
        format: Some(media_type.suffix().to_string()),
        full_page,
        error_message: None,
    };
    Ok((result, segments))
}

pub struct TakeElementScreenshot;

#[async_trait]
impl BrowserTool for TakeElementScreenshot {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "take_element_screenshot",
            description: "Capture a screenshot clipped to one element's bounding box.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": "CSS selector for the element"},
                    "format": {
                        "type": "string",
                        "enum": ["image/png", "image/jpeg", "image/webp"],
                        "description": "Image format (default: image/png)"
                    }
                },
                "required": ["selector"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let selector = params["selector"]
            .as_str()
            .ok_or_else(|| Error::Tool("take_element_screenshot requires 'selector'".into()))?
            .to_string();
        let media_type = media_type_param(&params)?;
        let session = scope::current()?;

        match capture_element(&session, &selector, media_type).await {
            Ok((result, segments)) => ToolOutput::with_attachments(result, segments),
            Err(e) => ToolOutput::json(ElementScreenshotResult {
                status: ToolStatus::Error,
                selector,
                segments_count: 0,
                truncated: false,
                element_info: None,
                error_message: Some(e.to_string()),
            }),
        }
    }
}

async fn capture_element(
    session: &BrowserSession,
    selector: &str,
    media_type: ImageMediaType,
) -> Result<(ElementScreenshotResult, Vec<ImageSegment>)> {
    let Some(node_id) = session.query_selector(selector).await? else {
        let result = ElementScreenshotResult {
            status: ToolStatus::NotFound,
            selector: selector.to_string(),
            segments_count: 0,
            truncated: false,
            element_info: None,
            error_message: Some(format!("Element not found: {selector}")),
        };
        return Ok((result, Vec::new()));
    };

    let bounds = session.box_model(node_id).await?;
    let bytes = session
        .capture_screenshot(media_type.suffix(), false, Some(bounds))
        .await?;
    let segments = segment_image(&bytes, SEGMENT_MAX_HEIGHT, SEGMENT_OVERLAP, media_type)?;
    let (segments, truncated) = cap_segments(segments);
    session.mark_screenshot().await;

    let result = ElementScreenshotResult {
        status: ToolStatus::Success,
        selector: selector.to_string(),
        segments_count: segments.len(),
        truncated,
        element_info: Some(bounds),
        error_message: None,
    };
    Ok((result, segments))
}

pub struct GetViewportInfo;

#[async_trait]
impl BrowserTool for GetViewportInfo {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_viewport_info",
            description: "Get the viewport dimensions fixed at session creation.",
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _params: Value) -> Result<ToolOutput> {
        let session = scope::current()?;
        ToolOutput::json(session.viewport())
    }
}
