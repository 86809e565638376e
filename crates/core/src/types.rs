//! Typed results produced by the browser tools.
//!
//! Every tool returns exactly one of these records, serialized to JSON for
//! the agent framework. `status == success` implies `error_message` is
//! absent; any other status carries best-effort payload fields.

use serde::{Deserialize, Serialize};

/// Outcome vocabulary shared by all tool results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    NotFound,
    Timeout,
    Error,
}

/// Viewport dimensions, fixed at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Bounding box of an element in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementBox {
    /// Center point, used as the pointer-event target.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl NavigationResult {
    pub fn success(url: String, title: String) -> Self {
        Self {
            status: ToolStatus::Success,
            url: Some(url),
            title: Some(title),
            error_message: None,
        }
    }

    pub fn timeout(url: Option<String>, message: String) -> Self {
        Self {
            status: ToolStatus::Timeout,
            url,
            title: None,
            error_message: Some(message),
        }
    }

    pub fn error(url: Option<String>, message: String) -> Self {
        Self {
            status: ToolStatus::Error,
            url,
            title: None,
            error_message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
    pub ready_state: String,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickResult {
    pub status: ToolStatus,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_info: Option<ElementBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ClickResult {
    pub fn success(selector: String, element_info: ElementBox) -> Self {
        Self {
            status: ToolStatus::Success,
            selector,
            element_info: Some(element_info),
            error_message: None,
        }
    }

    pub fn not_found(selector: String) -> Self {
        let message = format!("Element not found: {selector}");
        Self {
            status: ToolStatus::NotFound,
            selector,
            element_info: None,
            error_message: Some(message),
        }
    }

    pub fn error(selector: String, message: String) -> Self {
        Self {
            status: ToolStatus::Error,
            selector,
            element_info: None,
            error_message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeTextResult {
    pub status: ToolStatus,
    pub selector: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteScriptResult {
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotResult {
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub segments_count: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub full_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementScreenshotResult {
    pub status: ToolStatus,
    pub selector: String,
    pub segments_count: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_info: Option<ElementBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOptionResult {
    pub status: ToolStatus,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckboxResult {
    pub status: ToolStatus,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileResult {
    pub status: ToolStatus,
    pub selector: String,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Media types supported for screenshot capture and segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMediaType {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMediaType {
    /// MIME string, e.g. `image/png`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Format suffix used in CDP capture params, e.g. `png`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    /// Accepts both `image/png` and bare `png` spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.strip_prefix("image/").unwrap_or(s) {
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

/// One height-bounded tile of a captured image. Ephemeral: produced by the
/// segmenter, attached to a tool output, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSegment {
    pub data: Vec<u8>,
    pub media_type: ImageMediaType,
    pub ordinal: usize,
}
