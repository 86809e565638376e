//! Browser automation toolset for AI agent frameworks, driving a remote
//! Chromium-family browser over the DevTools protocol.
//!
//! One [`BrowserUseToolset`] owns one CDP connection and one
//! [`BrowserSession`]. The agent framework discovers the catalog through
//! [`BrowserUseToolset::tool_defs`] and invokes tools through
//! [`BrowserUseToolset::call_tool`]; tool bodies reach the session through
//! the ambient [`scope`] rather than an explicit parameter.

pub mod cdp;
pub mod scope;
pub mod segment;
pub mod session;
pub mod tools;
pub mod toolset;

#[cfg(test)]
pub(crate) mod testutil;

use async_trait::async_trait;
use browser_use_core::{ImageSegment, Result};
use serde::Serialize;
use serde_json::Value;

pub use browser_use_core::{Error, ResolvedSettings, ToolsetSettings};
pub use session::BrowserSession;
pub use toolset::{BrowserUseToolset, ToolDef};

/// Externally visible description of one tool.
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Output of one tool call: a JSON result record plus any binary segments
/// attached alongside it (screenshot tools). The two parts are independently
/// consumable.
#[derive(Debug)]
pub struct ToolOutput {
    pub value: Value,
    pub attachments: Vec<ImageSegment>,
}

impl ToolOutput {
    /// Serialize a result record with no attachments.
    pub fn json<T: Serialize>(result: T) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(result)?,
            attachments: Vec::new(),
        })
    }

    /// Serialize a result record with attached image segments.
    pub fn with_attachments<T: Serialize>(
        result: T,
        attachments: Vec<ImageSegment>,
    ) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(result)?,
            attachments,
        })
    }
}

/// One externally callable browser operation.
#[async_trait]
pub trait BrowserTool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    async fn execute(&self, params: Value) -> Result<ToolOutput>;
}
