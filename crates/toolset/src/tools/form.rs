//! Form control tools: select dropdowns, checkboxes, and file inputs.

use async_trait::async_trait;
use browser_use_core::types::{CheckboxResult, SelectOptionResult, UploadFileResult};
use browser_use_core::{Error, Result, ToolStatus};
use serde_json::{json, Value};

use crate::scope;
use crate::session::BrowserSession;
use crate::{BrowserTool, ToolOutput, ToolSchema};

/// How a `select_option` call identifies the option to pick. Exactly one
/// discriminator must be given.
enum OptionMatcher {
    Value(String),
    Label(String),
    Index(u32),
}

impl OptionMatcher {
    fn from_params(params: &Value) -> std::result::Result<Self, String> {
        let value = params["value"].as_str();
        let label = params["label"].as_str();
        let index = params["index"].as_u64();

        match (value, label, index) {
            (Some(v), None, None) => Ok(Self::Value(v.to_string())),
            (None, Some(l), None) => Ok(Self::Label(l.to_string())),
            (None, None, Some(i)) => Ok(Self::Index(i as u32)),
            (None, None, None) => {
                Err("Exactly one of 'value', 'label', or 'index' is required".to_string())
            }
            _ => Err("Only one of 'value', 'label', or 'index' may be given".to_string()),
        }
    }

    /// JavaScript predicate matching one `<option>` element bound as `o`
    /// with its position bound as `i`.
    fn predicate(&self) -> String {
        match self {
            // to_string on a &str yields a quoted, escaped JS string literal.
            Self::Value(v) => format!("o.value === {}", quote(v)),
            Self::Label(l) => format!("(o.label || o.textContent.trim()) === {}", quote(l)),
            Self::Index(i) => format!("i === {i}"),
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

pub struct SelectOption;

#[async_trait]
impl BrowserTool for SelectOption {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "select_option",
            description: "Select an option in a <select> element by value, label, or index. \
                          Exactly one of the three must be provided.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": "CSS selector for the <select> element"},
                    "value": {"type": "string", "description": "Match by option value attribute"},
                    "label": {"type": "string", "description": "Match by visible option label"},
                    "index": {"type": "integer", "description": "Match by zero-based option position"}
                },
                "required": ["selector"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let selector = params["selector"]
            .as_str()
            .ok_or_else(|| Error::Tool("select_option requires 'selector'".into()))?
            .to_string();

        let matcher = match OptionMatcher::from_params(&params) {
            Ok(m) => m,
            Err(message) => {
                return ToolOutput::json(SelectOptionResult {
                    status: ToolStatus::Error,
                    selector,
                    value: None,
                    label: None,
                    index: None,
                    error_message: Some(message),
                });
            }
        };

        let session = scope::current()?;
        match select_option(&session, &selector, &matcher).await {
            Ok(result) => ToolOutput::json(result),
            Err(e) => ToolOutput::json(SelectOptionResult {
                status: ToolStatus::Error,
                selector,
                value: None,
                label: None,
                index: None,
                error_message: Some(e.to_string()),
            }),
        }
    }
}

async fn select_option(
    session: &BrowserSession,
    selector: &str,
    matcher: &OptionMatcher,
) -> Result<SelectOptionResult> {
    let expression = format!(
        r#"(() => {{
            const el = document.querySelector({selector_js});
            if (!el || el.tagName !== 'SELECT') {{
                return JSON.stringify({{found: false}});
            }}
            const idx = Array.from(el.options).findIndex((o, i) => {predicate});
            if (idx < 0) {{
                return JSON.stringify({{found: true, matched: false}});
            }}
            el.selectedIndex = idx;
            el.dispatchEvent(new Event('change', {{bubbles: true}}));
            const o = el.options[idx];
            return JSON.stringify({{
                found: true,
                matched: true,
                value: o.value,
                label: o.label || o.textContent.trim(),
                index: idx,
            }});
        }})()"#,
        selector_js = quote(selector),
        predicate = matcher.predicate(),
    );

    let raw = session.evaluate_string(&expression).await?;
    let outcome: Value = serde_json::from_str(&raw)?;

    if outcome["found"] != json!(true) {
        return Ok(SelectOptionResult {
            status: ToolStatus::NotFound,
            selector: selector.to_string(),
            value: None,
            label: None,
            index: None,
            error_message: Some(format!("Select element not found: {selector}")),
        });
    }
    if outcome["matched"] != json!(true) {
        return Ok(SelectOptionResult {
            status: ToolStatus::NotFound,
            selector: selector.to_string(),
            value: None,
            label: None,
            index: None,
            error_message: Some("No option matched the given criteria".to_string()),
        });
    }

    Ok(SelectOptionResult {
        status: ToolStatus::Success,
        selector: selector.to_string(),
        value: outcome["value"].as_str().map(str::to_string),
        label: outcome["label"].as_str().map(str::to_string),
        index: outcome["index"].as_u64().map(|i| i as u32),
        error_message: None,
    })
}

pub struct Check;

#[async_trait]
impl BrowserTool for Check {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "check",
            description: "Check a checkbox or radio input, firing a change event if its state changes.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": "CSS selector for the input"}
                },
                "required": ["selector"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        set_checked(params, true).await
    }
}

pub struct Uncheck;

#[async_trait]
impl BrowserTool for Uncheck {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "uncheck",
            description: "Uncheck a checkbox input, firing a change event if its state changes.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": "CSS selector for the input"}
                },
                "required": ["selector"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        set_checked(params, false).await
    }
}

async fn set_checked(params: Value, desired: bool) -> Result<ToolOutput> {
    let tool = if desired { "check" } else { "uncheck" };
    let selector = params["selector"]
        .as_str()
        .ok_or_else(|| Error::Tool(format!("{tool} requires 'selector'")))?
        .to_string();
    let session = scope::current()?;

    let expression = format!(
        r#"(() => {{
            const el = document.querySelector({selector_js});
            if (!el) {{
                return JSON.stringify({{found: false}});
            }}
            if (el.checked !== {desired}) {{
                el.checked = {desired};
                el.dispatchEvent(new Event('change', {{bubbles: true}}));
            }}
            return JSON.stringify({{found: true, checked: el.checked}});
        }})()"#,
        selector_js = quote(&selector),
    );

    let outcome = match session.evaluate_string(&expression).await {
        Ok(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(v) => v,
            Err(e) => return checkbox_error(selector, e.to_string()),
        },
        Err(e) => return checkbox_error(selector, e.to_string()),
    };

    if outcome["found"] != json!(true) {
        return ToolOutput::json(CheckboxResult {
            status: ToolStatus::NotFound,
            selector: selector.clone(),
            checked: None,
            error_message: Some(format!("Element not found: {selector}")),
        });
    }

    ToolOutput::json(CheckboxResult {
        status: ToolStatus::Success,
        selector,
        checked: outcome["checked"].as_bool(),
        error_message: None,
    })
}

fn checkbox_error(selector: String, message: String) -> Result<ToolOutput> {
    ToolOutput::json(CheckboxResult {
        status: ToolStatus::Error,
        selector,
        checked: None,
        error_message: Some(message),
    })
}

pub struct UploadFile;

#[async_trait]
impl BrowserTool for UploadFile {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "upload_file",
            description: "Set local file paths on a file input element.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": "CSS selector for the file input"},
                    "files": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Absolute paths of the files to attach"
                    }
                },
                "required": ["selector", "files"]
            }),
        }
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let selector = params["selector"]
            .as_str()
            .ok_or_else(|| Error::Tool("upload_file requires 'selector'".into()))?
            .to_string();
        let files: Vec<String> = params["files"]
            .as_array()
            .ok_or_else(|| Error::Tool("upload_file requires 'files'".into()))?
            .iter()
            .filter_map(|f| f.as_str().map(str::to_string))
            .collect();
        let session = scope::current()?;

        match upload(&session, &selector, &files).await {
            Ok(result) => ToolOutput::json(result),
            Err(e) => ToolOutput::json(UploadFileResult {
                status: ToolStatus::Error,
                selector,
                files,
                error_message: Some(e.to_string()),
            }),
        }
    }
}

async fn upload(
    session: &BrowserSession,
    selector: &str,
    files: &[String],
) -> Result<UploadFileResult> {
    let Some(node_id) = session.query_selector(selector).await? else {
        return Ok(UploadFileResult {
            status: ToolStatus::NotFound,
            selector: selector.to_string(),
            files: files.to_vec(),
            error_message: Some(format!("Element not found: {selector}")),
        });
    };

    session.set_file_input_files(node_id, files).await?;

    Ok(UploadFileResult {
        status: ToolStatus::Success,
        selector: selector.to_string(),
        files: files.to_vec(),
        error_message: None,
    })
}
