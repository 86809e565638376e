//! The tool catalog: navigation, interaction, state/inspection, and form
//! control operations. Each tool resolves its domain arguments from the
//! params object, reaches the session through [`crate::scope`], and
//! normalizes every outcome into a typed result; expected misses are status
//! values, only programmer misuse propagates as `Err`.

pub mod form;
pub mod interaction;
pub mod navigation;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use crate::BrowserTool;

/// Settle delay after a pointer press/release sequence. CDP acknowledges the
/// event dispatch, not the page's reaction to it, so a bounded wait stands in
/// for a completion signal. Known flakiness source on slow pages.
pub const CLICK_SETTLE: Duration = Duration::from_millis(500);

/// Settle delay after `Page.navigate` / `Page.reload` before the page is
/// re-queried for its URL and title. Same caveat as [`CLICK_SETTLE`].
pub const NAV_SETTLE: Duration = Duration::from_secs(1);

/// Settle delay after jumping to a history entry.
pub const HISTORY_SETTLE: Duration = Duration::from_millis(500);

/// The full catalog, in discovery order.
pub fn catalog() -> Vec<Arc<dyn BrowserTool>> {
    vec![
        Arc::new(navigation::NavigateToUrl),
        Arc::new(navigation::GoBack),
        Arc::new(navigation::GoForward),
        Arc::new(navigation::ReloadPage),
        Arc::new(interaction::ClickElement),
        Arc::new(interaction::TypeText),
        Arc::new(interaction::ExecuteJavascript),
        Arc::new(interaction::ScrollTo),
        Arc::new(state::GetPageInfo),
        Arc::new(state::GetPageContent),
        Arc::new(state::TakeScreenshot),
        Arc::new(state::TakeElementScreenshot),
        Arc::new(state::GetViewportInfo),
        Arc::new(form::SelectOption),
        Arc::new(form::Check),
        Arc::new(form::Uncheck),
        Arc::new(form::UploadFile),
    ]
}
