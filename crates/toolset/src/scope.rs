//! Ambient-session bridge.
//!
//! Tool functions expose only their domain parameters to the agent
//! framework's schema; the active session reaches them through a
//! task-local slot instead of an explicit argument. The slot is scoped to
//! one logical call chain, so independent toolsets running concurrently
//! never observe each other's session, and the previous value (always
//! "none" in practice) is restored on every exit path, panics included.

use std::future::Future;
use std::sync::Arc;

use browser_use_core::{Error, Result};

use crate::session::BrowserSession;

tokio::task_local! {
    static CURRENT_SESSION: Arc<BrowserSession>;
}

/// Run `fut` with `session` installed as the ambient session.
pub async fn enter<F>(session: Arc<BrowserSession>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_SESSION.scope(session, fut).await
}

/// The session installed for the current invocation. Calling this outside
/// any invocation is a usage bug and yields a hard error.
pub fn current() -> Result<Arc<BrowserSession>> {
    CURRENT_SESSION
        .try_with(|session| session.clone())
        .map_err(|_| Error::NoSession)
}
