//! Toolset configuration.
//!
//! Every setting can come from three places, in order of precedence:
//! explicit constructor arguments, environment variables under the
//! `BROWSER_USE_` prefix, then built-in defaults.

use tracing::warn;

/// Prefix for all environment variable overrides.
pub const ENV_PREFIX: &str = "BROWSER_USE_";

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TOOL_PREFIX: &str = "browser_use";

/// Optional overrides, either passed explicitly or read from the environment.
/// `None` means "not set here, fall through to the next layer".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolsetSettings {
    /// Maximum retry attempts advertised per tool (`BROWSER_USE_MAX_RETRIES`).
    pub max_retries: Option<u32>,
    /// Prefix prepended to every tool name (`BROWSER_USE_PREFIX`).
    pub prefix: Option<String>,
    /// Always attach to a fresh page target instead of reusing an existing
    /// one (`BROWSER_USE_ALWAYS_USE_NEW_PAGE`).
    pub always_use_new_page: Option<bool>,
}

impl ToolsetSettings {
    /// Read overrides from the environment. Unset or malformed variables are
    /// treated as absent (malformed values log a warning).
    pub fn from_env() -> Self {
        Self {
            max_retries: env_u32("MAX_RETRIES"),
            prefix: env_string("PREFIX"),
            always_use_new_page: env_bool("ALWAYS_USE_NEW_PAGE"),
        }
    }

    /// Resolve `self` (explicit overrides) against the environment and the
    /// built-in defaults.
    pub fn resolve(self) -> ResolvedSettings {
        let env = Self::from_env();
        ResolvedSettings {
            max_retries: self
                .max_retries
                .or(env.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            prefix: self
                .prefix
                .or(env.prefix)
                .unwrap_or_else(|| DEFAULT_TOOL_PREFIX.to_string()),
            always_use_new_page: self
                .always_use_new_page
                .or(env.always_use_new_page)
                .unwrap_or(false),
        }
    }
}

/// Fully resolved settings with every layer applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub max_retries: u32,
    pub prefix: String,
    pub always_use_new_page: bool,
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        ToolsetSettings::default().resolve()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .filter(|s| !s.is_empty())
}

fn env_u32(name: &str) -> Option<u32> {
    let raw = env_string(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring non-numeric environment override");
            None
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = env_string(name)?;
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(var = name, value = %raw, "Ignoring non-boolean environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for name in ["MAX_RETRIES", "PREFIX", "ALWAYS_USE_NEW_PAGE"] {
            std::env::remove_var(format!("{ENV_PREFIX}{name}"));
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let resolved = ToolsetSettings::default().resolve();
        assert_eq!(resolved.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(resolved.prefix, DEFAULT_TOOL_PREFIX);
        assert!(!resolved.always_use_new_page);
    }

    #[test]
    fn environment_overrides_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("BROWSER_USE_MAX_RETRIES", "5");
        std::env::set_var("BROWSER_USE_PREFIX", "env_browser");
        std::env::set_var("BROWSER_USE_ALWAYS_USE_NEW_PAGE", "true");

        let resolved = ToolsetSettings::default().resolve();
        assert_eq!(resolved.max_retries, 5);
        assert_eq!(resolved.prefix, "env_browser");
        assert!(resolved.always_use_new_page);
        clear_env();
    }

    #[test]
    fn explicit_settings_override_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("BROWSER_USE_MAX_RETRIES", "10");
        std::env::set_var("BROWSER_USE_PREFIX", "env_browser");
        std::env::set_var("BROWSER_USE_ALWAYS_USE_NEW_PAGE", "true");

        let resolved = ToolsetSettings {
            max_retries: Some(20),
            prefix: Some("param_browser".to_string()),
            always_use_new_page: Some(false),
        }
        .resolve();
        assert_eq!(resolved.max_retries, 20);
        assert_eq!(resolved.prefix, "param_browser");
        assert!(!resolved.always_use_new_page);
        clear_env();
    }

    #[test]
    fn partial_overrides_fall_through_to_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("BROWSER_USE_MAX_RETRIES", "10");
        std::env::set_var("BROWSER_USE_PREFIX", "env_browser");
        std::env::set_var("BROWSER_USE_ALWAYS_USE_NEW_PAGE", "true");

        let resolved = ToolsetSettings {
            max_retries: Some(20),
            ..Default::default()
        }
        .resolve();
        assert_eq!(resolved.max_retries, 20);
        assert_eq!(resolved.prefix, "env_browser");
        assert!(resolved.always_use_new_page);
        clear_env();
    }

    #[test]
    fn malformed_values_are_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("BROWSER_USE_MAX_RETRIES", "not-a-number");
        std::env::set_var("BROWSER_USE_ALWAYS_USE_NEW_PAGE", "maybe");

        let resolved = ToolsetSettings::default().resolve();
        assert_eq!(resolved.max_retries, DEFAULT_MAX_RETRIES);
        assert!(!resolved.always_use_new_page);
        clear_env();
    }
}
