//! Client configuration.
//!
//! # Design
//! `ClientConfig` is plain data fixed at construction. The only environment
//! coupling is the `DEVFLOW_DEBUG` toggle, read once by `from_env` and
//! captured as a field so behavior cannot change mid-run.

use std::time::Duration;

/// Environment variable that enables wire tracing.
pub const DEBUG_ENV: &str = "DEVFLOW_DEBUG";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Per network call. `None` disables the timeout.
    pub timeout: Option<Duration>,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Empty means no `User-Agent` header is sent.
    pub user_agent: String,
    /// Emit request/response wire traces.
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: default_user_agent(),
            debug: false,
        }
    }
}

impl ClientConfig {
    /// Defaults, with `debug` taken from `DEVFLOW_DEBUG`.
    pub fn from_env() -> Self {
        Self {
            debug: parse_flag(std::env::var(DEBUG_ENV).ok().as_deref()),
            ..Self::default()
        }
    }

    /// Set the timeout. A zero duration means no timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
    }
}

pub fn default_user_agent() -> String {
    format!("devflow/{}", env!("CARGO_PKG_VERSION"))
}

/// Interpret an environment toggle value.
pub fn parse_flag(value: Option<&str>) -> bool {
    match value {
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_retries, 3);
        assert!(config.user_agent.starts_with("devflow/"));
        assert!(!config.debug);
    }

    #[test]
    fn zero_timeout_means_none() {
        let mut config = ClientConfig::default();
        config.set_timeout(Duration::ZERO);
        assert_eq!(config.timeout, None);

        config.set_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn flag_truthy_values() {
        for v in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(parse_flag(Some(v)), "{v:?} should enable");
        }
    }

    #[test]
    fn flag_falsy_values() {
        for v in ["", "0", "false", "off", "debug"] {
            assert!(!parse_flag(Some(v)), "{v:?} should not enable");
        }
        assert!(!parse_flag(None));
    }
}
