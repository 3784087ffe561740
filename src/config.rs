//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Store key holding the serialized profile document.
pub const PROFILE_KEY: &str = "aura-user-data";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
/// Number of trailing chat messages sent with each request.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;
pub const DEFAULT_DB_PATH: &str = "./data/aura.db";

/// Runtime configuration for the assistant.
#[derive(Debug, Clone)]
pub struct AuraConfig {
    pub api_key: SecretString,
    pub model: String,
    pub max_tokens: u32,
    pub api_url: String,
    pub history_window: usize,
    /// Whether the web search tool descriptor is sent with each request.
    pub web_search: bool,
    pub db_path: PathBuf,
    /// Port for the dashboard/chat REST API. Disabled when `None`.
    pub http_port: Option<u16>,
    /// Directory for rolling log files. Logs go to stderr when `None`.
    pub log_dir: Option<PathBuf>,
}

impl AuraConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;

        let model = lookup("AURA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = lookup("AURA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let max_tokens = parse_or(&lookup, "AURA_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let history_window = parse_or(&lookup, "AURA_HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW)?;
        if history_window == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AURA_HISTORY_WINDOW".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let web_search = parse_or(&lookup, "AURA_WEB_SEARCH", true)?;

        let db_path = lookup("AURA_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let http_port = match lookup("AURA_HTTP_PORT") {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: "AURA_HTTP_PORT".to_string(),
                    message: e.to_string(),
                }
            })?),
            None => None,
        };

        let log_dir = lookup("AURA_LOG_DIR").map(PathBuf::from);

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
            max_tokens,
            api_url,
            history_window,
            web_search,
            db_path,
            http_port,
            log_dir,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = AuraConfig::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_key.expose_secret(), "sk-test");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 4000);
        assert_eq!(config.history_window, 10);
        assert!(config.web_search);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(config.http_port.is_none());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = AuraConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AuraConfig::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("AURA_MODEL", "claude-x"),
            ("AURA_MAX_TOKENS", "512"),
            ("AURA_HISTORY_WINDOW", "4"),
            ("AURA_WEB_SEARCH", "false"),
            ("AURA_HTTP_PORT", "8099"),
            ("AURA_DB_PATH", "/tmp/aura.db"),
        ]))
        .unwrap();
        assert_eq!(config.model, "claude-x");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.history_window, 4);
        assert!(!config.web_search);
        assert_eq!(config.http_port, Some(8099));
        assert_eq!(config.db_path, PathBuf::from("/tmp/aura.db"));
    }

    #[test]
    fn invalid_number_reports_key() {
        let err = AuraConfig::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("AURA_MAX_TOKENS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "AURA_MAX_TOKENS"));
    }

    #[test]
    fn zero_history_window_rejected() {
        let err = AuraConfig::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("AURA_HISTORY_WINDOW", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
