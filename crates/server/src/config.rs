use std::path::PathBuf;

use brokerdesk_api::deploy::{self, non_empty};

/// Fallback used for landing links when no request header names a frontend.
pub const DEFAULT_FRONTEND_URL: &str = "https://metra-ai-monorepo.vercel.app";

/// Server configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub session_ttl_secs: u64,
    pub admin_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub frontend_base_url: Option<String>,
    pub default_frontend_url: String,
    pub signup_webhook_url: Option<String>,
    pub web_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            port: 8000,
            session_ttl_secs: deploy::DEFAULT_SESSION_TTL_HOURS * 3600,
            admin_key: None,
            allowed_origins: Vec::new(),
            frontend_base_url: None,
            default_frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            signup_webhook_url: None,
            web_dir: None,
        }
    }
}

impl AppConfig {
    /// Read every setting from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| non_empty(lookup(key));

        let port = match get("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("invalid PORT {raw:?}, using {}", defaults.port);
                defaults.port
            }),
            None => defaults.port,
        };

        let ttl_hours =
            deploy::parse_session_ttl_hours(get(deploy::ENV_SESSION_TTL_HOURS).as_deref());

        Self {
            data_dir: get(deploy::ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            port,
            session_ttl_secs: ttl_hours.saturating_mul(3600),
            admin_key: get(deploy::ENV_ADMIN_KEY),
            allowed_origins: deploy::parse_origin_list(
                get(deploy::ENV_ALLOWED_ORIGINS).as_deref(),
            ),
            frontend_base_url: get(deploy::ENV_FRONTEND_BASE_URL)
                .map(|url| url.trim_end_matches('/').to_string()),
            default_frontend_url: get(deploy::ENV_DEFAULT_FRONTEND_URL)
                .unwrap_or(defaults.default_frontend_url),
            signup_webhook_url: get(deploy::ENV_SIGNUP_WEBHOOK_URL),
            web_dir: get(deploy::ENV_WEB_DIR).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.session_ttl_secs, 8 * 3600);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.admin_key.is_none());
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.default_frontend_url, DEFAULT_FRONTEND_URL);
    }

    #[test]
    fn env_values_override_defaults() {
        let config = config_from(&[
            ("PORT", "9100"),
            ("SESSION_TTL_HOURS", "2"),
            ("ADMIN_KEY", "  "),
            ("FRONTEND_BASE_URL", "https://metraap.com/"),
            ("ALLOWED_ORIGINS", "http://localhost:8080,https://metraap.com"),
        ]);
        assert_eq!(config.port, 9100);
        assert_eq!(config.session_ttl_secs, 7200);
        assert!(config.admin_key.is_none(), "blank admin key counts as unset");
        assert_eq!(
            config.frontend_base_url.as_deref(),
            Some("https://metraap.com")
        );
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let config = config_from(&[("PORT", "http"), ("SESSION_TTL_HOURS", "eight")]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.session_ttl_secs, 8 * 3600);
    }
}
