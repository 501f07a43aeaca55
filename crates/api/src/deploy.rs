//! Deployment knobs shared by the server runtime and its operators.

/// Directory holding the SQLite database file.
pub const ENV_DATA_DIR: &str = "BROKERDESK_DATA_DIR";

/// Optional directory of static dashboard/landing files served as fallback.
pub const ENV_WEB_DIR: &str = "BROKERDESK_WEB_DIR";

/// Session lifetime in whole hours.
pub const ENV_SESSION_TTL_HOURS: &str = "SESSION_TTL_HOURS";

/// Operator key required by agent administration routes.
pub const ENV_ADMIN_KEY: &str = "ADMIN_KEY";

/// Comma-separated CORS origin allow-list. Empty means any origin.
pub const ENV_ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";

/// Forces the base URL used for landing-page links.
pub const ENV_FRONTEND_BASE_URL: &str = "FRONTEND_BASE_URL";

/// Base URL used when neither the override nor request headers yield one.
pub const ENV_DEFAULT_FRONTEND_URL: &str = "DEFAULT_FRONTEND_URL";

/// Endpoint notified (JSON POST) after a public agent sign-up.
pub const ENV_SIGNUP_WEBHOOK_URL: &str = "SIGNUP_WEBHOOK_URL";

pub const DEFAULT_SESSION_TTL_HOURS: u64 = 8;

/// Parse the session TTL setting, falling back to the default on missing or
/// malformed input.
pub fn parse_session_ttl_hours(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_SESSION_TTL_HOURS)
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origin_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Treat empty or whitespace-only env values as unset.
pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ttl_uses_default_for_bad_values() {
        assert_eq!(parse_session_ttl_hours(None), 8);
        assert_eq!(parse_session_ttl_hours(Some("abc")), 8);
        assert_eq!(parse_session_ttl_hours(Some("-3")), 8);
        assert_eq!(parse_session_ttl_hours(Some(" 24 ")), 24);
    }

    #[test]
    fn origin_list_drops_blanks() {
        assert_eq!(
            parse_origin_list(Some("http://localhost:8080/, ,https://metraap.com")),
            vec!["http://localhost:8080", "https://metraap.com"]
        );
        assert!(parse_origin_list(Some("")).is_empty());
        assert!(parse_origin_list(None).is_empty());
    }

    #[test]
    fn non_empty_filters_whitespace() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" k ".into())), Some("k".into()));
        assert_eq!(non_empty(None), None);
    }
}
