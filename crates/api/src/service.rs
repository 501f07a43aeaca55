//! Shared business logic as framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters: they normalize input here, run the
//! built queries, and map rows back into API types.

use std::sync::LazyLock;

use regex::Regex;

use crate::{PropertyCategory, ServiceError};

// ─── Validation ─────────────────────────────────────────────────────────────

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Validate and normalize an email address. Returns the lowercased, trimmed email.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    let valid_shape = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_shape || email.len() > 254 {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

/// Validate a password length.
pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ServiceError::BadRequest(
            "password must be at most 128 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a required display field such as a name or title.
pub fn validate_required(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Normalize a listing category to its stored form.
pub fn normalize_category(raw: &str) -> Result<String, ServiceError> {
    PropertyCategory::parse(raw).map(|c| c.as_str().to_string())
}

/// Listing status is stored lowercased.
pub fn normalize_status(raw: &str) -> Result<String, ServiceError> {
    validate_required("status", raw).map(|s| s.to_lowercase())
}

// ─── Spec tags ──────────────────────────────────────────────────────────────

/// Encode spec tags for the `specs` text column. Entries are trimmed and
/// blanks dropped; nothing left means NULL.
pub fn encode_specs(specs: Option<&[String]>) -> Option<String> {
    let cleaned: Vec<&str> = specs?
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    serde_json::to_string(&cleaned).ok()
}

/// Decode the `specs` column. Anything that is not a JSON array reads as empty.
pub fn decode_specs(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

// ─── Agents ─────────────────────────────────────────────────────────────────

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid slug regex"));

fn transliterate(c: char) -> char {
    match c {
        'ç' | 'Ç' => 'c',
        'ğ' | 'Ğ' => 'g',
        'ı' | 'İ' => 'i',
        'ö' | 'Ö' => 'o',
        'ş' | 'Ş' => 's',
        'ü' | 'Ü' => 'u',
        other => other,
    }
}

/// Derive a URL slug from an agent name: Turkish letters are transliterated,
/// punctuation removed, and whitespace/hyphen runs collapsed to `-`.
pub fn slugify(name: &str) -> String {
    let ascii: String = name.chars().map(transliterate).collect();
    let stripped = NON_WORD.replace_all(&ascii, "");
    let lowered = stripped.trim().to_lowercase();
    SEPARATORS.replace_all(&lowered, "-").into_owned()
}

/// Candidate slugs in the order they should be tried: `base`, `base-1`, `base-2`, …
pub fn slug_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain((1u32..).map(move |n| format!("{base}-{n}")))
}

/// Slugs that collide with static routes under `/agents/`.
pub const RESERVED_SLUGS: &[&str] = &["register"];

pub fn is_reserved_slug(slug: &str) -> bool {
    RESERVED_SLUGS.iter().any(|r| r.eq_ignore_ascii_case(slug))
}

/// Reject an explicitly requested slug that would be unreachable by URL.
pub fn validate_slug(slug: &str) -> Result<&str, ServiceError> {
    if is_reserved_slug(slug) {
        return Err(ServiceError::BadRequest(format!("slug '{slug}' is reserved")));
    }
    Ok(slug)
}

/// Parse a counter submitted as form text.
pub fn parse_counter(field: &str, raw: &str) -> Result<i64, ServiceError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ServiceError::BadRequest(format!("{field} must be a valid number")))
}

/// Reduce a header value such as `Origin` or `Referer` to `scheme://host[:port]`.
pub fn base_url_from_header(value: &str) -> Option<String> {
    let parsed = url::Url::parse(value.trim()).ok()?;
    let host = parsed.host_str()?;
    let base = match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    };
    Some(base)
}

/// Landing page of an agent under the frontend base URL.
pub fn landing_page_url(frontend_base_url: &str, slug: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/landing/main.html?agent={slug}")
}

/// `https://{slug}.{domain}` for custom domains with wildcard DNS.
///
/// Returns `None` for localhost, loopback, `*.vercel.app`, and anything
/// without a host.
pub fn agent_subdomain_url(frontend_base_url: &str, slug: &str) -> Option<String> {
    if slug.is_empty() {
        return None;
    }
    let parsed = url::Url::parse(frontend_base_url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty()
        || host.starts_with("localhost")
        || host.starts_with("127.0.0.1")
        || host.ends_with(".vercel.app")
    {
        return None;
    }
    let netloc = match parsed.port() {
        Some(port) => format!("{slug}.{host}:{port}"),
        None => format!("{slug}.{host}"),
    };
    Some(format!("{}://{netloc}", parsed.scheme()))
}

// ─── Sessions ───────────────────────────────────────────────────────────────

/// Format a unix timestamp in SQLite `datetime` form.
pub fn sqlite_datetime(unix: i64) -> Result<String, ServiceError> {
    let dt = chrono::DateTime::from_timestamp(unix, 0)
        .ok_or_else(|| ServiceError::Internal("invalid timestamp".into()))?;
    Ok(dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Expiry of a session issued at `now_unix` with the given lifetime.
pub fn session_expiry(now_unix: i64, ttl_secs: u64) -> Result<String, ServiceError> {
    let ttl = i64::try_from(ttl_secs)
        .map_err(|_| ServiceError::Internal("session ttl overflow".into()))?;
    let expires = now_unix
        .checked_add(ttl)
        .ok_or_else(|| ServiceError::Internal("timestamp overflow".into()))?;
    sqlite_datetime(expires)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email("  Broker@Example.COM ").unwrap(),
            "broker@example.com"
        );
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("StrongPass123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
        // Length counts characters, not bytes.
        assert!(validate_password("şifreşif").is_ok());
    }

    #[test]
    fn test_normalize_category_and_status() {
        assert!(normalize_category("villa").is_err());
        assert_eq!(normalize_category("ISYERI").unwrap(), "isyeri");
        assert_eq!(normalize_status(" Satılık ").unwrap(), "satılık");
        assert!(normalize_status("   ").is_err());
    }

    #[test]
    fn specs_are_cleaned_on_encode() {
        let specs = vec![" 850 m² ".to_string(), "".to_string(), "Yola sıfır".to_string()];
        assert_eq!(
            encode_specs(Some(specs.as_slice())).as_deref(),
            Some(r#"["850 m²","Yola sıfır"]"#)
        );
        assert_eq!(encode_specs(Some(&["  ".to_string()][..])), None);
        assert_eq!(encode_specs(None), None);
    }

    #[test]
    fn specs_decode_tolerates_garbage() {
        assert_eq!(decode_specs(Some(r#"["a","b"]"#)), vec!["a", "b"]);
        assert_eq!(decode_specs(Some("[1, true]")), vec!["1", "true"]);
        assert!(decode_specs(Some("not json")).is_empty());
        assert!(decode_specs(Some(r#"{"a":1}"#)).is_empty());
        assert!(decode_specs(Some("")).is_empty());
        assert!(decode_specs(None).is_empty());
    }

    #[test]
    fn slugify_transliterates_turkish_names() {
        assert_eq!(slugify("Ayşe Güneş Çağlar"), "ayse-gunes-caglar");
        assert_eq!(slugify("  İsmail  Öztürk!! "), "ismail-ozturk");
        assert_eq!(slugify("Emlak -- Ofisi"), "emlak-ofisi");
    }

    #[test]
    fn slug_candidates_suffix_from_one() {
        let got: Vec<String> = slug_candidates("ali-veli").take(3).collect();
        assert_eq!(got, vec!["ali-veli", "ali-veli-1", "ali-veli-2"]);
    }

    #[test]
    fn route_names_are_reserved_slugs() {
        assert!(is_reserved_slug("register"));
        assert!(is_reserved_slug("Register"));
        assert!(!is_reserved_slug("register-1"));
        assert_eq!(validate_slug("register").unwrap_err().status_code(), 400);
        assert_eq!(validate_slug("ali-veli").unwrap(), "ali-veli");
    }

    #[test]
    fn counters_must_be_numeric() {
        assert_eq!(parse_counter("happy_customers", " 120 ").unwrap(), 120);
        assert_eq!(
            parse_counter("successful_sales", "many").unwrap_err().status_code(),
            400
        );
    }

    #[test]
    fn header_base_url_keeps_scheme_host_port() {
        assert_eq!(
            base_url_from_header("https://metraap.com/dashboard/index.html?x=1").as_deref(),
            Some("https://metraap.com")
        );
        assert_eq!(
            base_url_from_header("http://localhost:8080/").as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(base_url_from_header("not a url"), None);
    }

    #[test]
    fn landing_urls() {
        assert_eq!(
            landing_page_url("https://metraap.com/", "ali"),
            "https://metraap.com/landing/main.html?agent=ali"
        );
        assert_eq!(
            agent_subdomain_url("https://www.metraap.com", "ali").as_deref(),
            Some("https://ali.metraap.com")
        );
        assert_eq!(
            agent_subdomain_url("https://metraai.xyz:8443", "ali").as_deref(),
            Some("https://ali.metraai.xyz:8443")
        );
        assert_eq!(agent_subdomain_url("http://localhost:3000", "ali"), None);
        assert_eq!(agent_subdomain_url("https://demo.vercel.app", "ali"), None);
        assert_eq!(agent_subdomain_url("https://metraap.com", ""), None);
    }

    #[test]
    fn session_expiry_formats_for_sqlite() {
        assert_eq!(sqlite_datetime(0).unwrap(), "1970-01-01 00:00:00");
        assert_eq!(session_expiry(0, 8 * 3600).unwrap(), "1970-01-01 08:00:00");
        assert!(session_expiry(i64::MAX, 10).is_err());
    }
}
