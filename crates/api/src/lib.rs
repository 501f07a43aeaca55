//! Shared API types, crypto, and SQL builders for brokerdesk.
//!
//! This crate is the **single source of truth** for all request/response
//! types exchanged between the server and the dashboard client. The
//! `backend` feature adds password/token crypto, the sea-query SQL builders,
//! and framework-agnostic business helpers used by the server.

use serde::{Deserialize, Deserializer, Serialize};

#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
pub mod deploy;
#[cfg(feature = "backend")]
pub mod service;

/// Header carrying the opaque session token on every authenticated request.
pub const SESSION_HEADER: &str = "X-Session-Token";

/// Header carrying the operator key on agent administration requests.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

// ─── Shared Enums ────────────────────────────────────────────────────────────

/// Listing category. The wire values are the ones the dashboard and the
/// landing page already use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropertyCategory {
    /// Land plot.
    Arsa,
    /// Commercial unit.
    Isyeri,
    /// Apartment.
    Daire,
}

impl PropertyCategory {
    pub const ALL: [PropertyCategory; 3] = [Self::Arsa, Self::Isyeri, Self::Daire];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Arsa => "arsa",
            Self::Isyeri => "isyeri",
            Self::Daire => "daire",
        }
    }

    /// Case-insensitive parse; surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let normalized = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                ServiceError::BadRequest("category must be one of arsa, isyeri, daire".into())
            })
    }
}

impl std::fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Utilities ───────────────────────────────────────────────────────────────

/// Deserialize a field that distinguishes "absent" (`None`) from an explicit
/// JSON `null` (`Some(None)`). Pair with `#[serde(default)]`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

// ─── Agents ──────────────────────────────────────────────────────────────────

/// Operator-side agent creation/replacement (`POST /agents/`, `PUT /agents/{slug}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCreate {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub happy_customers: Option<i64>,
    #[serde(default)]
    pub successful_sales: Option<i64>,
    #[serde(default)]
    pub instagram_url: Option<String>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    /// Generated from `name` when absent or blank.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRead {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub experience: Option<String>,
    pub profile_photo_url: Option<String>,
    pub city: Option<String>,
    pub happy_customers: Option<i64>,
    pub successful_sales: Option<i64>,
    pub instagram_url: Option<String>,
    pub facebook_url: Option<String>,
    pub slug: String,
    pub is_premium: bool,
}

/// Public agent sign-up (`POST /agents/register`, form-encoded).
///
/// Counters arrive as text from the landing-page form and are parsed
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSignupForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub experience: String,
    pub city: String,
    pub happy_customers: String,
    pub successful_sales: String,
    #[serde(default)]
    pub instagram_url: String,
    #[serde(default)]
    pub facebook_url: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSignupResponse {
    pub message: String,
    pub agent_id: i64,
    pub name: String,
    pub email: String,
    pub profile_photo_url: Option<String>,
    pub slug: String,
    pub landing_url: String,
    pub agent_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentListQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_agent_limit")]
    pub limit: u64,
}

fn default_agent_limit() -> u64 {
    100
}

impl Default for AgentListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_agent_limit(),
        }
    }
}

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Broker account registration (`POST /auth/register`, JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRead {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub agent_id: Option<i64>,
}

/// Credentials for `POST /auth/login` (form-encoded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: UserRead,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Plain `{"detail": "..."}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

// ─── Properties ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyCreate {
    pub title: String,
    pub status: String,
    pub category: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub rooms: Option<String>,
    #[serde(default)]
    pub zoning_status: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub building_age: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub specs: Option<Vec<String>>,
}

/// Partial update. Absent fields are left untouched; an explicit `null`
/// clears a nullable field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub tagline: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub area: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub rooms: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub zoning_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub floor: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub building_age: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub specs: Option<Option<Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyRead {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub status: String,
    pub category: String,
    pub price: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub tagline: Option<String>,
    pub image_url: Option<String>,
    pub area: Option<String>,
    pub rooms: Option<String>,
    pub zoning_status: Option<String>,
    pub floor: Option<String>,
    pub building_age: Option<String>,
    pub featured: bool,
    #[serde(default)]
    pub specs: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Query parameters for `GET /properties/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_email: Option<String>,
    #[serde(default)]
    pub only_mine: bool,
}

impl PropertyListQuery {
    /// Only the caller's own listings.
    pub fn mine() -> Self {
        Self {
            only_mine: true,
            ..Self::default()
        }
    }

    /// Render as a URL query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(ref c) = self.category {
            params.push(format!("category={}", urlencode(c)));
        }
        if let Some(ref s) = self.status {
            params.push(format!("status={}", urlencode(s)));
        }
        if let Some(f) = self.featured {
            params.push(format!("featured={f}"));
        }
        if let Some(ref s) = self.agent_slug {
            params.push(format!("agent_slug={}", urlencode(s)));
        }
        if let Some(ref e) = self.agent_email {
            params.push(format!("agent_email={}", urlencode(e)));
        }
        if self.only_mine {
            params.push("only_mine=true".to_string());
        }
        params.join("&")
    }
}

fn urlencode(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Shared business logic returns this; the server converts it into its
/// HTTP error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Internal(m) => m,
        }
    }

    /// Build a closure that wraps a DB/IO error into `Internal`.
    pub fn from_db<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Internal(format!("{context}: {e}"))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

/// JSON error shape `{ "detail": "..." }` returned by all error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub detail: String,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            detail: e.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(PropertyCategory::parse("ARSA").unwrap(), PropertyCategory::Arsa);
        assert_eq!(PropertyCategory::parse(" daire ").unwrap(), PropertyCategory::Daire);
        let err = PropertyCategory::parse("villa").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn property_update_distinguishes_null_from_absent() {
        let update: PropertyUpdate =
            serde_json::from_str(r#"{"price": null, "title": "Yeni"}"#).unwrap();
        assert_eq!(update.price, Some(None));
        assert_eq!(update.location, None);
        assert_eq!(update.title.as_deref(), Some("Yeni"));

        let update: PropertyUpdate = serde_json::from_str(r#"{"specs": ["a"]}"#).unwrap();
        assert_eq!(update.specs, Some(Some(vec!["a".to_string()])));
    }

    #[test]
    fn property_update_serializes_only_touched_fields() {
        let update = PropertyUpdate {
            price: Some(None),
            featured: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"price": null, "featured": true}));
    }

    #[test]
    fn list_query_string_encodes_values() {
        let query = PropertyListQuery {
            category: Some("arsa".into()),
            agent_email: Some("a+b@example.com".into()),
            featured: Some(false),
            only_mine: true,
            ..Default::default()
        };
        assert_eq!(
            query.to_query_string(),
            "category=arsa&featured=false&agent_email=a%2Bb%40example.com&only_mine=true"
        );
        assert_eq!(PropertyListQuery::default().to_query_string(), "");
    }

    #[test]
    fn login_response_defaults_token_type() {
        let resp: LoginResponse = serde_json::from_value(serde_json::json!({
            "access_token": "t",
            "user": {"id": 1, "name": "n", "email": "e@x.io", "phone": null, "company": null, "agent_id": 2}
        }))
        .unwrap();
        assert_eq!(resp.token_type, "bearer");
    }

    #[test]
    fn service_error_maps_to_detail_body() {
        let err = ServiceError::Forbidden("premium required".into());
        assert_eq!(err.status_code(), 403);
        assert_eq!(ApiError::from(&err).detail, "premium required");
    }
}
