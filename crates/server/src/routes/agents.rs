use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
};
use rusqlite::Connection;

use brokerdesk_api::{
    ADMIN_KEY_HEADER, AgentCreate, AgentListQuery, AgentRead, AgentSignupForm,
    AgentSignupResponse, DetailResponse, db, service,
};

use crate::AppConfig;
use crate::error::ApiErr;
use crate::notify;
use crate::storage::{
    Db, agent_from_row, is_constraint_violation, sq_execute, sq_insert, sq_query_map,
    sq_query_opt, sq_query_row,
};

const MAX_AGENT_PAGE: u64 = 500;
const FALLBACK_SLUG: &str = "agent";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject the request unless `X-Admin-Key` matches the configured admin key.
fn require_admin(config: &AppConfig, headers: &HeaderMap) -> Result<(), ApiErr> {
    let provided = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or("");

    match config.admin_key.as_deref().map(str::trim) {
        Some(expected) if !expected.is_empty() && provided == expected => Ok(()),
        _ => Err(ApiErr::unauthorized("invalid admin key")),
    }
}

/// Frontend base URL for landing links: explicit override, then the
/// request's `Origin`, `Referer` and `Host` headers, then the default.
pub fn resolve_frontend_base_url(config: &AppConfig, headers: &HeaderMap) -> String {
    if let Some(base) = &config.frontend_base_url {
        return base.clone();
    }

    let header_str = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

    for name in [header::ORIGIN, header::REFERER] {
        if let Some(base) = header_str(name).and_then(service::base_url_from_header) {
            return base;
        }
    }

    if let Some(host) = header_str(header::HOST).map(str::trim).filter(|h| !h.is_empty()) {
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        return format!("{scheme}://{host}");
    }

    config.default_frontend_url.trim_end_matches('/').to_string()
}

/// First free slug among `base`, `base-1`, `base-2`, …
fn unique_slug(conn: &Connection, base: &str) -> Result<String, ApiErr> {
    let base = if base.is_empty() { FALLBACK_SLUG } else { base };
    for candidate in service::slug_candidates(base) {
        if service::is_reserved_slug(&candidate) {
            continue;
        }
        let taken: bool = sq_query_row(conn, db::agents::slug_exists(&candidate), |row| row.get(0))
            .map_err(ApiErr::from_db("check slug"))?;
        if !taken {
            return Ok(candidate);
        }
    }
    Err(ApiErr::internal("no free slug"))
}

fn load_agent(conn: &Connection, slug: &str) -> Result<AgentRead, ApiErr> {
    sq_query_opt(conn, db::agents::get_by_slug(slug), agent_from_row)
        .map_err(ApiErr::from_db("load agent"))?
        .ok_or_else(|| ApiErr::not_found("agent not found"))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A slug the caller asked for, if any. Reserved route names are rejected.
fn requested_slug(value: Option<&str>) -> Result<Option<&str>, ApiErr> {
    Ok(non_blank(value).map(service::validate_slug).transpose()?)
}

/// Write errors on the agents table: UNIQUE violations are the caller's fault.
fn agent_write_err(context: &'static str) -> impl FnOnce(rusqlite::Error) -> ApiErr {
    move |e| {
        if is_constraint_violation(&e) {
            ApiErr::bad_request("an agent with this email or slug already exists")
        } else {
            ApiErr::from_db(context)(e)
        }
    }
}

/// Validated, owned fields of an [`AgentCreate`] payload.
struct AgentInput {
    name: String,
    email: String,
    phone: String,
}

fn validate_agent(req: &AgentCreate) -> Result<AgentInput, ApiErr> {
    Ok(AgentInput {
        name: service::validate_required("name", &req.name)?,
        email: service::validate_email(&req.email)?,
        phone: service::validate_required("phone", &req.phone)?,
    })
}

fn agent_params<'a>(
    req: &'a AgentCreate,
    input: &'a AgentInput,
    slug: &'a str,
) -> db::agents::AgentParams<'a> {
    db::agents::AgentParams {
        name: &input.name,
        email: &input.email,
        phone: &input.phone,
        company: req.company.as_deref(),
        experience: req.experience.as_deref(),
        profile_photo_url: req.profile_photo_url.as_deref(),
        city: req.city.as_deref(),
        happy_customers: req.happy_customers,
        successful_sales: req.successful_sales,
        instagram_url: req.instagram_url.as_deref(),
        facebook_url: req.facebook_url.as_deref(),
        slug,
        is_premium: req.is_premium,
    }
}

// ---------------------------------------------------------------------------
// Admin routes
// ---------------------------------------------------------------------------

/// POST /agents/: create an agent (admin key required).
pub async fn create_agent(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    headers: HeaderMap,
    Json(req): Json<AgentCreate>,
) -> Result<Json<AgentRead>, ApiErr> {
    require_admin(&config, &headers)?;
    let input = validate_agent(&req)?;

    let conn = db.conn();
    let slug = match requested_slug(req.slug.as_deref())? {
        Some(slug) => slug.to_string(),
        None => unique_slug(&conn, &service::slugify(&input.name))?,
    };
    let id = sq_insert(&conn, db::agents::insert(&agent_params(&req, &input, &slug)))
        .map_err(agent_write_err("insert agent"))?;

    tracing::info!("created agent {id} ({slug}), premium={}", req.is_premium);
    sq_query_row(&conn, db::agents::get_by_id(id), agent_from_row)
        .map(Json)
        .map_err(ApiErr::from_db("reload agent"))
}

/// PUT /agents/{slug}: replace an agent's fields (admin key required).
pub async fn update_agent(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AgentCreate>,
) -> Result<Json<AgentRead>, ApiErr> {
    require_admin(&config, &headers)?;
    let input = validate_agent(&req)?;

    let conn = db.conn();
    let existing = load_agent(&conn, &slug)?;
    let new_slug = requested_slug(req.slug.as_deref())?.unwrap_or(&existing.slug);
    sq_execute(
        &conn,
        db::agents::replace_by_slug(&slug, &agent_params(&req, &input, new_slug)),
    )
    .map_err(agent_write_err("update agent"))?;

    sq_query_row(&conn, db::agents::get_by_id(existing.id), agent_from_row)
        .map(Json)
        .map_err(ApiErr::from_db("reload agent"))
}

/// DELETE /agents/{slug}: remove an agent; linked users are unlinked.
pub async fn delete_agent(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DetailResponse>, ApiErr> {
    require_admin(&config, &headers)?;

    let conn = db.conn();
    let agent = load_agent(&conn, &slug)?;
    sq_execute(&conn, db::agents::delete_by_slug(&slug))
        .map_err(ApiErr::from_db("delete agent"))?;
    tracing::info!("deleted agent {} ({slug})", agent.id);
    Ok(Json(DetailResponse::new("agent deleted")))
}

// ---------------------------------------------------------------------------
// Public routes
// ---------------------------------------------------------------------------

/// GET /agents/?skip&limit
pub async fn list_agents(
    State(db): State<Db>,
    Query(q): Query<AgentListQuery>,
) -> Result<Json<Vec<AgentRead>>, ApiErr> {
    let limit = q.limit.min(MAX_AGENT_PAGE);
    let conn = db.conn();
    sq_query_map(&conn, db::agents::list(q.skip, limit), agent_from_row)
        .map(Json)
        .map_err(ApiErr::from_db("list agents"))
}

/// GET /agents/{slug}
pub async fn get_agent(
    State(db): State<Db>,
    Path(slug): Path<String>,
) -> Result<Json<AgentRead>, ApiErr> {
    let conn = db.conn();
    load_agent(&conn, &slug).map(Json)
}

/// POST /agents/register: public landing-page sign-up (form-encoded).
///
/// New agents are never premium; an operator grants that through the
/// admin routes.
pub async fn register_agent(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    State(http): State<reqwest::Client>,
    headers: HeaderMap,
    Form(form): Form<AgentSignupForm>,
) -> Result<Json<AgentSignupResponse>, ApiErr> {
    let name = service::validate_required("name", &form.name)?;
    let email = service::validate_email(&form.email)?;
    let phone = service::validate_required("phone", &form.phone)?;
    let happy_customers = service::parse_counter("happy_customers", &form.happy_customers)?;
    let successful_sales = service::parse_counter("successful_sales", &form.successful_sales)?;

    let agent = {
        let conn = db.conn();

        let slug = match requested_slug(Some(form.slug.as_str()))? {
            Some(slug) => slug.to_string(),
            None => unique_slug(&conn, &service::slugify(&name))?,
        };

        let email_taken: bool =
            sq_query_row(&conn, db::agents::email_exists(&email), |row| row.get(0))
                .map_err(ApiErr::from_db("check agent email"))?;
        if email_taken {
            return Err(ApiErr::bad_request(
                "this email address is already registered",
            ));
        }
        let slug_taken: bool =
            sq_query_row(&conn, db::agents::slug_exists(&slug), |row| row.get(0))
                .map_err(ApiErr::from_db("check slug"))?;
        if slug_taken {
            return Err(ApiErr::bad_request(
                "this name is already registered, choose a different slug",
            ));
        }

        let id = sq_insert(
            &conn,
            db::agents::insert(&db::agents::AgentParams {
                name: &name,
                email: &email,
                phone: &phone,
                company: non_blank(Some(form.company.as_str())),
                experience: non_blank(Some(form.experience.as_str())),
                profile_photo_url: None,
                city: non_blank(Some(form.city.as_str())),
                happy_customers: Some(happy_customers),
                successful_sales: Some(successful_sales),
                instagram_url: non_blank(Some(form.instagram_url.as_str())),
                facebook_url: non_blank(Some(form.facebook_url.as_str())),
                slug: &slug,
                is_premium: false,
            }),
        )
        .map_err(agent_write_err("insert agent"))?;

        sq_query_row(&conn, db::agents::get_by_id(id), agent_from_row)
            .map_err(ApiErr::from_db("reload agent"))?
    };

    let base = resolve_frontend_base_url(&config, &headers);
    let landing_url = service::landing_page_url(&base, &agent.slug);
    let agent_url =
        service::agent_subdomain_url(&base, &agent.slug).unwrap_or_else(|| landing_url.clone());
    tracing::info!("agent sign-up {} ({})", agent.id, agent.slug);

    if let Some(url) = config.signup_webhook_url.clone() {
        notify::spawn_signup_webhook(
            http,
            url,
            agent.clone(),
            landing_url.clone(),
            agent_url.clone(),
        );
    }

    Ok(Json(AgentSignupResponse {
        message: "Agent registered successfully".to_string(),
        agent_id: agent.id,
        name: agent.name,
        email: agent.email,
        profile_photo_url: agent.profile_photo_url,
        slug: agent.slug,
        landing_url,
        agent_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn config() -> AppConfig {
        AppConfig {
            admin_key: Some("s3cret".into()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn admin_key_must_match() {
        let mut headers = HeaderMap::new();
        assert!(require_admin(&config(), &headers).is_err());

        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_static("wrong"));
        assert!(require_admin(&config(), &headers).is_err());

        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_static("s3cret"));
        assert!(require_admin(&config(), &headers).is_ok());
    }

    #[test]
    fn unset_admin_key_rejects_everything() {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_static(""));
        assert!(require_admin(&AppConfig::default(), &headers).is_err());
    }

    #[test]
    fn base_url_prefers_override_then_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.metraap.com"));
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://metraap.com/landing/signup.html"),
        );

        let mut cfg = AppConfig::default();
        assert_eq!(resolve_frontend_base_url(&cfg, &headers), "https://metraap.com");

        headers.insert(header::ORIGIN, HeaderValue::from_static("https://metraai.xyz"));
        assert_eq!(resolve_frontend_base_url(&cfg, &headers), "https://metraai.xyz");

        cfg.frontend_base_url = Some("https://override.example".into());
        assert_eq!(resolve_frontend_base_url(&cfg, &headers), "https://override.example");
    }

    #[test]
    fn base_url_falls_back_to_host_then_default() {
        let cfg = AppConfig::default();
        let mut headers = HeaderMap::new();
        assert_eq!(
            resolve_frontend_base_url(&cfg, &headers),
            crate::config::DEFAULT_FRONTEND_URL
        );

        headers.insert(header::HOST, HeaderValue::from_static("localhost:8000"));
        assert_eq!(resolve_frontend_base_url(&cfg, &headers), "http://localhost:8000");
    }

    #[test]
    fn slugs_get_numeric_suffixes_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::storage::init_db(dir.path()).unwrap();
        let conn = db.conn();

        assert_eq!(unique_slug(&conn, "ali-veli").unwrap(), "ali-veli");
        assert_eq!(unique_slug(&conn, "").unwrap(), FALLBACK_SLUG);

        for (email, slug) in [("a@example.com", "ali-veli"), ("b@example.com", "ali-veli-1")] {
            sq_insert(
                &conn,
                db::agents::insert(&db::agents::AgentParams {
                    name: "Ali Veli",
                    email,
                    phone: "555",
                    company: None,
                    experience: None,
                    profile_photo_url: None,
                    city: None,
                    happy_customers: None,
                    successful_sales: None,
                    instagram_url: None,
                    facebook_url: None,
                    slug,
                    is_premium: false,
                }),
            )
            .unwrap();
        }
        assert_eq!(unique_slug(&conn, "ali-veli").unwrap(), "ali-veli-2");
        assert_eq!(unique_slug(&conn, "register").unwrap(), "register-1");
    }

    #[test]
    fn reserved_slug_cannot_be_requested() {
        let err = requested_slug(Some(" register ")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(requested_slug(Some("  ")).unwrap(), None);
        assert_eq!(requested_slug(Some("ali")).unwrap(), Some("ali"));
    }
}
