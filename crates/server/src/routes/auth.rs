use axum::{
    Form, Json,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, request::Parts},
};
use rusqlite::Connection;

use brokerdesk_api::{
    DetailResponse, LoginForm, LoginResponse, RegisterRequest, SESSION_HEADER, UserRead, crypto,
    db, service,
};

use crate::AppConfig;
use crate::error::ApiErr;
use crate::storage::{
    Db, is_constraint_violation, sq_execute, sq_insert, sq_query_opt, sq_query_row, user_from_row,
};

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated broker resolved from the `X-Session-Token` header.
///
/// Use `Result<AuthUser, ApiErr>` as the extractor where a session is optional.
pub struct AuthUser {
    pub user: UserRead,
}

/// Raw session token from the request headers, if present and non-blank.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn now_sqlite() -> Result<String, ApiErr> {
    service::sqlite_datetime(chrono::Utc::now().timestamp()).map_err(ApiErr::from)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Db: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| ApiErr::unauthorized("missing session token"))?;
        let token_hash = crypto::hash_token(token);
        let now = now_sqlite()?;

        let db = Db::from_ref(state);
        let conn = db.conn();
        let user_id: Option<i64> = sq_query_opt(
            &conn,
            db::sessions::lookup_user(&token_hash, &now),
            |row| row.get(0),
        )
        .map_err(ApiErr::from_db("session lookup"))?;
        let user_id = user_id.ok_or_else(|| ApiErr::unauthorized("invalid or expired session"))?;

        match sq_query_opt(&conn, db::users::get_by_id(user_id), user_from_row)
            .map_err(ApiErr::from_db("session user lookup"))?
        {
            Some((user, true)) => Ok(AuthUser { user }),
            _ => {
                sq_execute(&conn, db::sessions::delete_by_hash(&token_hash))
                    .map_err(ApiErr::from_db("drop orphaned session"))?;
                Err(ApiErr::unauthorized(
                    "session owner no longer exists or is inactive",
                ))
            }
        }
    }
}

/// Fail with 403 unless the user is linked to an agent that is currently premium.
pub fn require_premium(conn: &Connection, user: &UserRead, msg: &str) -> Result<(), ApiErr> {
    let agent_id = user.agent_id.ok_or_else(|| ApiErr::forbidden(msg))?;
    let premium: Option<bool> = sq_query_opt(conn, db::agents::is_premium(agent_id), |row| {
        row.get(0)
    })
    .map_err(ApiErr::from_db("premium lookup"))?;
    if premium == Some(true) {
        Ok(())
    } else {
        Err(ApiErr::forbidden(msg))
    }
}

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

/// POST /auth/register: create a broker account for a premium agent.
pub async fn register(
    State(db): State<Db>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserRead>, ApiErr> {
    service::validate_password(&req.password)?;
    let email = service::validate_email(&req.email)?;
    let name = service::validate_required("name", &req.name)?;

    let conn = db.conn();
    let exists: bool = sq_query_row(&conn, db::users::email_exists(&email), |row| row.get(0))
        .map_err(ApiErr::from_db("check user email"))?;
    if exists {
        return Err(ApiErr::bad_request("a user with this email already exists"));
    }

    let agent = sq_query_opt(&conn, db::agents::get_by_email(&email), crate::storage::agent_from_row)
        .map_err(ApiErr::from_db("agent lookup"))?;
    let agent = match agent {
        Some(agent) if agent.is_premium => agent,
        _ => {
            return Err(ApiErr::forbidden(
                "this agent does not have premium access",
            ));
        }
    };

    let (password_hash, password_salt) = crypto::hash_password(&req.password)?;
    let user_id = sq_insert(
        &conn,
        db::users::insert(&db::users::InsertParams {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            password_salt: &password_salt,
            phone: req.phone.as_deref(),
            company: req.company.as_deref(),
            agent_id: Some(agent.id),
        }),
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            ApiErr::bad_request("a user with this email already exists")
        } else {
            ApiErr::from_db("insert user")(e)
        }
    })?;

    tracing::info!("registered broker {user_id} for agent {}", agent.slug);
    let (user, _) = sq_query_row(&conn, db::users::get_by_id(user_id), user_from_row)
        .map_err(ApiErr::from_db("reload user"))?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

/// POST /auth/login: form-encoded credentials, returns a session token.
pub async fn login(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, ApiErr> {
    let invalid = || ApiErr::unauthorized("invalid email or password");
    let email = service::validate_email(&form.email).map_err(|_| invalid())?;

    let conn = db.conn();
    let found = sq_query_opt(&conn, db::users::get_by_email_for_login(&email), |row| {
        let (user, active) = user_from_row(row)?;
        let hash: String = row.get(7)?;
        let salt: String = row.get(8)?;
        Ok((user, active, hash, salt))
    })
    .map_err(ApiErr::from_db("login lookup"))?;

    let Some((user, active, hash, salt)) = found else {
        return Err(invalid());
    };
    if !active || !crypto::verify_password(&form.password, &hash, &salt) {
        return Err(invalid());
    }
    require_premium(&conn, &user, "premium access required")?;

    let now = chrono::Utc::now().timestamp();
    let now_str = service::sqlite_datetime(now)?;
    sq_execute(&conn, db::sessions::delete_expired(&now_str))
        .map_err(ApiErr::from_db("purge expired sessions"))?;

    let token = crypto::generate_session_token()?;
    let expires_at = service::session_expiry(now, config.session_ttl_secs)?;
    sq_execute(
        &conn,
        db::sessions::insert(user.id, &crypto::hash_token(&token), &expires_at),
    )
    .map_err(ApiErr::from_db("insert session"))?;

    tracing::info!("user {} logged in", user.id);
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user,
    }))
}

/// POST /auth/logout: drop the presented session. Unknown tokens are fine.
pub async fn logout(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<DetailResponse>, ApiErr> {
    let token = session_token(&headers)
        .ok_or_else(|| ApiErr::unauthorized("missing session token"))?;
    let conn = db.conn();
    sq_execute(&conn, db::sessions::delete_by_hash(&crypto::hash_token(token)))
        .map_err(ApiErr::from_db("delete session"))?;
    Ok(Json(DetailResponse::new("logged out")))
}

/// GET /auth/me: the broker behind the session.
pub async fn me(auth: AuthUser) -> Json<UserRead> {
    Json(auth.user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_token_reads_trimmed_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(SESSION_HEADER, HeaderValue::from_static("   "));
        assert_eq!(session_token(&headers), None);

        headers.insert(SESSION_HEADER, HeaderValue::from_static(" abc123 "));
        assert_eq!(session_token(&headers), Some("abc123"));
    }

    #[test]
    fn premium_check_requires_linked_premium_agent() {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::storage::init_db(dir.path()).unwrap();
        let conn = db.conn();

        let mut user = UserRead {
            id: 1,
            name: "Broker".into(),
            email: "broker@example.com".into(),
            phone: None,
            company: None,
            agent_id: None,
        };
        let err = require_premium(&conn, &user, "nope").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);

        let params = |premium| db::agents::AgentParams {
            name: "Broker",
            email: "broker@example.com",
            phone: "555",
            company: None,
            experience: None,
            profile_photo_url: None,
            city: None,
            happy_customers: None,
            successful_sales: None,
            instagram_url: None,
            facebook_url: None,
            slug: "broker",
            is_premium: premium,
        };
        let agent_id = sq_insert(&conn, db::agents::insert(&params(false))).unwrap();
        user.agent_id = Some(agent_id);
        assert!(require_premium(&conn, &user, "nope").is_err());

        sq_execute(&conn, db::agents::replace_by_slug("broker", &params(true))).unwrap();
        assert!(require_premium(&conn, &user, "nope").is_ok());
    }
}
