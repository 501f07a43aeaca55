pub mod config;
pub mod error;
mod notify;
pub mod routes;
pub mod storage;

use axum::{
    Router,
    extract::FromRef,
    http::HeaderValue,
    routing::{MethodRouter, get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
use storage::Db;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: Db, config: AppConfig) -> Self {
        Self {
            db,
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for reqwest::Client {
    fn from_ref(state: &AppState) -> Self {
        state.http.clone()
    }
}

/// Register `path` both with and without a trailing slash.
fn route_both(router: Router<AppState>, path: &str, method: MethodRouter<AppState>) -> Router<AppState> {
    let trimmed = path.trim_end_matches('/');
    router
        .route(trimmed, method.clone())
        .route(&format!("{trimmed}/"), method)
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let mut api = Router::new();
    api = route_both(api, "/health", get(routes::health::health));

    // Auth
    api = route_both(api, "/auth/register", post(routes::auth::register));
    api = route_both(api, "/auth/login", post(routes::auth::login));
    api = route_both(api, "/auth/logout", post(routes::auth::logout));
    api = route_both(api, "/auth/me", get(routes::auth::me));

    // Properties
    api = route_both(
        api,
        "/properties",
        get(routes::properties::list_properties).post(routes::properties::create_property),
    );
    api = route_both(
        api,
        "/properties/{id}",
        get(routes::properties::get_property)
            .put(routes::properties::update_property)
            .delete(routes::properties::delete_property),
    );

    // Agents
    api = route_both(
        api,
        "/agents",
        get(routes::agents::list_agents).post(routes::agents::create_agent),
    );
    api = route_both(api, "/agents/register", post(routes::agents::register_agent));
    api = route_both(
        api,
        "/agents/{slug}",
        get(routes::agents::get_agent)
            .put(routes::agents::update_agent)
            .delete(routes::agents::delete_agent),
    );

    // Serve the dashboard/landing static files when configured
    if let Some(web_dir) = state.config.web_dir.as_ref().filter(|dir| dir.exists()) {
        tracing::info!("serving static files from {}", web_dir.display());
        let index_html = web_dir.join("index.html");
        api = api.fallback_service(ServeDir::new(web_dir).fallback(ServeFile::new(index_html)));
    }

    let cors = cors_layer(&state.config.allowed_origins);
    api.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind `0.0.0.0:{port}` and serve until the process is stopped.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(listener, state).await
}

/// Serve on an already bound listener (tests bind port 0).
pub async fn serve_on(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
