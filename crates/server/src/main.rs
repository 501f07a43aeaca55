use brokerdesk_server::{AppConfig, AppState, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brokerdesk_server=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("data directory: {}", config.data_dir.display());

    let db = storage::init_db(&config.data_dir)?;
    tracing::info!("database initialized");

    if config.admin_key.is_none() {
        tracing::warn!("ADMIN_KEY not set; agent admin routes will reject every request");
    }
    if config.allowed_origins.is_empty() {
        tracing::info!("CORS: allowing any origin");
    }

    brokerdesk_server::serve(AppState::new(db, config)).await
}
