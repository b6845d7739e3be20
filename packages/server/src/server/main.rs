// Main entry point for API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use legalbot_core::{
    domains::auth::{SupabaseAuthService, SupabaseJwtVerifier},
    kernel::{BaseChatWebhook, N8nChatWebhook, ServerDeps},
    server::build_app,
    Config,
};
use sqlx::postgres::PgPoolOptions;
use supabase_client::SupabaseClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,legalbot_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Trợ lý Pháp luật API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database (schema is owned by Supabase, no migrations here)
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Supabase Auth
    let supabase = SupabaseClient::new(
        config.supabase_url.clone(),
        config.supabase_api_key().to_string(),
    );
    let verifier = config
        .supabase_jwt_secret
        .as_deref()
        .map(SupabaseJwtVerifier::new);
    if verifier.is_none() {
        tracing::warn!("SUPABASE_JWT_SECRET not set, access tokens are verified remotely");
    }
    let auth = Arc::new(SupabaseAuthService::new(supabase, verifier));

    // n8n chat workflow (optional)
    let chat_webhook: Option<Arc<dyn BaseChatWebhook>> = match &config.n8n_chat_webhook {
        Some(url) => {
            let webhook = N8nChatWebhook::new(
                url.clone(),
                Duration::from_secs(config.n8n_timeout_secs),
            )
            .context("Failed to create n8n webhook client")?;
            tracing::info!(url = %url, "n8n chat webhook enabled");
            Some(Arc::new(webhook))
        }
        None => {
            tracing::info!("n8n chat webhook disabled, answering from local search only");
            None
        }
    };

    let deps = Arc::new(ServerDeps::with_postgres(
        pool.clone(),
        auth,
        chat_webhook,
        config.max_upload_bytes,
    ));

    // Build application
    let app = build_app(pool, deps, &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
