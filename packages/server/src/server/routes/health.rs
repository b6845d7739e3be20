use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::server::app::AppState;

/// Upper bound on the `SELECT 1` round trip to Supabase Postgres
const DATABASE_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthReport {
    status: &'static str,
    database: DatabaseCheck,
    connection_pool: PoolSnapshot,
    /// "configured" or "disabled"; the n8n workflow is never called from here
    chat_webhook: &'static str,
}

#[derive(Serialize)]
pub struct DatabaseCheck {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct PoolSnapshot {
    size: u32,
    idle_connections: usize,
    max_connections: u32,
}

async fn check_database(pool: &PgPool) -> DatabaseCheck {
    let error = match tokio::time::timeout(
        DATABASE_PING_TIMEOUT,
        sqlx::query("SELECT 1").execute(pool),
    )
    .await
    {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => Some(format!("Query failed: {}", e)),
        Err(_) => Some(format!("Query timeout (>{}s)", DATABASE_PING_TIMEOUT.as_secs())),
    };

    DatabaseCheck {
        status: if error.is_none() { "ok" } else { "error" },
        error,
    }
}

/// GET /health
///
/// 200 while the law library and chat history database answers, 503 otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthReport>) {
    let database = check_database(&state.db_pool).await;

    let connection_pool = PoolSnapshot {
        size: state.db_pool.size(),
        idle_connections: state.db_pool.num_idle(),
        max_connections: state.db_pool.options().get_max_connections(),
    };

    let chat_webhook = match state.deps.chat_webhook {
        Some(_) => "configured",
        None => "disabled",
    };

    let (code, status) = match database.error {
        None => (StatusCode::OK, "healthy"),
        Some(_) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        code,
        Json(HealthReport {
            status,
            database,
            connection_pool,
            chat_webhook,
        }),
    )
}
