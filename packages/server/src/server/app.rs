//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::kernel::ServerDeps;
use crate::server::middleware::{extract_client_ip, supabase_auth_middleware};
use crate::server::routes::{
    append_message_handler, create_session_handler, delete_law_handler, delete_session_handler,
    enhanced_chat_handler, get_law_handler, get_session_handler, health_handler,
    list_laws_handler, list_sessions_handler, login_handler, me_handler, refresh_handler,
    register_handler, rename_session_handler, upload_law_handler,
};

/// Headroom above the upload limit for multipart framing and text fields
const BODY_LIMIT_OVERHEAD: usize = 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub deps: Arc<ServerDeps>,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Credentials (auth cookies) only with an explicit origin list
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

/// Build the Axum application router
pub fn build_app(pool: PgPool, deps: Arc<ServerDeps>, allowed_origins: &[String]) -> Router {
    let body_limit = deps.max_upload_bytes + BODY_LIMIT_OVERHEAD;
    let auth_service = deps.auth.clone();

    let app_state = AppState {
        db_pool: pool,
        deps,
    };

    Router::new()
        .route("/health", get(health_handler))
        // Chat
        .route("/api/chat-enhanced", post(enhanced_chat_handler))
        .route(
            "/api/chat/sessions",
            get(list_sessions_handler).post(create_session_handler),
        )
        .route(
            "/api/chat/sessions-fixed/:id",
            get(get_session_handler)
                .patch(rename_session_handler)
                .delete(delete_session_handler),
        )
        .route(
            "/api/chat/sessions-fixed/:id/messages",
            post(append_message_handler),
        )
        // Law library
        .route("/api/laws", get(list_laws_handler))
        .route("/api/laws/upload-word", post(upload_law_handler))
        .route(
            "/api/laws/:id",
            get(get_law_handler).delete(delete_law_handler),
        )
        // Auth
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/refresh", post(refresh_handler))
        .route("/api/auth/me", get(me_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            supabase_auth_middleware(auth_service.clone(), req, next)
        }))
        .layer(middleware::from_fn(extract_client_ip))
        .layer(Extension(app_state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(allowed_origins)),
        )
}
