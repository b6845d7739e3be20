use axum::{extract::Extension, Json};
use axum_extra::extract::WithRejection;

use crate::common::{ApiError, ApiResult};
use crate::domains::auth::AuthUser;
use crate::domains::chat::actions::{enhanced_chat, EnhancedChatRequest, EnhancedChatResponse};
use crate::server::app::AppState;
use crate::server::middleware::ClientIp;

use super::audit_ip;

/// POST /api/chat-enhanced
pub async fn enhanced_chat_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    ip: Option<Extension<ClientIp>>,
    WithRejection(Json(body), _): WithRejection<Json<EnhancedChatRequest>, ApiError>,
) -> ApiResult<Json<EnhancedChatResponse>> {
    let auth = auth.map(|Extension(user)| user);
    let response = enhanced_chat(&state.deps, auth.as_ref(), body, audit_ip(ip)).await?;
    Ok(Json(response))
}
