use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::common::{ApiError, ApiResult, UserId};
use crate::domains::auth::AuthUser;
use crate::domains::chat::actions::{
    append_session_message, create_session, delete_session, get_session, list_sessions,
    parse_session_id, rename_session, resolve_chat_user, AppendMessageInput,
};
use crate::server::app::AppState;
use crate::server::middleware::ClientIp;

use super::audit_ip;

/// `?userId=` fallback for clients without an auth cookie
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenameSessionBody {
    #[serde(default)]
    pub title: String,
}

fn session_user(auth: Option<Extension<AuthUser>>, query: &UserIdQuery) -> ApiResult<UserId> {
    let auth = auth.map(|Extension(user)| user);
    resolve_chat_user(auth.as_ref(), query.user_id.as_deref())
}

/// GET /api/chat/sessions
pub async fn list_sessions_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    WithRejection(Query(query), _): WithRejection<Query<UserIdQuery>, ApiError>,
) -> ApiResult<Json<Value>> {
    let user_id = session_user(auth, &query)?;
    let sessions = list_sessions(&state.deps, user_id).await?;
    Ok(Json(json!({ "sessions": sessions })))
}

/// POST /api/chat/sessions
pub async fn create_session_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    WithRejection(Query(query), _): WithRejection<Query<UserIdQuery>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<CreateSessionBody>, ApiError>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let query = UserIdQuery {
        user_id: body.user_id.or(query.user_id),
    };
    let user_id = session_user(auth, &query)?;
    let session = create_session(&state.deps, user_id, body.title.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "session": session }))))
}

/// GET /api/chat/sessions-fixed/:id
pub async fn get_session_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<UserIdQuery>, ApiError>,
) -> ApiResult<Json<Value>> {
    let user_id = session_user(auth, &query)?;
    let session = get_session(&state.deps, user_id, parse_session_id(&id)?).await?;
    Ok(Json(json!({ "session": session })))
}

/// PATCH /api/chat/sessions-fixed/:id
pub async fn rename_session_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<UserIdQuery>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<RenameSessionBody>, ApiError>,
) -> ApiResult<Json<Value>> {
    let user_id = session_user(auth, &query)?;
    let session = rename_session(&state.deps, user_id, parse_session_id(&id)?, &body.title).await?;
    Ok(Json(json!({ "session": session })))
}

/// DELETE /api/chat/sessions-fixed/:id
pub async fn delete_session_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    ip: Option<Extension<ClientIp>>,
    Path(id): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<UserIdQuery>, ApiError>,
) -> ApiResult<Json<Value>> {
    let user_id = session_user(auth, &query)?;
    delete_session(&state.deps, user_id, parse_session_id(&id)?, audit_ip(ip)).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/chat/sessions-fixed/:id/messages
pub async fn append_message_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<UserIdQuery>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<AppendMessageInput>, ApiError>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user_id = session_user(auth, &query)?;
    let message = append_session_message(&state.deps, user_id, parse_session_id(&id)?, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}
