use axum::{extract::Extension, Json};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};
use supabase_client::{Session, SupabaseError};
use tracing::{info, warn};

use crate::common::{ApiError, ApiResult, UserId};
use crate::domains::activity::{
    record_activity, record_suspicious, ActivityType, NewSuspiciousActivity, NewUserActivity,
};
use crate::domains::auth::{AuthUser, Role};
use crate::kernel::ServerDeps;
use crate::server::app::AppState;
use crate::server::middleware::ClientIp;

use super::audit_ip;

const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "full_name")]
    pub full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshBody {
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: String,
}

/// True when Supabase itself turned the credentials down
fn is_rejection(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<SupabaseError>()
        .is_some_and(SupabaseError::is_auth_rejection)
}

async fn role_of(deps: &ServerDeps, user_id: UserId) -> Role {
    match deps.users.find_profile(user_id).await {
        Ok(profile) => profile.map(|p| p.role()).unwrap_or(Role::User),
        Err(e) => {
            warn!(error = %e, %user_id, "Failed to load profile, assuming user role");
            Role::User
        }
    }
}

fn session_json(session: &Session, role: Role) -> Value {
    json!({
        "user": {
            "id": session.user.id,
            "email": session.user.email,
            "role": role,
        },
        "session": session,
    })
}

/// POST /api/auth/login
pub async fn login_handler(
    Extension(state): Extension<AppState>,
    ip: Option<Extension<ClientIp>>,
    WithRejection(Json(body), _): WithRejection<Json<LoginBody>, ApiError>,
) -> ApiResult<Json<Value>> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Vui lòng nhập email và mật khẩu"));
    }
    let ip = audit_ip(ip);

    let session = match state.deps.auth.sign_in(&email, &body.password).await {
        Ok(session) => session,
        Err(e) if is_rejection(&e) => {
            info!(email = %email, "Login rejected");
            record_suspicious(
                state.deps.activity.as_ref(),
                NewSuspiciousActivity::failed_login(&email, ip),
            )
            .await;
            return Err(ApiError::Unauthorized(
                "Email hoặc mật khẩu không đúng".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let user_id = UserId::parse(&session.user.id)
        .map_err(|e| anyhow::anyhow!("Supabase user id is not a UUID: {}", e))?;

    if state.deps.users.active_ban(user_id).await?.is_some() {
        record_suspicious(
            state.deps.activity.as_ref(),
            NewSuspiciousActivity::banned_user_access(user_id, ip),
        )
        .await;
        return Err(ApiError::forbidden("Tài khoản của bạn đã bị khóa"));
    }

    record_activity(
        state.deps.activity.as_ref(),
        NewUserActivity::new(user_id, ActivityType::Login).with_ip(ip),
    )
    .await;

    let role = role_of(&state.deps, user_id).await;
    Ok(Json(session_json(&session, role)))
}

/// POST /api/auth/register
pub async fn register_handler(
    Extension(state): Extension<AppState>,
    ip: Option<Extension<ClientIp>>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterBody>, ApiError>,
) -> ApiResult<Json<Value>> {
    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::bad_request("Email không hợp lệ"));
    }
    if body.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::bad_request(format!(
            "Mật khẩu phải có ít nhất {} ký tự",
            MIN_PASSWORD_CHARS
        )));
    }
    let full_name = body
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let signed_up = match state.deps.auth.sign_up(&email, &body.password, full_name).await {
        Ok(response) => response,
        Err(e) if is_rejection(&e) => {
            info!(email = %email, error = %e, "Registration rejected");
            return Err(ApiError::bad_request(
                "Không thể đăng ký: email đã được sử dụng hoặc không hợp lệ",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let user = signed_up.user();
    if let Ok(user_id) = UserId::parse(&user.id) {
        record_activity(
            state.deps.activity.as_ref(),
            NewUserActivity::new(user_id, ActivityType::Register).with_ip(audit_ip(ip)),
        )
        .await;
    }

    Ok(Json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "role": Role::User,
        },
        "session": signed_up.session(),
        "requires_confirmation": signed_up.session().is_none(),
    })))
}

/// POST /api/auth/refresh
pub async fn refresh_handler(
    Extension(state): Extension<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RefreshBody>, ApiError>,
) -> ApiResult<Json<Value>> {
    let refresh_token = body.refresh_token.trim();
    if refresh_token.is_empty() {
        return Err(ApiError::bad_request("Thiếu refresh token"));
    }

    let session = match state.deps.auth.refresh(refresh_token).await {
        Ok(session) => session,
        Err(e) if is_rejection(&e) => {
            return Err(ApiError::Unauthorized(
                "Phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    let role = match UserId::parse(&session.user.id) {
        Ok(user_id) => role_of(&state.deps, user_id).await,
        Err(_) => Role::User,
    };
    Ok(Json(session_json(&session, role)))
}

/// GET /api/auth/me
pub async fn me_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
) -> ApiResult<Json<Value>> {
    let Some(Extension(user)) = auth else {
        return Err(ApiError::unauthorized());
    };

    let profile = state.deps.users.find_profile(user.user_id).await?;
    let role = profile.as_ref().map(|p| p.role()).unwrap_or(Role::User);
    let email = profile
        .as_ref()
        .and_then(|p| p.email.clone())
        .or(user.email.clone());

    Ok(Json(json!({
        "id": user.user_id,
        "email": email,
        "full_name": profile.and_then(|p| p.full_name),
        "role": role,
        "can_manage_laws": role.can_manage_laws(),
    })))
}
