use axum::{
    extract::{multipart::MultipartError, Extension, Multipart, Path, Query},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use tracing::info;

use crate::common::{ApiError, ApiResult, LawId, UserId};
use crate::domains::activity::{record_activity, ActivityType, NewUserActivity};
use crate::domains::auth::{AuthUser, Role};
use crate::domains::laws::{prepare_upload, Law, LawFilter, LawPage, UploadInput};
use crate::kernel::ServerDeps;
use crate::server::app::AppState;
use crate::server::middleware::ClientIp;

use super::audit_ip;

fn law_not_found() -> ApiError {
    ApiError::not_found("Không tìm thấy văn bản pháp luật")
}

fn parse_law_id(raw: &str) -> ApiResult<LawId> {
    LawId::parse(raw).map_err(|_| law_not_found())
}

/// Signed-in editor or admin; others get 401 or 403
async fn require_law_manager(deps: &ServerDeps, auth: Option<&AuthUser>) -> ApiResult<UserId> {
    let user = auth.ok_or_else(ApiError::unauthorized)?;
    let role = deps
        .users
        .find_profile(user.user_id)
        .await?
        .map(|profile| profile.role())
        .unwrap_or(Role::User);

    if !role.can_manage_laws() {
        return Err(ApiError::forbidden(
            "Chỉ biên tập viên hoặc quản trị viên mới được quản lý văn bản",
        ));
    }
    Ok(user.user_id)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Tệp vượt quá dung lượng cho phép".to_string())
    } else {
        ApiError::bad_request(format!("Dữ liệu tải lên không hợp lệ: {}", e.body_text()))
    }
}

/// Read the `file` part and the optional override fields
async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadInput> {
    let mut input = UploadInput::default();
    let mut has_file = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                input.file_name = field.file_name().unwrap_or_default().to_string();
                input.bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
                has_file = true;
            }
            "title" => input.title = Some(field.text().await.map_err(multipart_error)?),
            "so_hieu" | "soHieu" => input.so_hieu = Some(field.text().await.map_err(multipart_error)?),
            "document_type" | "documentType" => {
                input.document_type = Some(field.text().await.map_err(multipart_error)?)
            }
            _ => {}
        }
    }

    if !has_file {
        return Err(ApiError::bad_request("Vui lòng chọn tệp để tải lên"));
    }
    Ok(input)
}

/// POST /api/laws/upload-word
pub async fn upload_law_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    ip: Option<Extension<ClientIp>>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let auth = auth.map(|Extension(user)| user);
    let user_id = require_law_manager(&state.deps, auth.as_ref()).await?;

    let mut input = read_upload(multipart).await?;
    input.uploaded_by = Some(user_id);
    let file_name = input.file_name.clone();

    let max_bytes = state.deps.max_upload_bytes;
    let new_law = tokio::task::spawn_blocking(move || prepare_upload(input, max_bytes))
        .await
        .map_err(anyhow::Error::from)??;

    let law = state.deps.laws.create(new_law).await?;
    info!(law_id = %law.id, %user_id, file_name = %file_name, "Law uploaded");

    record_activity(
        state.deps.activity.as_ref(),
        NewUserActivity::new(user_id, ActivityType::LawUpload)
            .with_details(json!({
                "law_id": law.id,
                "title": law.title,
                "file_name": file_name,
            }))
            .with_ip(audit_ip(ip)),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Tải lên văn bản thành công",
        "law": law,
    })))
}

/// GET /api/laws
pub async fn list_laws_handler(
    Extension(state): Extension<AppState>,
    WithRejection(Query(filter), _): WithRejection<Query<LawFilter>, ApiError>,
) -> ApiResult<Json<LawPage>> {
    Ok(Json(state.deps.laws.list(&filter).await?))
}

/// GET /api/laws/:id
pub async fn get_law_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Law>> {
    let law = state
        .deps
        .laws
        .find_by_id(parse_law_id(&id)?)
        .await?
        .ok_or_else(law_not_found)?;
    Ok(Json(law))
}

/// DELETE /api/laws/:id
pub async fn delete_law_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    ip: Option<Extension<ClientIp>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let auth = auth.map(|Extension(user)| user);
    let user_id = require_law_manager(&state.deps, auth.as_ref()).await?;
    let law_id = parse_law_id(&id)?;

    if !state.deps.laws.delete(law_id).await? {
        return Err(law_not_found());
    }
    info!(%law_id, %user_id, "Law deleted");

    record_activity(
        state.deps.activity.as_ref(),
        NewUserActivity::new(user_id, ActivityType::LawDelete)
            .with_details(json!({ "law_id": law_id }))
            .with_ip(audit_ip(ip)),
    )
    .await;

    Ok(Json(json!({ "success": true })))
}
