//! Session actions - CRUD over a user's chat sessions.
//!
//! A session owned by someone else is reported as missing.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::{ApiError, ApiResult, SessionId, UserId};
use crate::domains::activity::{record_activity, ActivityType, NewUserActivity};
use crate::domains::chat::models::{
    normalize_title, ChatMessage, ChatSession, MessageRole, NewChatMessage, DEFAULT_SESSION_TITLE,
};
use crate::kernel::ServerDeps;

/// A session with its messages, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWithMessages {
    #[serde(flatten)]
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppendMessageInput {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

fn session_not_found() -> ApiError {
    ApiError::not_found("Không tìm thấy cuộc trò chuyện")
}

/// Parse a session id from the path; malformed ids are simply not found
pub fn parse_session_id(raw: &str) -> ApiResult<SessionId> {
    SessionId::parse(raw).map_err(|_| session_not_found())
}

async fn load_owned_session(
    deps: &ServerDeps,
    user_id: UserId,
    session_id: SessionId,
) -> ApiResult<ChatSession> {
    match deps.chats.find_session(session_id).await? {
        Some(session) if session.is_owned_by(user_id) => Ok(session),
        _ => Err(session_not_found()),
    }
}

pub async fn list_sessions(deps: &ServerDeps, user_id: UserId) -> ApiResult<Vec<ChatSession>> {
    Ok(deps.chats.list_sessions(user_id).await?)
}

pub async fn create_session(
    deps: &ServerDeps,
    user_id: UserId,
    title: Option<&str>,
) -> ApiResult<ChatSession> {
    let title = title
        .and_then(normalize_title)
        .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());
    let session = deps.chats.create_session(user_id, &title).await?;
    info!(session_id = %session.id, %user_id, "Chat session created");
    Ok(session)
}

pub async fn get_session(
    deps: &ServerDeps,
    user_id: UserId,
    session_id: SessionId,
) -> ApiResult<SessionWithMessages> {
    let session = load_owned_session(deps, user_id, session_id).await?;
    let messages = deps.chats.list_messages(session.id).await?;
    Ok(SessionWithMessages { session, messages })
}

pub async fn rename_session(
    deps: &ServerDeps,
    user_id: UserId,
    session_id: SessionId,
    title: &str,
) -> ApiResult<ChatSession> {
    let title =
        normalize_title(title).ok_or_else(|| ApiError::bad_request("Tiêu đề không được để trống"))?;
    load_owned_session(deps, user_id, session_id).await?;

    deps.chats
        .rename_session(session_id, &title)
        .await?
        .ok_or_else(session_not_found)
}

pub async fn delete_session(
    deps: &ServerDeps,
    user_id: UserId,
    session_id: SessionId,
    ip_address: Option<String>,
) -> ApiResult<()> {
    load_owned_session(deps, user_id, session_id).await?;

    if !deps.chats.delete_session(session_id).await? {
        return Err(session_not_found());
    }
    info!(%session_id, %user_id, "Chat session deleted");

    record_activity(
        deps.activity.as_ref(),
        NewUserActivity::new(user_id, ActivityType::SessionDelete)
            .with_details(serde_json::json!({ "session_id": session_id }))
            .with_ip(ip_address),
    )
    .await;
    Ok(())
}

pub async fn append_session_message(
    deps: &ServerDeps,
    user_id: UserId,
    session_id: SessionId,
    input: AppendMessageInput,
) -> ApiResult<ChatMessage> {
    let role: MessageRole = input
        .role
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Vai trò tin nhắn phải là 'user' hoặc 'assistant'"))?;
    if input.content.trim().is_empty() {
        return Err(ApiError::bad_request("Nội dung tin nhắn không được để trống"));
    }
    load_owned_session(deps, user_id, session_id).await?;

    let message = deps
        .chats
        .append_message(NewChatMessage {
            session_id,
            role,
            content: input.content,
            metadata: input.metadata,
        })
        .await?;
    Ok(message)
}
