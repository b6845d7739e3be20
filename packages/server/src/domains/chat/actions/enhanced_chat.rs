//! Enhanced chat action - answers one user message.
//!
//! Flow: identity and ban checks, classification, then the first source that
//! produces an answer: greeting text, the n8n workflow, a summary of the
//! previous answer, or local search. Logging and message persistence run
//! afterwards and never fail the request.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::common::{ApiError, ApiResult, LawId, SessionId, UserId};
use crate::domains::activity::{
    record_activity, record_suspicious, ActivityType, NewSuspiciousActivity, NewUserActivity,
};
use crate::domains::auth::AuthUser;
use crate::domains::chat::classifier::{classify, QueryAnalysis};
use crate::domains::chat::models::{NewChatMessage, NewQueryLog};
use crate::domains::chat::ranking::{extract_keywords, local_search};
use crate::domains::chat::responder;
use crate::kernel::{
    HistoryTurn, ServerDeps, UploadedFile, WebhookContext, WebhookReply, WebhookRequest,
};

/// Prior turns forwarded to the workflow
pub const WEBHOOK_HISTORY_TURNS: usize = 10;

/// Request body of `POST /api/chat-enhanced`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedChatRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub messages: Vec<HistoryTurn>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub uploaded_files: Vec<UploadedFile>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Which branch produced the answer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Greeting,
    N8nWebhook,
    FollowUpSummary,
    LocalSearch,
    NoResults,
    OutOfScope,
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMethod::Greeting => write!(f, "greeting"),
            SearchMethod::N8nWebhook => write!(f, "n8n_webhook"),
            SearchMethod::FollowUpSummary => write!(f, "follow_up_summary"),
            SearchMethod::LocalSearch => write!(f, "local_search"),
            SearchMethod::NoResults => write!(f, "no_results"),
            SearchMethod::OutOfScope => write!(f, "out_of_scope"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedChatResponse {
    pub response: String,
    pub sources: Vec<Value>,
    pub matched_ids: Vec<LawId>,
    pub total_sources: usize,
    pub search_method: SearchMethod,
}

impl EnhancedChatResponse {
    fn text(response: impl Into<String>, search_method: SearchMethod) -> Self {
        Self {
            response: response.into(),
            sources: Vec::new(),
            matched_ids: Vec::new(),
            total_sources: 0,
            search_method,
        }
    }

    fn with_sources(mut self, sources: Vec<Value>, matched_ids: Vec<LawId>) -> Self {
        self.total_sources = sources.len();
        self.sources = sources;
        self.matched_ids = matched_ids;
        self
    }
}

/// The acting user: the authenticated one, else the `userId` from the body.
///
/// A body id that disagrees with the token is rejected.
pub fn resolve_chat_user(auth: Option<&AuthUser>, body_user_id: Option<&str>) -> ApiResult<UserId> {
    let body_user_id = body_user_id.map(str::trim).filter(|s| !s.is_empty());

    match (auth, body_user_id) {
        (Some(user), None) => Ok(user.user_id),
        (Some(user), Some(raw)) => match UserId::parse(raw) {
            Ok(id) if id == user.user_id => Ok(id),
            _ => {
                warn!(auth_user = %user.user_id, body_user = raw, "Chat user id mismatch");
                Err(ApiError::unauthorized())
            }
        },
        (None, Some(raw)) => UserId::parse(raw).map_err(|_| ApiError::unauthorized()),
        (None, None) => Err(ApiError::unauthorized()),
    }
}

pub async fn enhanced_chat(
    deps: &ServerDeps,
    auth: Option<&AuthUser>,
    request: EnhancedChatRequest,
    ip_address: Option<String>,
) -> ApiResult<EnhancedChatResponse> {
    let started = Instant::now();

    let user_id = resolve_chat_user(auth, request.user_id.as_deref())?;

    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::bad_request("Vui lòng nhập câu hỏi"));
    }

    if deps.users.active_ban(user_id).await?.is_some() {
        record_suspicious(
            deps.activity.as_ref(),
            NewSuspiciousActivity::banned_user_access(user_id, ip_address),
        )
        .await;
        return Err(ApiError::forbidden(
            "Tài khoản của bạn đã bị khóa, không thể sử dụng chatbot",
        ));
    }

    let analysis = classify(&query, &request.messages);
    info!(
        %user_id,
        kind = %analysis.kind,
        wants_sources = analysis.wants_sources,
        "Chat query classified"
    );

    let response = answer(deps, user_id, &query, &request, &analysis).await?;
    let elapsed_ms = started.elapsed().as_millis() as i64;

    info!(
        %user_id,
        search_method = %response.search_method,
        total_sources = response.total_sources,
        elapsed_ms,
        "Chat query answered"
    );

    record_query(deps, user_id, &query, &response, elapsed_ms).await;
    record_activity(
        deps.activity.as_ref(),
        NewUserActivity::new(user_id, ActivityType::ChatQuery)
            .with_details(json!({
                "query": query,
                "search_method": response.search_method,
                "total_sources": response.total_sources,
            }))
            .with_ip(ip_address),
    )
    .await;
    persist_turns(deps, user_id, request.session_id.as_deref(), &query, &response).await;

    Ok(response)
}

async fn answer(
    deps: &ServerDeps,
    user_id: UserId,
    query: &str,
    request: &EnhancedChatRequest,
    analysis: &QueryAnalysis,
) -> ApiResult<EnhancedChatResponse> {
    if analysis.is_greeting() {
        return Ok(EnhancedChatResponse::text(
            responder::GREETING_RESPONSE,
            SearchMethod::Greeting,
        ));
    }

    if let Some(webhook) = &deps.chat_webhook {
        let webhook_request = build_webhook_request(user_id, query, request, analysis);
        match webhook.ask(&webhook_request).await {
            Ok(reply) if !reply.answer.trim().is_empty() => {
                return Ok(from_webhook_reply(reply));
            }
            Ok(_) => warn!("Chat webhook returned an empty answer, using local search"),
            Err(e) => warn!(error = %e, "Chat webhook failed, using local search"),
        }
    }

    if analysis.is_follow_up() && analysis.wants_summary {
        let previous = request
            .messages
            .iter()
            .rev()
            .find(|turn| turn.role == "assistant" && !turn.content.trim().is_empty());
        if let Some(previous) = previous {
            return Ok(EnhancedChatResponse::text(
                responder::follow_up_summary(&previous.content),
                SearchMethod::FollowUpSummary,
            ));
        }
    }

    let results = local_search(deps.laws.as_ref(), query, analysis, &request.messages).await?;

    if results.is_empty() {
        return Ok(if analysis.is_legal_related {
            EnhancedChatResponse::text(responder::NO_RESULTS_RESPONSE, SearchMethod::NoResults)
        } else {
            EnhancedChatResponse::text(responder::OUT_OF_SCOPE_RESPONSE, SearchMethod::OutOfScope)
        });
    }

    let keywords = extract_keywords(query, &request.messages, analysis.is_follow_up());
    let mut text = responder::local_search_response(query, &results, &keywords);
    if analysis.wants_sources {
        text = responder::append_source_links(text, &results);
    }

    let sources = results.iter().map(responder::source_entry).collect();
    let matched_ids = results.iter().map(|r| r.law.id).collect();
    Ok(EnhancedChatResponse::text(text, SearchMethod::LocalSearch).with_sources(sources, matched_ids))
}

fn build_webhook_request(
    user_id: UserId,
    query: &str,
    request: &EnhancedChatRequest,
    analysis: &QueryAnalysis,
) -> WebhookRequest {
    let skip = request.messages.len().saturating_sub(WEBHOOK_HISTORY_TURNS);
    WebhookRequest {
        chat_input: query.to_string(),
        query: query.to_string(),
        session_id: request.session_id.clone(),
        user_id: user_id.to_string(),
        history: request.messages[skip..].to_vec(),
        uploaded_files: request.uploaded_files.clone(),
        context: WebhookContext {
            is_follow_up: analysis.is_follow_up(),
            is_legal_related: analysis.is_legal_related,
            wants_sources: analysis.wants_sources,
            document_numbers: analysis.document_numbers.clone(),
        },
    }
}

fn from_webhook_reply(reply: WebhookReply) -> EnhancedChatResponse {
    let matched_ids = reply
        .sources
        .iter()
        .filter_map(|source| source.get("id").and_then(Value::as_str))
        .filter_map(|id| LawId::parse(id).ok())
        .collect();
    EnhancedChatResponse::text(reply.answer, SearchMethod::N8nWebhook)
        .with_sources(reply.sources, matched_ids)
}

async fn record_query(
    deps: &ServerDeps,
    user_id: UserId,
    query: &str,
    response: &EnhancedChatResponse,
    elapsed_ms: i64,
) {
    let entry = NewQueryLog {
        user_id,
        query: query.to_string(),
        search_method: response.search_method.to_string(),
        matched_ids: response.matched_ids.clone(),
        total_sources: response.total_sources as i32,
        response_time_ms: elapsed_ms,
    };
    if let Err(e) = deps.chats.log_query(entry).await {
        warn!(error = %e, %user_id, "Failed to write query log");
    }
}

/// Append both turns when the session exists and belongs to the user
async fn persist_turns(
    deps: &ServerDeps,
    user_id: UserId,
    session_id: Option<&str>,
    query: &str,
    response: &EnhancedChatResponse,
) {
    let Some(session_id) = session_id.and_then(|raw| SessionId::parse(raw).ok()) else {
        return;
    };

    match deps.chats.find_session(session_id).await {
        Ok(Some(session)) if session.is_owned_by(user_id) => {}
        Ok(_) => {
            warn!(%session_id, %user_id, "Chat session not found for user, turns not saved");
            return;
        }
        Err(e) => {
            warn!(error = %e, %session_id, "Failed to load chat session");
            return;
        }
    }

    let metadata = json!({
        "search_method": response.search_method,
        "sources": response.sources,
        "matched_ids": response.matched_ids,
    });
    let turns = [
        NewChatMessage::user(session_id, query),
        NewChatMessage::assistant(session_id, response.response.clone(), Some(metadata)),
    ];
    for turn in turns {
        if let Err(e) = deps.chats.append_message(turn).await {
            warn!(error = %e, %session_id, "Failed to save chat message");
            return;
        }
    }
}
