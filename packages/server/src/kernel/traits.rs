// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Classification, ranking and response assembly live in domains/chat and use
// these traits to reach Supabase and n8n.
//
// Naming convention: Base* for trait names (e.g., BaseLawStore, BaseChatWebhook)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::{LawId, SessionId, UserId};
use crate::domains::activity::{NewSuspiciousActivity, NewUserActivity};
use crate::domains::auth::{AuthUser, BannedUser, Profile};
use crate::domains::chat::models::{ChatMessage, ChatSession, NewChatMessage, NewQueryLog};
use crate::domains::laws::models::{Law, LawFilter, LawPage, NewLaw};

// =============================================================================
// Chat Webhook Trait (Infrastructure - n8n workflow)
// =============================================================================

/// One prior turn forwarded to the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// A file the user attached in the chat UI (already converted to text client-side)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    #[serde(default, alias = "text")]
    pub content: Option<String>,
    #[serde(default, alias = "type")]
    pub mime_type: Option<String>,
}

/// Classifier output passed to the workflow so it can shape the answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookContext {
    pub is_follow_up: bool,
    pub is_legal_related: bool,
    pub wants_sources: bool,
    pub document_numbers: Vec<String>,
}

/// Payload POSTed to the n8n chat webhook
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub chat_input: String,
    pub query: String,
    pub session_id: Option<String>,
    pub user_id: String,
    pub history: Vec<HistoryTurn>,
    pub uploaded_files: Vec<UploadedFile>,
    pub context: WebhookContext,
}

/// Answer relayed from the workflow
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookReply {
    pub answer: String,
    pub sources: Vec<serde_json::Value>,
}

#[async_trait]
pub trait BaseChatWebhook: Send + Sync {
    /// Forward a question to the workflow and return its answer.
    /// A reply with an empty answer is an error.
    async fn ask(&self, request: &WebhookRequest) -> Result<WebhookReply>;
}

// =============================================================================
// Law Store Trait (Infrastructure - `laws` table)
// =============================================================================

#[async_trait]
pub trait BaseLawStore: Send + Sync {
    /// Rows whose title or content matches any ILIKE pattern, capped at `limit`
    async fn search_candidates(&self, patterns: &[String], limit: i64) -> Result<Vec<Law>>;

    async fn find_by_id(&self, id: LawId) -> Result<Option<Law>>;

    async fn create(&self, law: NewLaw) -> Result<Law>;

    async fn list(&self, filter: &LawFilter) -> Result<LawPage>;

    /// Returns false when no row was deleted
    async fn delete(&self, id: LawId) -> Result<bool>;
}

// =============================================================================
// Chat Store Trait (Infrastructure - sessions, messages, query logs)
// =============================================================================

#[async_trait]
pub trait BaseChatStore: Send + Sync {
    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<ChatSession>>;

    async fn create_session(&self, user_id: UserId, title: &str) -> Result<ChatSession>;

    async fn find_session(&self, id: SessionId) -> Result<Option<ChatSession>>;

    async fn rename_session(&self, id: SessionId, title: &str) -> Result<Option<ChatSession>>;

    /// Deleting a session removes its messages (ON DELETE CASCADE)
    async fn delete_session(&self, id: SessionId) -> Result<bool>;

    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<ChatMessage>>;

    async fn append_message(&self, message: NewChatMessage) -> Result<ChatMessage>;

    async fn log_query(&self, entry: NewQueryLog) -> Result<()>;
}

// =============================================================================
// User Directory Trait (Infrastructure - profiles, bans)
// =============================================================================

#[async_trait]
pub trait BaseUserDirectory: Send + Sync {
    async fn find_profile(&self, user_id: UserId) -> Result<Option<Profile>>;

    async fn active_ban(&self, user_id: UserId) -> Result<Option<BannedUser>>;
}

// =============================================================================
// Activity Log Trait (Infrastructure - audit tables)
// =============================================================================

#[async_trait]
pub trait BaseActivityLog: Send + Sync {
    async fn record_activity(&self, activity: NewUserActivity) -> Result<()>;

    async fn record_suspicious(&self, activity: NewSuspiciousActivity) -> Result<()>;
}

// =============================================================================
// Auth Service Trait (Infrastructure - Supabase Auth)
// =============================================================================

#[async_trait]
pub trait BaseAuthService: Send + Sync {
    /// Resolve the user behind an access token
    async fn verify_access_token(&self, token: &str) -> Result<AuthUser>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<supabase_client::Session>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<supabase_client::SignUpResponse>;

    async fn refresh(&self, refresh_token: &str) -> Result<supabase_client::Session>;
}
