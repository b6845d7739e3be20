//! Server dependencies for routes and actions (using traits for testability)
//!
//! This module provides the central dependency container used by all domain actions.
//! All external services use trait abstractions to enable testing.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::common::{LawId, SessionId, UserId};
use crate::domains::activity::{NewSuspiciousActivity, NewUserActivity};
use crate::domains::auth::{BannedUser, Profile};
use crate::domains::chat::models::{ChatMessage, ChatSession, NewChatMessage, NewQueryLog};
use crate::domains::laws::models::{Law, LawFilter, LawPage, NewLaw};
use crate::kernel::{
    BaseActivityLog, BaseAuthService, BaseChatStore, BaseChatWebhook, BaseLawStore,
    BaseUserDirectory,
};

// =============================================================================
// Postgres Adapter (implements the store traits over the model queries)
// =============================================================================

/// Supabase Postgres behind the store traits
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseLawStore for PostgresStore {
    async fn search_candidates(&self, patterns: &[String], limit: i64) -> Result<Vec<Law>> {
        Law::search_candidates(patterns, limit, &self.pool).await
    }

    async fn find_by_id(&self, id: LawId) -> Result<Option<Law>> {
        Law::find_by_id(id, &self.pool).await
    }

    async fn create(&self, law: NewLaw) -> Result<Law> {
        Law::create(&law, &self.pool).await
    }

    async fn list(&self, filter: &LawFilter) -> Result<LawPage> {
        Law::list(filter, &self.pool).await
    }

    async fn delete(&self, id: LawId) -> Result<bool> {
        Law::delete(id, &self.pool).await
    }
}

#[async_trait]
impl BaseChatStore for PostgresStore {
    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<ChatSession>> {
        ChatSession::find_by_user(user_id, &self.pool).await
    }

    async fn create_session(&self, user_id: UserId, title: &str) -> Result<ChatSession> {
        ChatSession::create(user_id, title, &self.pool).await
    }

    async fn find_session(&self, id: SessionId) -> Result<Option<ChatSession>> {
        ChatSession::find_by_id(id, &self.pool).await
    }

    async fn rename_session(&self, id: SessionId, title: &str) -> Result<Option<ChatSession>> {
        ChatSession::rename(id, title, &self.pool).await
    }

    async fn delete_session(&self, id: SessionId) -> Result<bool> {
        ChatSession::delete(id, &self.pool).await
    }

    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<ChatMessage>> {
        ChatMessage::find_by_session(session_id, &self.pool).await
    }

    async fn append_message(&self, message: NewChatMessage) -> Result<ChatMessage> {
        let created = ChatMessage::create(&message, &self.pool).await?;
        ChatSession::touch(message.session_id, &self.pool).await?;
        Ok(created)
    }

    async fn log_query(&self, entry: NewQueryLog) -> Result<()> {
        entry.insert(&self.pool).await
    }
}

#[async_trait]
impl BaseUserDirectory for PostgresStore {
    async fn find_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        Profile::find_by_id(user_id, &self.pool).await
    }

    async fn active_ban(&self, user_id: UserId) -> Result<Option<BannedUser>> {
        BannedUser::find_active(user_id, &self.pool).await
    }
}

#[async_trait]
impl BaseActivityLog for PostgresStore {
    async fn record_activity(&self, activity: NewUserActivity) -> Result<()> {
        activity.insert(&self.pool).await
    }

    async fn record_suspicious(&self, activity: NewSuspiciousActivity) -> Result<()> {
        activity.insert(&self.pool).await
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to routes and actions (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub laws: Arc<dyn BaseLawStore>,
    pub chats: Arc<dyn BaseChatStore>,
    pub users: Arc<dyn BaseUserDirectory>,
    pub activity: Arc<dyn BaseActivityLog>,
    pub auth: Arc<dyn BaseAuthService>,
    /// n8n chat workflow (optional, local search answers alone without it)
    pub chat_webhook: Option<Arc<dyn BaseChatWebhook>>,
    /// Largest accepted law upload, in bytes
    pub max_upload_bytes: usize,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        laws: Arc<dyn BaseLawStore>,
        chats: Arc<dyn BaseChatStore>,
        users: Arc<dyn BaseUserDirectory>,
        activity: Arc<dyn BaseActivityLog>,
        auth: Arc<dyn BaseAuthService>,
        chat_webhook: Option<Arc<dyn BaseChatWebhook>>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            laws,
            chats,
            users,
            activity,
            auth,
            chat_webhook,
            max_upload_bytes,
        }
    }

    /// All stores backed by one Postgres pool
    pub fn with_postgres(
        pool: PgPool,
        auth: Arc<dyn BaseAuthService>,
        chat_webhook: Option<Arc<dyn BaseChatWebhook>>,
        max_upload_bytes: usize,
    ) -> Self {
        let store = Arc::new(PostgresStore::new(pool));
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            auth,
            chat_webhook,
            max_upload_bytes,
        )
    }
}
