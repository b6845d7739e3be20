use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{MessageId, SessionId};

/// ChatMessage - one turn in a session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: String, // 'user', 'assistant'
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Message role enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(anyhow::anyhow!("Invalid message role: {}", s)),
        }
    }
}

/// Fields for a new `chat_messages` row
#[derive(Debug, Clone, PartialEq)]
pub struct NewChatMessage {
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}

impl NewChatMessage {
    pub fn user(session_id: SessionId, content: impl Into<String>) -> Self {
        Self {
            session_id,
            role: MessageRole::User,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn assistant(
        session_id: SessionId,
        content: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            session_id,
            role: MessageRole::Assistant,
            content: content.into(),
            metadata,
        }
    }
}

// =============================================================================
// SQL Queries
// =============================================================================

const MESSAGE_COLUMNS: &str = "id, session_id, role, content, metadata, created_at";

impl ChatMessage {
    /// Messages of a session in chronological order
    pub async fn find_by_session(session_id: SessionId, pool: &PgPool) -> Result<Vec<Self>> {
        let messages = sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {} FROM chat_messages WHERE session_id = $1 ORDER BY created_at ASC",
            MESSAGE_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }

    pub async fn create(message: &NewChatMessage, pool: &PgPool) -> Result<Self> {
        let created = sqlx::query_as::<_, ChatMessage>(&format!(
            r#"
            INSERT INTO chat_messages (session_id, role, content, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.session_id)
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(&message.metadata)
        .fetch_one(pool)
        .await?;
        Ok(created)
    }
}
