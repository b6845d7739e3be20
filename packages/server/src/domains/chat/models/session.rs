use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{SessionId, UserId};

/// Default title for sessions created without one
pub const DEFAULT_SESSION_TITLE: &str = "Cuộc trò chuyện mới";

/// Longest accepted session title, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// ChatSession - one conversation owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// Trimmed title, truncated to `MAX_TITLE_CHARS`; `None` when blank
pub fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_TITLE_CHARS).collect())
}

// =============================================================================
// SQL Queries
// =============================================================================

const SESSION_COLUMNS: &str = "id, user_id, title, created_at, updated_at";

impl ChatSession {
    /// Sessions for a user, most recently updated first
    pub async fn find_by_user(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let sessions = sqlx::query_as::<_, ChatSession>(&format!(
            "SELECT {} FROM chat_sessions WHERE user_id = $1 ORDER BY updated_at DESC",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(sessions)
    }

    pub async fn find_by_id(id: SessionId, pool: &PgPool) -> Result<Option<Self>> {
        let session = sqlx::query_as::<_, ChatSession>(&format!(
            "SELECT {} FROM chat_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(session)
    }

    pub async fn create(user_id: UserId, title: &str, pool: &PgPool) -> Result<Self> {
        let session = sqlx::query_as::<_, ChatSession>(&format!(
            r#"
            INSERT INTO chat_sessions (user_id, title)
            VALUES ($1, $2)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(title)
        .fetch_one(pool)
        .await?;
        Ok(session)
    }

    pub async fn rename(id: SessionId, title: &str, pool: &PgPool) -> Result<Option<Self>> {
        let session = sqlx::query_as::<_, ChatSession>(&format!(
            r#"
            UPDATE chat_sessions
            SET title = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(id)
        .bind(title)
        .fetch_optional(pool)
        .await?;
        Ok(session)
    }

    /// Bump `updated_at` so the session sorts first
    pub async fn touch(id: SessionId, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE chat_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Messages go with it via ON DELETE CASCADE
    pub async fn delete(id: SessionId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_title_trims_and_truncates() {
        assert_eq!(normalize_title("  Hỏi về thuế  ").as_deref(), Some("Hỏi về thuế"));
        assert_eq!(normalize_title(" \t "), None);

        let long = "đ".repeat(MAX_TITLE_CHARS + 5);
        assert_eq!(
            normalize_title(&long).map(|t| t.chars().count()),
            Some(MAX_TITLE_CHARS)
        );
    }
}
