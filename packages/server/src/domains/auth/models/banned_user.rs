use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::UserId;

/// BannedUser - a ban placed by an admin, permanent when `banned_until` is null
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BannedUser {
    pub user_id: UserId,
    pub reason: Option<String>,
    pub banned_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BannedUser {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.banned_until {
            None => true,
            Some(until) => until > now,
        }
    }
}

// =============================================================================
// SQL Queries
// =============================================================================

impl BannedUser {
    /// Most recent ban that is still in force
    pub async fn find_active(user_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let ban = sqlx::query_as::<_, BannedUser>(
            r#"
            SELECT user_id, reason, banned_until, created_at
            FROM banned_users
            WHERE user_id = $1
              AND (banned_until IS NULL OR banned_until > NOW())
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(ban)
    }
}
