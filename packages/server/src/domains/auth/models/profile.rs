use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::UserId;

/// Profile - application-side user record keyed by the Supabase Auth user id
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: String, // 'user', 'editor', 'admin'
    pub created_at: DateTime<Utc>,
}

/// Role enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Editor,
    Admin,
}

impl Role {
    /// Editors and admins manage the law library.
    pub fn can_manage_laws(&self) -> bool {
        matches!(self, Role::Editor | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Editor => write!(f, "editor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

impl Profile {
    /// Parsed role; unknown values degrade to `Role::User`.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }
}

// =============================================================================
// SQL Queries
// =============================================================================

impl Profile {
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, role, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(profile)
    }
}
