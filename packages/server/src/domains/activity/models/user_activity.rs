use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::UserId;

/// Kinds of user actions written to `user_activities`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Login,
    Register,
    ChatQuery,
    SessionDelete,
    LawUpload,
    LawDelete,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::Login => write!(f, "login"),
            ActivityType::Register => write!(f, "register"),
            ActivityType::ChatQuery => write!(f, "chat_query"),
            ActivityType::SessionDelete => write!(f, "session_delete"),
            ActivityType::LawUpload => write!(f, "law_upload"),
            ActivityType::LawDelete => write!(f, "law_delete"),
        }
    }
}

/// Row to insert into `user_activities`
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserActivity {
    pub user_id: UserId,
    pub activity_type: ActivityType,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
}

impl NewUserActivity {
    pub fn new(user_id: UserId, activity_type: ActivityType) -> Self {
        Self {
            user_id,
            activity_type,
            details: serde_json::json!({}),
            ip_address: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_activities (user_id, activity_type, details, ip_address)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(self.user_id)
        .bind(self.activity_type.to_string())
        .bind(&self.details)
        .bind(&self.ip_address)
        .execute(pool)
        .await?;
        Ok(())
    }
}
