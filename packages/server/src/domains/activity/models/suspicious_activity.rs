use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::UserId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Row to insert into `suspicious_activities`
#[derive(Debug, Clone, PartialEq)]
pub struct NewSuspiciousActivity {
    pub user_id: Option<UserId>,
    pub activity_type: String, // 'failed_login', 'banned_user_access'
    pub description: String,
    pub ip_address: Option<String>,
    pub severity: Severity,
}

impl NewSuspiciousActivity {
    pub fn failed_login(email: &str, ip_address: Option<String>) -> Self {
        Self {
            user_id: None,
            activity_type: "failed_login".to_string(),
            description: format!("Đăng nhập thất bại cho tài khoản {}", email),
            ip_address,
            severity: Severity::Low,
        }
    }

    pub fn banned_user_access(user_id: UserId, ip_address: Option<String>) -> Self {
        Self {
            user_id: Some(user_id),
            activity_type: "banned_user_access".to_string(),
            description: "Người dùng bị cấm cố gắng sử dụng chatbot".to_string(),
            ip_address,
            severity: Severity::Medium,
        }
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO suspicious_activities (user_id, activity_type, description, ip_address, severity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(self.user_id)
        .bind(&self.activity_type)
        .bind(&self.description)
        .bind(&self.ip_address)
        .bind(self.severity.to_string())
        .execute(pool)
        .await?;
        Ok(())
    }
}
