use anyhow::Result;
use serde::Serialize;
use sqlx::PgPool;

use crate::common::{LawId, UserId};

/// Row to insert into `query_logs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewQueryLog {
    pub user_id: UserId,
    pub query: String,
    pub search_method: String,
    pub matched_ids: Vec<LawId>,
    pub total_sources: i32,
    pub response_time_ms: i64,
}

impl NewQueryLog {
    pub async fn insert(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO query_logs (
                user_id, query, search_method, matched_ids, total_sources, response_time_ms
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(self.user_id)
        .bind(&self.query)
        .bind(&self.search_method)
        .bind(&self.matched_ids)
        .bind(self.total_sources)
        .bind(self.response_time_ms)
        .execute(pool)
        .await?;
        Ok(())
    }
}
