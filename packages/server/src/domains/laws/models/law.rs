use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{LawId, UserId};

/// Law - one legal document (metadata + full text)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Law {
    pub id: LawId,
    pub title: String,
    pub so_hieu: Option<String>, // document number, e.g. "25/2017/QĐ-UBND"
    pub document_type: Option<String>,
    pub issuing_body: Option<String>,
    pub issued_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub signer: Option<String>,
    pub content: Option<String>,
    pub file_name: Option<String>,
    pub status: String, // 'active', 'expired', 'draft'
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Law without its full text, for listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LawSummary {
    pub id: LawId,
    pub title: String,
    pub so_hieu: Option<String>,
    pub document_type: Option<String>,
    pub issuing_body: Option<String>,
    pub issued_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Law> for LawSummary {
    fn from(law: &Law) -> Self {
        Self {
            id: law.id,
            title: law.title.clone(),
            so_hieu: law.so_hieu.clone(),
            document_type: law.document_type.clone(),
            issuing_body: law.issuing_body.clone(),
            issued_date: law.issued_date,
            effective_date: law.effective_date,
            status: law.status.clone(),
            created_at: law.created_at,
        }
    }
}

/// Fields for a new `laws` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLaw {
    pub title: String,
    pub so_hieu: Option<String>,
    pub document_type: Option<String>,
    pub issuing_body: Option<String>,
    pub issued_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub signer: Option<String>,
    pub content: String,
    pub file_name: Option<String>,
    pub created_by: Option<UserId>,
}

/// Listing filter for the admin dashboard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LawFilter {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl LawFilter {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    /// 1-based page number
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    /// Trimmed search term, `None` when blank
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One page of law summaries
#[derive(Debug, Clone, Serialize)]
pub struct LawPage {
    pub items: Vec<LawSummary>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Escape LIKE metacharacters and wrap in `%...%`
pub fn ilike_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// =============================================================================
// SQL Queries
// =============================================================================

const LAW_COLUMNS: &str = "id, title, so_hieu, document_type, issuing_body, issued_date, \
     effective_date, signer, content, file_name, status, created_by, created_at";

const SUMMARY_COLUMNS: &str = "id, title, so_hieu, document_type, issuing_body, issued_date, \
     effective_date, status, created_at";

impl Law {
    /// Find law by ID
    pub async fn find_by_id(id: LawId, pool: &PgPool) -> Result<Option<Self>> {
        let law = sqlx::query_as::<_, Law>(&format!(
            "SELECT {} FROM laws WHERE id = $1",
            LAW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(law)
    }

    /// OR-chained ILIKE over title and content
    pub async fn search_candidates(
        patterns: &[String],
        limit: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let laws = sqlx::query_as::<_, Law>(&format!(
            r#"
            SELECT {}
            FROM laws
            WHERE title ILIKE ANY($1) OR content ILIKE ANY($1)
            LIMIT $2
            "#,
            LAW_COLUMNS
        ))
        .bind(patterns)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(laws)
    }

    /// Insert a new law
    pub async fn create(law: &NewLaw, pool: &PgPool) -> Result<Self> {
        let created = sqlx::query_as::<_, Law>(&format!(
            r#"
            INSERT INTO laws (
                title, so_hieu, document_type, issuing_body, issued_date,
                effective_date, signer, content, file_name, status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active', $10)
            RETURNING {}
            "#,
            LAW_COLUMNS
        ))
        .bind(&law.title)
        .bind(&law.so_hieu)
        .bind(&law.document_type)
        .bind(&law.issuing_body)
        .bind(law.issued_date)
        .bind(law.effective_date)
        .bind(&law.signer)
        .bind(&law.content)
        .bind(&law.file_name)
        .bind(law.created_by)
        .fetch_one(pool)
        .await?;
        Ok(created)
    }

    /// Paginated listing, newest first, optionally filtered by title/số hiệu
    pub async fn list(filter: &LawFilter, pool: &PgPool) -> Result<LawPage> {
        let pattern = filter.search_term().map(ilike_pattern);

        let items = sqlx::query_as::<_, LawSummary>(&format!(
            r#"
            SELECT {}
            FROM laws
            WHERE ($1::text IS NULL OR title ILIKE $1 OR so_hieu ILIKE $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            SUMMARY_COLUMNS
        ))
        .bind(&pattern)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM laws
            WHERE ($1::text IS NULL OR title ILIKE $1 OR so_hieu ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        Ok(LawPage {
            items,
            total,
            page: filter.page(),
            limit: filter.limit(),
        })
    }

    /// Delete law by ID
    pub async fn delete(id: LawId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM laws WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
