use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{Category, HistoryEntry, RankedResult, StoredRecommendation, UserProfile},
    services::history::{HistoryLedger, RecommendationSink, UserStore},
};

/// Creates a PostgreSQL connection pool and applies pending migrations
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

fn parse_category(raw: &str) -> AppResult<Category> {
    raw.parse::<Category>()
        .map_err(|e| AppError::Internal(format!("Corrupt category in database: {}", e)))
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    user_id: String,
    content_id: String,
    category: String,
    title: String,
    rating: Option<f64>,
    notes: Option<String>,
    consumed_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = AppError;

    fn try_from(row: HistoryRow) -> AppResult<Self> {
        Ok(HistoryEntry {
            category: parse_category(&row.category)?,
            user_id: row.user_id,
            content_id: row.content_id,
            title: row.title,
            rating: row.rating,
            notes: row.notes,
            consumed_at: row.consumed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    preferences: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            user_id: row.user_id,
            preferences: row.preferences,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecommendationRow {
    user_id: String,
    batch_id: String,
    content_id: String,
    category: String,
    title: String,
    explanation: String,
    rank: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<RecommendationRow> for StoredRecommendation {
    type Error = AppError;

    fn try_from(row: RecommendationRow) -> AppResult<Self> {
        Ok(StoredRecommendation {
            category: parse_category(&row.category)?,
            user_id: row.user_id,
            batch_id: row.batch_id,
            content_id: row.content_id,
            title: row.title,
            explanation: row.explanation,
            rank: row.rank.max(0) as u32,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed user registry, history ledger and recommendation sink
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryLedger for PgStore {
    async fn consumed_ids(&self, user_id: &str) -> AppResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT content_id FROM content_history WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn record(&self, entry: HistoryEntry) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO content_history
                (user_id, content_id, category, title, rating, notes, consumed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, content_id) DO NOTHING
            "#,
        )
        .bind(&entry.user_id)
        .bind(&entry.content_id)
        .bind(entry.category.as_str())
        .bind(&entry.title)
        .bind(entry.rating)
        .bind(&entry.notes)
        .bind(entry.consumed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(
                user_id = %entry.user_id,
                content_id = %entry.content_id,
                "History entry already recorded"
            );
        }

        Ok(())
    }

    async fn history(
        &self,
        user_id: &str,
        category: Option<Category>,
    ) -> AppResult<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT user_id, content_id, category, title, rating, notes, consumed_at
            FROM content_history
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY consumed_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryEntry::try_from).collect()
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn upsert_user(
        &self,
        user_id: &str,
        preferences: serde_json::Value,
    ) -> AppResult<UserProfile> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (user_id, preferences)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET preferences = EXCLUDED.preferences, updated_at = NOW()
            RETURNING user_id, preferences, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(preferences)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_user(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT user_id, preferences, created_at, updated_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserProfile::from))
    }

    async fn ensure_user(&self, user_id: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecommendationSink for PgStore {
    async fn save_batch(&self, user_id: &str, result: &RankedResult) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for rec in &result.recommendations {
            sqlx::query(
                r#"
                INSERT INTO recommendations
                    (user_id, batch_id, content_id, category, title, explanation, rank)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(user_id)
            .bind(&result.batch_id)
            .bind(&rec.content_id)
            .bind(rec.category.as_str())
            .bind(&rec.title)
            .bind(&rec.explanation)
            .bind(rec.rank as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn recommendations(
        &self,
        user_id: &str,
        batch_id: Option<String>,
    ) -> AppResult<Vec<StoredRecommendation>> {
        let rows: Vec<RecommendationRow> = sqlx::query_as(
            r#"
            SELECT r.user_id, r.batch_id, r.content_id, r.category, r.title, r.explanation,
                   r.rank, r.created_at
            FROM recommendations r
            JOIN (
                SELECT batch_id, MAX(id) AS last_id
                FROM recommendations
                WHERE user_id = $1
                GROUP BY batch_id
            ) b ON b.batch_id = r.batch_id
            WHERE r.user_id = $1 AND ($2::TEXT IS NULL OR r.batch_id = $2)
            ORDER BY b.last_id DESC, r.rank ASC
            "#,
        )
        .bind(user_id)
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredRecommendation::try_from).collect()
    }
}
