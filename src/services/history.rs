use std::collections::HashSet;

use crate::{
    error::AppResult,
    models::{Category, HistoryEntry, RankedResult, StoredRecommendation, UserProfile},
};

/// Per-user record of consumed content
///
/// Implementations are keyed by `user_id` only; there is no cross-user state.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HistoryLedger: Send + Sync {
    /// IDs of everything the user has consumed; empty for unknown users
    async fn consumed_ids(&self, user_id: &str) -> AppResult<HashSet<String>>;

    /// Appends an entry. Recording the same `(user_id, content_id)` twice is a no-op.
    async fn record(&self, entry: HistoryEntry) -> AppResult<()>;

    /// Entries newest first, optionally restricted to one category
    async fn history(
        &self,
        user_id: &str,
        category: Option<Category>,
    ) -> AppResult<Vec<HistoryEntry>>;
}

/// Authentication-free user registry
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the user or replaces its preferences
    async fn upsert_user(
        &self,
        user_id: &str,
        preferences: serde_json::Value,
    ) -> AppResult<UserProfile>;

    async fn get_user(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    /// Creates the user with empty preferences if it does not exist yet
    async fn ensure_user(&self, user_id: &str) -> AppResult<()> {
        if self.get_user(user_id).await?.is_none() {
            self.upsert_user(user_id, serde_json::json!({})).await?;
        }
        Ok(())
    }
}

/// Audit trail of served recommendation batches
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationSink: Send + Sync {
    async fn save_batch(&self, user_id: &str, result: &RankedResult) -> AppResult<()>;

    /// Stored rows, rank order within a batch, newest batch first
    async fn recommendations(
        &self,
        user_id: &str,
        batch_id: Option<String>,
    ) -> AppResult<Vec<StoredRecommendation>>;
}

/// Records a history entry, creating the user on first use
pub async fn add_to_history(
    users: &dyn UserStore,
    ledger: &dyn HistoryLedger,
    entry: HistoryEntry,
) -> AppResult<()> {
    users.ensure_user(&entry.user_id).await?;

    tracing::info!(
        user_id = %entry.user_id,
        content_id = %entry.content_id,
        category = %entry.category,
        "Recording consumed content"
    );

    ledger.record(entry).await
}
