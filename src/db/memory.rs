use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{Category, HistoryEntry, RankedResult, StoredRecommendation, UserProfile},
    services::history::{HistoryLedger, RecommendationSink, UserStore},
};

/// Recommendation batches kept per user before the oldest is dropped
pub const MAX_STORED_BATCHES: usize = 100;

/// One persisted batch, rows in rank order
struct StoredBatch {
    batch_id: String,
    rows: Vec<StoredRecommendation>,
}

/// Process-local store used when no database is configured
///
/// Implements the user registry, history ledger and recommendation sink.
/// Contents are lost on restart. Only the newest [`MAX_STORED_BATCHES`]
/// recommendation batches are kept per user.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserProfile>>,
    history: RwLock<HashMap<String, Vec<HistoryEntry>>>,
    recommendations: RwLock<HashMap<String, VecDeque<StoredBatch>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl HistoryLedger for MemoryStore {
    async fn consumed_ids(&self, user_id: &str) -> AppResult<HashSet<String>> {
        let history = self.history.read().await;
        Ok(history
            .get(user_id)
            .map(|entries| entries.iter().map(|e| e.content_id.clone()).collect())
            .unwrap_or_default())
    }

    async fn record(&self, entry: HistoryEntry) -> AppResult<()> {
        let mut history = self.history.write().await;
        let entries = history.entry(entry.user_id.clone()).or_default();

        if entries.iter().any(|e| e.content_id == entry.content_id) {
            tracing::debug!(
                user_id = %entry.user_id,
                content_id = %entry.content_id,
                "History entry already recorded"
            );
            return Ok(());
        }

        entries.push(entry);
        Ok(())
    }

    async fn history(
        &self,
        user_id: &str,
        category: Option<Category>,
    ) -> AppResult<Vec<HistoryEntry>> {
        let history = self.history.read().await;
        let mut entries: Vec<HistoryEntry> = history
            .get(user_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| category.map_or(true, |c| e.category == c))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Stored oldest first; stable sort keeps insertion order on equal timestamps
        entries.reverse();
        entries.sort_by(|a, b| b.consumed_at.cmp(&a.consumed_at));
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(
        &self,
        user_id: &str,
        preferences: serde_json::Value,
    ) -> AppResult<UserProfile> {
        let now = Utc::now();
        let mut users = self.users.write().await;

        let profile = users
            .entry(user_id.to_string())
            .and_modify(|profile| {
                profile.preferences = preferences.clone();
                profile.updated_at = now;
            })
            .or_insert_with(|| UserProfile {
                user_id: user_id.to_string(),
                preferences: preferences.clone(),
                created_at: now,
                updated_at: now,
            });

        Ok(profile.clone())
    }

    async fn get_user(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

#[async_trait::async_trait]
impl RecommendationSink for MemoryStore {
    async fn save_batch(&self, user_id: &str, result: &RankedResult) -> AppResult<()> {
        let created_at = Utc::now();
        let mut rows: Vec<StoredRecommendation> = result
            .recommendations
            .iter()
            .map(|rec| StoredRecommendation {
                user_id: user_id.to_string(),
                batch_id: result.batch_id.clone(),
                content_id: rec.content_id.clone(),
                category: rec.category,
                title: rec.title.clone(),
                explanation: rec.explanation.clone(),
                rank: rec.rank,
                created_at,
            })
            .collect();
        rows.sort_by_key(|r| r.rank);

        let mut stored = self.recommendations.write().await;
        let batches = stored.entry(user_id.to_string()).or_default();
        batches.push_back(StoredBatch {
            batch_id: result.batch_id.clone(),
            rows,
        });
        while batches.len() > MAX_STORED_BATCHES {
            batches.pop_front();
        }
        Ok(())
    }

    async fn recommendations(
        &self,
        user_id: &str,
        batch_id: Option<String>,
    ) -> AppResult<Vec<StoredRecommendation>> {
        let stored = self.recommendations.read().await;
        let Some(batches) = stored.get(user_id) else {
            return Ok(Vec::new());
        };

        // Newest batch first
        Ok(batches
            .iter()
            .rev()
            .filter(|batch| batch_id.as_deref().map_or(true, |wanted| wanted == batch.batch_id))
            .flat_map(|batch| batch.rows.iter().cloned())
            .collect())
    }
}
