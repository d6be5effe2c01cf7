use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;
use crate::error::{AppError, AppResult};

/// One item a user has marked as consumed
///
/// Entries are append-only; the ledger never rewrites them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub user_id: String,
    pub content_id: String,
    pub category: Category,
    pub title: String,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub consumed_at: DateTime<Utc>,
}

/// Body of `POST /users/:user_id/history`
#[derive(Debug, Clone, Deserialize)]
pub struct NewHistoryEntry {
    pub content_id: String,
    pub category: Category,
    pub title: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewHistoryEntry {
    /// Validates the payload and stamps it for `user_id`
    pub fn into_entry(self, user_id: &str) -> AppResult<HistoryEntry> {
        if user_id.trim().is_empty() {
            return Err(AppError::InvalidRequest("user_id cannot be empty".to_string()));
        }
        if self.content_id.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "content_id cannot be empty".to_string(),
            ));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=10.0).contains(&rating) {
                return Err(AppError::InvalidRequest(format!(
                    "rating must be between 0 and 10, got {}",
                    rating
                )));
            }
        }

        Ok(HistoryEntry {
            user_id: user_id.to_string(),
            content_id: self.content_id,
            category: self.category,
            title: self.title,
            rating: self.rating,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            consumed_at: Utc::now(),
        })
    }
}

/// Registered user with free-form preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub preferences: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub user_id: String,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
}

/// Audit row written for every recommendation in a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecommendation {
    pub user_id: String,
    pub batch_id: String,
    pub content_id: String,
    pub category: Category,
    pub title: String,
    pub explanation: String,
    pub rank: u32,
    pub created_at: DateTime<Utc>,
}
