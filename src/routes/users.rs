use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{Category, CreateUserRequest, HistoryEntry, NewHistoryEntry, UserProfile},
    services::history::add_to_history,
};

use super::AppState;

/// Handler for `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidRequest("user_id cannot be empty".to_string()));
    }

    let preferences = request
        .preferences
        .unwrap_or_else(|| serde_json::json!({}));
    let profile = state.users.upsert_user(user_id, preferences).await?;

    tracing::info!(user_id = %profile.user_id, "User saved");

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Handler for `GET /users/:user_id`
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    state
        .users
        .get_user(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", user_id)))
}

/// Handler for `POST /users/:user_id/history`
pub async fn add_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<NewHistoryEntry>,
) -> AppResult<(StatusCode, Json<HistoryEntry>)> {
    let entry = request.into_entry(&user_id)?;
    add_to_history(state.users.as_ref(), state.ledger.as_ref(), entry.clone()).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    category: Option<String>,
}

/// Handler for `GET /users/:user_id/history`
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    let category = params
        .category
        .as_deref()
        .map(|raw| {
            Category::parse_lenient(raw)
                .ok_or_else(|| AppError::InvalidRequest(format!("Unknown category '{}'", raw)))
        })
        .transpose()?;

    let entries = state.ledger.history(&user_id, category).await?;
    Ok(Json(entries))
}
