use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{RecommendationRequest, RecommendationResponse, StoredRecommendation},
};

use super::AppState;

/// Handler for `POST /recommendations`
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let user_id = request.user_id.trim().to_string();
    let result = state.pipeline.resolve(request).await?;

    Ok(Json(RecommendationResponse {
        user_id,
        batch_id: result.batch_id,
        count: result.recommendations.len(),
        recommendations: result.recommendations,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StoredQuery {
    batch_id: Option<String>,
}

/// Handler for `GET /recommendations/:user_id`
pub async fn stored(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<StoredQuery>,
) -> AppResult<Json<Vec<StoredRecommendation>>> {
    let rows = state.audit.recommendations(&user_id, params.batch_id).await?;
    Ok(Json(rows))
}
