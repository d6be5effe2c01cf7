use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{Category, ContentItem},
    services::catalog::search_titles,
};

use super::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 25;

#[derive(Debug, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: Category,
    pub label: String,
    pub items: usize,
}

/// Handler for `GET /catalog/categories`
pub async fn categories(State(state): State<AppState>) -> Json<Vec<CategorySummary>> {
    let summaries = Category::ALL
        .into_iter()
        .map(|category| CategorySummary {
            name: category,
            label: category.label().to_string(),
            items: state.catalog.items_by_category(category).len(),
        })
        .collect();

    Json(summaries)
}

/// Handler for `GET /catalog/:category`
pub async fn browse(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<Vec<ContentItem>>> {
    let category = Category::parse_lenient(&category)
        .ok_or_else(|| AppError::NotFound(format!("Unknown category '{}'", category)))?;

    Ok(Json(state.catalog.items_by_category(category).to_vec()))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    category: Option<String>,
    limit: Option<usize>,
}

/// Handler for `GET /catalog/search`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<ContentItem>>> {
    let category = params
        .category
        .as_deref()
        .map(|raw| {
            Category::parse_lenient(raw)
                .ok_or_else(|| AppError::InvalidRequest(format!("Unknown category '{}'", raw)))
        })
        .transpose()?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, state.pipeline.max_count());

    let items = search_titles(state.catalog.as_ref(), &params.q, category, limit)?;
    Ok(Json(items))
}
