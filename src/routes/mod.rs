use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{
        CatalogStore, HistoryLedger, RecommendationPipeline, RecommendationSink, UserStore,
    },
};

pub mod catalog;
pub mod recommendations;
pub mod users;

/// Shared handler state; every collaborator is injected at startup
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RecommendationPipeline>,
    pub catalog: Arc<dyn CatalogStore>,
    pub users: Arc<dyn UserStore>,
    pub ledger: Arc<dyn HistoryLedger>,
    pub audit: Arc<dyn RecommendationSink>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations", post(recommendations::recommend))
        .route("/recommendations/:user_id", get(recommendations::stored))
        .route("/catalog/categories", get(catalog::categories))
        .route("/catalog/search", get(catalog::search))
        .route("/catalog/:category", get(catalog::browse))
        .route("/users", post(users::create_user))
        .route("/users/:user_id", get(users::get_user))
        .route(
            "/users/:user_id/history",
            get(users::get_history).post(users::add_history),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
