use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use taskquest_core::user::Session;
use taskquest_service::QuestService;

use super::{to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile))
        .route("/api/stats", get(get_stats).post(create_stats))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .get_profile(&session)
        .await
        .map(|p| Json(json!(p)))
        .map_err(to_error)
}

async fn get_stats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .get_stats(&session)
        .await
        .map(|s| Json(json!(s)))
        .map_err(to_error)
}

async fn create_stats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .create_stats(&session)
        .await
        .map(|s| Json(json!(s)))
        .map_err(to_error)
}
