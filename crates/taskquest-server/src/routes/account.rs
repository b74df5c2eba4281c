use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use taskquest_core::user::{Credentials, Session, SignUp};
use taskquest_service::QuestService;

use super::{to_error, ApiError, AppState, JsonBody};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signin", post(sign_in))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signout", post(sign_out))
        .route("/api/auth/user", get(current_user))
}

async fn sign_up(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<SignUp>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .service
        .sign_up(&form)
        .await
        .map(|s| (StatusCode::CREATED, Json(json!(s))))
        .map_err(to_error)
}

async fn sign_in(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .sign_in(&credentials)
        .await
        .map(|s| Json(json!(s)))
        .map_err(to_error)
}

async fn sign_out(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .sign_out(&session)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(to_error)
}

async fn current_user(Extension(session): Extension<Session>) -> Json<Value> {
    Json(json!(session.user))
}
