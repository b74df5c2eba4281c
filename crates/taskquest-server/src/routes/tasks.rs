use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use taskquest_core::task::{CreateTask, TaskFilter, TaskType, UpdateTask};
use taskquest_core::user::Session;
use taskquest_service::{QuestService, ServiceError};

use super::{to_error, ApiError, AppState, JsonBody, QueryParams};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/reset-daily", post(reset_daily))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/toggle", post(toggle_task))
}

#[derive(Debug, Deserialize)]
struct TaskQuery {
    task_type: Option<String>,
    is_complete: Option<bool>,
    limit: Option<i64>,
}

impl TaskQuery {
    fn into_filter(self) -> Result<TaskFilter, ServiceError> {
        let task_type = match self.task_type.as_deref() {
            None => None,
            Some(s) => Some(TaskType::parse_str(s).ok_or_else(|| {
                ServiceError::InvalidInput(format!("unknown task_type: {s}"))
            })?),
        };
        Ok(TaskFilter {
            task_type,
            is_complete: self.is_complete,
            limit: self.limit,
        })
    }
}

async fn list_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    QueryParams(q): QueryParams<TaskQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = q.into_filter().map_err(to_error)?;
    state
        .service
        .list_tasks(&session, &filter)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn get_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .get_task(&session, &id)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn create_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    JsonBody(input): JsonBody<CreateTask>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .service
        .create_task(&session, &input)
        .await
        .map(|t| (StatusCode::CREATED, Json(json!(t))))
        .map_err(to_error)
}

async fn update_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<UpdateTask>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .update_task(&session, &id, &input)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn delete_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete_task(&session, &id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(to_error)
}

async fn toggle_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .toggle_task(&session, &id)
        .await
        .map(|c| Json(json!(c)))
        .map_err(to_error)
}

async fn reset_daily(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .reset_daily_tasks(&session)
        .await
        .map(|reset| Json(json!({ "reset": reset })))
        .map_err(to_error)
}
