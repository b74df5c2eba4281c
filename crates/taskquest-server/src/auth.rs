use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::routes::AppState;

/// Pull the token out of an `Authorization: Bearer <token>` header value.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unauthorized(msg: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response()
}

/// Axum middleware that resolves the bearer token into a `Session` and
/// stores it in the request extensions for handlers to pick up.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(t) => t.to_string(),
        None => return unauthorized("missing bearer token"),
    };

    match state.service.authenticate(&token).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(taskquest_service::ServiceError::Unauthorized(msg)) => unauthorized(&msg),
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.message() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::test_helpers::{test_router, test_router_with_session};

    #[tokio::test]
    async fn auth_middleware_valid_bearer() {
        let (app, session) = test_router_with_session().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/tasks")
                    .header("Authorization", format!("Bearer {}", session.access_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn auth_middleware_invalid_bearer() {
        let (app, _session) = test_router_with_session().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/tasks")
                    .header("Authorization", "Bearer tq_wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_middleware_missing_header() {
        let app = test_router().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_health_endpoint_no_auth_required() {
        let app = test_router().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sign_in_endpoint_is_public() {
        let app = test_router().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/signin")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"email":"nobody@example.com","password":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        // Reaches the handler: bad credentials, not a missing token.
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
