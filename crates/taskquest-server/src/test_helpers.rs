use std::sync::Arc;

use axum::Router;
use taskquest_core::user::{Session, SignUp};
use taskquest_service::{LocalService, QuestService};
use tokio::net::TcpListener;

use crate::routes::{build_router, InnerAppState};

fn test_service() -> LocalService {
    let db = Arc::new(taskquest_db::SqliteDatabase::open_in_memory().unwrap());
    LocalService::new(db)
}

/// Build a test router backed by in-memory SQLite.
pub async fn test_router() -> Router {
    build_router(Arc::new(InnerAppState {
        service: test_service(),
    }))
}

/// Build a test router with one registered user, returning (router, session).
pub async fn test_router_with_session() -> (Router, Session) {
    let service = test_service();
    let session = service
        .sign_up(&SignUp {
            email: "hero@example.com".into(),
            password: "hunter22".into(),
            username: "hero".into(),
        })
        .await
        .unwrap();
    let router = build_router(Arc::new(InnerAppState { service }));
    (router, session)
}

/// A running test server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn an axum test server on a random port. Returns the TestServer
/// with the `base_url` (e.g. "http://127.0.0.1:12345").
pub async fn spawn_test_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let app = test_router().await;
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base_url,
        _handle: handle,
    }
}
