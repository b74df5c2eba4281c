// Integration tests that exercise every Database trait method against the
// in-memory SQLite backend. The test logic lives in `common/mod.rs`.

mod common;

use std::sync::Arc;
use taskquest_db::Database;

async fn make_db() -> Arc<dyn Database> {
    Arc::new(taskquest_db::SqliteDatabase::open_in_memory().unwrap())
}

#[tokio::test]
async fn user_lifecycle() {
    let db = make_db().await;
    common::test_user_lifecycle(&*db).await;
}

#[tokio::test]
async fn session_lifecycle() {
    let db = make_db().await;
    common::test_session_lifecycle(&*db).await;
}

#[tokio::test]
async fn task_crud() {
    let db = make_db().await;
    common::test_task_crud(&*db).await;
}

#[tokio::test]
async fn task_filtering() {
    let db = make_db().await;
    common::test_task_filtering(&*db).await;
}

#[tokio::test]
async fn action_points() {
    let db = make_db().await;
    common::test_action_points(&*db).await;
}

#[tokio::test]
async fn daily_reset() {
    let db = make_db().await;
    common::test_daily_reset(&*db).await;
}

#[tokio::test]
async fn file_backed_db_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("quest.db");
    {
        let db = taskquest_db::SqliteDatabase::open_path(&path).unwrap();
        let user = common::make_user(&db, "ada@example.com").await;
        db.create_stats(&user.id).await.unwrap();
    }
    let db = taskquest_db::SqliteDatabase::open_path(&path).unwrap();
    let creds = db.find_user_by_email("ada@example.com").await.unwrap().unwrap();
    assert_eq!(db.get_stats(&creds.user.id).await.unwrap().level, 1);
}
