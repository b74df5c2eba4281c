// Backend-agnostic integration tests for the Database trait.
//
// Each public async function accepts `&dyn Database` so the same assertions
// can run against any backend.

use chrono::{Duration, Utc};

use taskquest_core::task::{CreateTask, Difficulty, TaskFilter, TaskType, UpdateTask};
use taskquest_core::user::User;
use taskquest_db::{Database, DbError, NewUser};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub async fn make_user(db: &dyn Database, email: &str) -> User {
    db.create_user(&NewUser {
        email: email.to_string(),
        password_hash: "salt$hash".to_string(),
        username: "hero".to_string(),
    })
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Users and sessions
// ---------------------------------------------------------------------------

pub async fn test_user_lifecycle(db: &dyn Database) {
    let user = make_user(db, "ada@example.com").await;

    let creds = db.find_user_by_email("ada@example.com").await.unwrap().unwrap();
    assert_eq!(creds.user, user);
    assert_eq!(creds.password_hash, "salt$hash");
    assert!(db.find_user_by_email("nobody@example.com").await.unwrap().is_none());

    let profile = db.get_profile(&user.id).await.unwrap();
    assert_eq!(profile.username, "hero");

    let dup = db
        .create_user(&NewUser {
            email: "ada@example.com".into(),
            password_hash: "x$y".into(),
            username: "other".into(),
        })
        .await;
    assert!(matches!(dup, Err(DbError::Conflict(_))));
}

pub async fn test_session_lifecycle(db: &dyn Database) {
    let user = make_user(db, "ada@example.com").await;
    let now = Utc::now();

    db.create_session(&user.id, "live", now + Duration::days(1))
        .await
        .unwrap();
    db.create_session(&user.id, "stale", now - Duration::seconds(1))
        .await
        .unwrap();

    let found = db.find_session("live", now).await.unwrap().unwrap();
    assert_eq!(found.user.id, user.id);
    assert!(db.find_session("stale", now).await.unwrap().is_none());

    assert_eq!(db.purge_expired_sessions(now).await.unwrap(), 1);

    db.delete_session("live").await.unwrap();
    assert!(db.find_session("live", now).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub async fn test_task_crud(db: &dyn Database) {
    let user = make_user(db, "ada@example.com").await;

    let task = db
        .create_task(
            &user.id,
            &CreateTask::normal("Write report", None).with_difficulty(Difficulty::Medium),
        )
        .await
        .unwrap();
    assert_eq!(task.ap_reward, 2);
    assert_eq!(task.user_id, user.id);

    let fetched = db.get_task(&user.id, &task.id).await.unwrap();
    assert_eq!(fetched.id, task.id);

    let updated = db
        .update_task(
            &user.id,
            &task.id,
            &UpdateTask {
                description: Some(Some("quarterly".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("quarterly"));
    // unchanged fields preserved
    assert_eq!(updated.title, "Write report");

    db.delete_task(&user.id, &task.id).await.unwrap();
    assert!(db
        .list_tasks(&user.id, &TaskFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(db.get_task(&user.id, &task.id).await.is_err());
}

pub async fn test_task_filtering(db: &dyn Database) {
    let user = make_user(db, "ada@example.com").await;
    let daily = db
        .create_task(&user.id, &CreateTask::recurring("Stretch"))
        .await
        .unwrap();
    db.create_task(&user.id, &CreateTask::normal("Taxes", None))
        .await
        .unwrap();
    db.toggle_task(&user.id, &daily.id).await.unwrap();

    let done = db
        .list_tasks(
            &user.id,
            &TaskFilter {
                is_complete: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, daily.id);

    let normal = db
        .list_tasks(
            &user.id,
            &TaskFilter {
                task_type: Some(TaskType::Normal),
                is_complete: Some(false),
                limit: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(normal.len(), 1);
    assert_eq!(normal[0].title, "Taxes");
}

// ---------------------------------------------------------------------------
// Stats and action points
// ---------------------------------------------------------------------------

pub async fn test_action_points(db: &dyn Database) {
    let user = make_user(db, "ada@example.com").await;
    assert!(matches!(
        db.get_stats(&user.id).await,
        Err(DbError::NotFound(_))
    ));
    let stats = db.create_stats(&user.id).await.unwrap();
    assert_eq!(stats.action_points, 0);

    let hard = db
        .create_task(
            &user.id,
            &CreateTask::normal("Boss fight", None).with_difficulty(Difficulty::Hard),
        )
        .await
        .unwrap();
    let easy = db
        .create_task(&user.id, &CreateTask::recurring("Water plants"))
        .await
        .unwrap();

    assert_eq!(db.toggle_task(&user.id, &hard.id).await.unwrap().action_points, 3);
    assert_eq!(db.toggle_task(&user.id, &easy.id).await.unwrap().action_points, 4);
    assert_eq!(db.get_stats(&user.id).await.unwrap().action_points, 4);

    let undone = db.toggle_task(&user.id, &hard.id).await.unwrap();
    assert_eq!(undone.ap_delta, -3);
    assert_eq!(undone.action_points, 1);
}

pub async fn test_daily_reset(db: &dyn Database) {
    let user = make_user(db, "ada@example.com").await;
    let task = db
        .create_task(&user.id, &CreateTask::recurring("Meditate"))
        .await
        .unwrap();
    db.toggle_task(&user.id, &task.id).await.unwrap();

    // Completed just now: a cutoff in the past leaves it alone.
    let reset = db
        .reset_recurring_tasks(&user.id, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(reset, 0);

    let reset = db
        .reset_recurring_tasks(&user.id, Utc::now() + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(reset, 1);
    let task = db.get_task(&user.id, &task.id).await.unwrap();
    assert!(!task.is_complete);
    assert_eq!(db.get_stats(&user.id).await.unwrap().action_points, 1);
}
