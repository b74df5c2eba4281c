pub(crate) mod migrations;
pub mod queries;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use taskquest_core::stats::{Profile, UserStats};
use taskquest_core::task::{Completion, CreateTask, Task, TaskFilter, UpdateTask};
use taskquest_core::user::User;

use crate::{Database, DbConfig, DbError, NewUser, SessionRecord, UserCredentials};

/// Converts `rusqlite::Result<T>` into `Result<T, DbError>` so query code can
/// use `.to_db()?`.
pub(crate) trait SqliteResultExt<T> {
    fn to_db(self) -> Result<T, DbError>;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn to_db(self) -> Result<T, DbError> {
        self.map_err(map_sqlite_err)
    }
}

#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    pub fn open(config: &DbConfig) -> Result<Self, DbError> {
        let path = config
            .sqlite_path
            .clone()
            .unwrap_or_else(|| crate::data_dir().join("taskquest.db"));
        std::fs::create_dir_all(path.parent().unwrap_or(Path::new(".")))?;
        Self::open_path(&path)
    }

    pub fn open_path(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path).to_db()?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )
        .to_db()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        tracing::debug!(path = %path.display(), "opened sqlite database");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().to_db()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;").to_db()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DbError::Internal("lock poisoned".into()))?;
        f(&conn)
    }

    fn run_migrations(&self) -> Result<(), DbError> {
        self.with_conn(migrations::run)
    }
}

/// Map a `rusqlite::Error` into a `DbError`, surfacing unique-constraint
/// violations as conflicts.
pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> DbError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            DbError::Conflict(e.to_string())
        }
        _ => DbError::Internal(e.to_string()),
    }
}

/// Run a blocking closure against a cloned handle on the blocking pool.
async fn blocking<F, T>(db: &SqliteDatabase, f: F) -> Result<T, DbError>
where
    F: FnOnce(SqliteDatabase) -> Result<T, DbError> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(db))
        .await
        .map_err(|e| DbError::Internal(e.to_string()))?
}

#[async_trait]
impl Database for SqliteDatabase {
    // -- Users --
    async fn create_user(&self, input: &NewUser) -> Result<User, DbError> {
        let input = input.clone();
        blocking(self, move |db| db.create_user_sync(&input)).await
    }
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, DbError> {
        let email = email.to_string();
        blocking(self, move |db| db.find_user_by_email_sync(&email)).await
    }
    async fn get_profile(&self, user_id: &str) -> Result<Profile, DbError> {
        let user_id = user_id.to_string();
        blocking(self, move |db| db.get_profile_sync(&user_id)).await
    }

    // -- Sessions --
    async fn create_session(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let user_id = user_id.to_string();
        let token_hash = token_hash.to_string();
        blocking(self, move |db| {
            db.create_session_sync(&user_id, &token_hash, expires_at)
        })
        .await
    }
    async fn find_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, DbError> {
        let token_hash = token_hash.to_string();
        blocking(self, move |db| db.find_session_sync(&token_hash, now)).await
    }
    async fn delete_session(&self, token_hash: &str) -> Result<(), DbError> {
        let token_hash = token_hash.to_string();
        blocking(self, move |db| db.delete_session_sync(&token_hash)).await
    }
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, DbError> {
        blocking(self, move |db| db.purge_expired_sessions_sync(now)).await
    }

    // -- Tasks --
    async fn create_task(&self, user_id: &str, input: &CreateTask) -> Result<Task, DbError> {
        let user_id = user_id.to_string();
        let input = input.clone();
        blocking(self, move |db| db.create_task_sync(&user_id, &input)).await
    }
    async fn get_task(&self, user_id: &str, id: &str) -> Result<Task, DbError> {
        let user_id = user_id.to_string();
        let id = id.to_string();
        blocking(self, move |db| db.get_task_sync(&user_id, &id)).await
    }
    async fn list_tasks(
        &self,
        user_id: &str,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, DbError> {
        let user_id = user_id.to_string();
        let filter = filter.clone();
        blocking(self, move |db| db.list_tasks_sync(&user_id, &filter)).await
    }
    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, DbError> {
        let user_id = user_id.to_string();
        let id = id.to_string();
        let update = update.clone();
        blocking(self, move |db| db.update_task_sync(&user_id, &id, &update)).await
    }
    async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), DbError> {
        let user_id = user_id.to_string();
        let id = id.to_string();
        blocking(self, move |db| db.delete_task_sync(&user_id, &id)).await
    }
    async fn toggle_task(&self, user_id: &str, id: &str) -> Result<Completion, DbError> {
        let user_id = user_id.to_string();
        let id = id.to_string();
        blocking(self, move |db| db.toggle_task_sync(&user_id, &id)).await
    }
    async fn reset_recurring_tasks(
        &self,
        user_id: &str,
        completed_before: DateTime<Utc>,
    ) -> Result<usize, DbError> {
        let user_id = user_id.to_string();
        blocking(self, move |db| {
            db.reset_recurring_tasks_sync(&user_id, completed_before)
        })
        .await
    }

    // -- Stats --
    async fn get_stats(&self, user_id: &str) -> Result<UserStats, DbError> {
        let user_id = user_id.to_string();
        blocking(self, move |db| db.get_stats_sync(&user_id)).await
    }
    async fn create_stats(&self, user_id: &str) -> Result<UserStats, DbError> {
        let user_id = user_id.to_string();
        blocking(self, move |db| db.create_stats_sync(&user_id)).await
    }
}

/// Insert a user with a throwaway password hash for tests.
#[cfg(test)]
pub(crate) fn seed_user(db: &SqliteDatabase, email: &str) -> User {
    db.create_user_sync(&NewUser {
        email: email.into(),
        password_hash: "salt$hash".into(),
        username: "tester".into(),
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_returns_working_db() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get(0))
                .to_db()?;
            assert!(count > 0); // migrations created tables
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn open_path_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("test.db");
        assert!(!db_path.exists());

        let _db = SqliteDatabase::open(&DbConfig {
            sqlite_path: Some(db_path.clone()),
        })
        .unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn reopening_keeps_schema_version() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("test.db");
        drop(SqliteDatabase::open_path(&db_path).unwrap());
        let db = SqliteDatabase::open_path(&db_path).unwrap();
        let version = db
            .with_conn(|conn| {
                conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| {
                    r.get::<_, i64>(0)
                })
                .to_db()
            })
            .unwrap();
        assert_eq!(version, migrations::LATEST_VERSION);
    }
}
