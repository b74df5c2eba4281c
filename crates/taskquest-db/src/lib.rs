pub mod sqlite;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use taskquest_core::stats::{Profile, UserStats};
use taskquest_core::task::{Completion, CreateTask, Task, TaskFilter, UpdateTask};
use taskquest_core::user::User;

pub use sqlite::SqliteDatabase;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Internal(String),
}

impl From<taskquest_core::QuestError> for DbError {
    fn from(e: taskquest_core::QuestError) -> Self {
        match e {
            taskquest_core::QuestError::NotFound(msg) => DbError::NotFound(msg),
            taskquest_core::QuestError::InvalidInput(msg) => DbError::InvalidInput(msg),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DbConfig {
    /// Path to the SQLite file. Defaults to `<data_dir>/taskquest.db`.
    pub sqlite_path: Option<PathBuf>,
}

/// A user row about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub username: String,
}

/// A user together with the stored password hash, used for sign-in only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Storage behind the data service. Every task and stats operation is scoped
/// to the owning user; rows owned by someone else behave as if absent.
#[async_trait]
pub trait Database: Send + Sync {
    // -- Users --
    async fn create_user(&self, input: &NewUser) -> Result<User, DbError>;
    async fn find_user_by_email(&self, email: &str)
        -> Result<Option<UserCredentials>, DbError>;
    async fn get_profile(&self, user_id: &str) -> Result<Profile, DbError>;

    // -- Sessions --
    async fn create_session(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError>;
    async fn find_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, DbError>;
    async fn delete_session(&self, token_hash: &str) -> Result<(), DbError>;
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, DbError>;

    // -- Tasks --
    async fn create_task(&self, user_id: &str, input: &CreateTask) -> Result<Task, DbError>;
    async fn get_task(&self, user_id: &str, id: &str) -> Result<Task, DbError>;
    async fn list_tasks(&self, user_id: &str, filter: &TaskFilter)
        -> Result<Vec<Task>, DbError>;
    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, DbError>;
    async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), DbError>;
    async fn toggle_task(&self, user_id: &str, id: &str) -> Result<Completion, DbError>;
    async fn reset_recurring_tasks(
        &self,
        user_id: &str,
        completed_before: DateTime<Utc>,
    ) -> Result<usize, DbError>;

    // -- Stats --
    async fn get_stats(&self, user_id: &str) -> Result<UserStats, DbError>;
    async fn create_stats(&self, user_id: &str) -> Result<UserStats, DbError>;
}

/// Base data directory: `$TASKQUEST_DATA_DIR`, else
/// `$XDG_DATA_HOME/taskquest`, else `~/.local/share/taskquest`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TASKQUEST_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg).join("taskquest")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share/taskquest")
    } else {
        PathBuf::from(".taskquest")
    }
}
