use async_trait::async_trait;
use taskquest_core::stats::{Profile, UserStats};
use taskquest_core::task::{Completion, CreateTask, Task, TaskFilter, UpdateTask};
use taskquest_core::user::{Credentials, Session, SignUp, User};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// The message without the variant prefix, as shown to users.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::NotFound(m)
            | ServiceError::InvalidInput(m)
            | ServiceError::Unauthorized(m)
            | ServiceError::Conflict(m)
            | ServiceError::Internal(m) => m,
        }
    }
}

impl From<taskquest_core::QuestError> for ServiceError {
    fn from(e: taskquest_core::QuestError) -> Self {
        match e {
            taskquest_core::QuestError::NotFound(msg) => ServiceError::NotFound(msg),
            taskquest_core::QuestError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
        }
    }
}

/// The remote data service behind the quest board.
///
/// The CLI programs against this trait. `LocalService` talks to a database
/// in-process (it is also what the HTTP server runs); `HttpService` is the
/// client for a running `taskquest-server`.
///
/// Every call except sign-up and sign-in takes the caller's session and only
/// ever sees that user's rows.
#[async_trait]
pub trait QuestService: Send + Sync {
    // -- Auth --
    async fn sign_up(&self, form: &SignUp) -> Result<Session, ServiceError>;
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ServiceError>;
    async fn sign_out(&self, session: &Session) -> Result<(), ServiceError>;
    async fn get_user(&self, session: &Session) -> Result<User, ServiceError>;

    // -- Tasks --
    async fn list_tasks(
        &self,
        session: &Session,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, ServiceError>;
    async fn get_task(&self, session: &Session, id: &str) -> Result<Task, ServiceError>;
    async fn create_task(&self, session: &Session, input: &CreateTask)
        -> Result<Task, ServiceError>;
    async fn update_task(
        &self,
        session: &Session,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, ServiceError>;
    async fn delete_task(&self, session: &Session, id: &str) -> Result<(), ServiceError>;
    async fn toggle_task(&self, session: &Session, id: &str)
        -> Result<Completion, ServiceError>;
    /// Reopen recurring tasks completed before the start of the current UTC
    /// day. Returns how many were reset.
    async fn reset_daily_tasks(&self, session: &Session) -> Result<usize, ServiceError>;

    // -- Profile & stats --
    async fn get_profile(&self, session: &Session) -> Result<Profile, ServiceError>;
    async fn get_stats(&self, session: &Session) -> Result<UserStats, ServiceError>;
    async fn create_stats(&self, session: &Session) -> Result<UserStats, ServiceError>;
}
