use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use taskquest_core::stats::{Profile, UserStats};
use taskquest_core::task::{Completion, CreateTask, Task, TaskFilter, UpdateTask};
use taskquest_core::user::{Credentials, Session, SignUp, User};
use taskquest_db::{Database, DbError, NewUser};

use crate::credentials::{generate_token, hash_password, session_ttl, sha256_hex, verify_password};
use crate::{QuestService, ServiceError};

const INVALID_LOGIN: &str = "invalid login credentials";
const INVALID_SESSION: &str = "invalid or expired session";

/// In-process implementation backed by a `Database`.
#[derive(Clone)]
pub struct LocalService {
    db: Arc<dyn Database>,
}

impl LocalService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Resolve a raw access token into the session it belongs to.
    pub async fn authenticate(&self, access_token: &str) -> Result<Session, ServiceError> {
        let record = self
            .db
            .find_session(&sha256_hex(access_token), Utc::now())
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_SESSION.into()))?;
        Ok(Session {
            access_token: access_token.to_string(),
            user: record.user,
            expires_at: record.expires_at,
        })
    }

    /// Delete every expired session. Returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<usize, ServiceError> {
        Ok(self.db.purge_expired_sessions(Utc::now()).await?)
    }

    async fn authorize(&self, session: &Session) -> Result<User, ServiceError> {
        Ok(self.authenticate(&session.access_token).await?.user)
    }

    async fn open_session(&self, user: User) -> Result<Session, ServiceError> {
        let token = generate_token();
        let expires_at = Utc::now() + session_ttl();
        self.db
            .create_session(&user.id, &sha256_hex(&token), expires_at)
            .await?;
        Ok(Session {
            access_token: token,
            user,
            expires_at,
        })
    }
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(msg) => ServiceError::NotFound(msg),
            DbError::Conflict(msg) => ServiceError::Conflict(msg),
            DbError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

#[async_trait]
impl QuestService for LocalService {
    async fn sign_up(&self, form: &SignUp) -> Result<Session, ServiceError> {
        let form = form.normalized()?;
        let user = self
            .db
            .create_user(&NewUser {
                email: form.email,
                password_hash: hash_password(&form.password),
                username: form.username,
            })
            .await?;
        tracing::info!(user_id = %user.id, "registered user");
        self.open_session(user).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ServiceError> {
        let email = credentials.normalized_email();
        let found = self.db.find_user_by_email(&email).await?;
        match found {
            Some(found) if verify_password(&credentials.password, &found.password_hash) => {
                self.open_session(found.user).await
            }
            _ => Err(ServiceError::Unauthorized(INVALID_LOGIN.into())),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), ServiceError> {
        Ok(self
            .db
            .delete_session(&sha256_hex(&session.access_token))
            .await?)
    }

    async fn get_user(&self, session: &Session) -> Result<User, ServiceError> {
        self.authorize(session).await
    }

    async fn list_tasks(
        &self,
        session: &Session,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.list_tasks(&user.id, filter).await?)
    }

    async fn get_task(&self, session: &Session, id: &str) -> Result<Task, ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.get_task(&user.id, id).await?)
    }

    async fn create_task(
        &self,
        session: &Session,
        input: &CreateTask,
    ) -> Result<Task, ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.create_task(&user.id, input).await?)
    }

    async fn update_task(
        &self,
        session: &Session,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.update_task(&user.id, id, update).await?)
    }

    async fn delete_task(&self, session: &Session, id: &str) -> Result<(), ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.delete_task(&user.id, id).await?)
    }

    async fn toggle_task(&self, session: &Session, id: &str) -> Result<Completion, ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.toggle_task(&user.id, id).await?)
    }

    async fn reset_daily_tasks(&self, session: &Session) -> Result<usize, ServiceError> {
        let user = self.authorize(session).await?;
        let start_of_day = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let reset = self
            .db
            .reset_recurring_tasks(&user.id, start_of_day)
            .await?;
        if reset > 0 {
            tracing::info!(user_id = %user.id, reset, "reset daily tasks");
        }
        Ok(reset)
    }

    async fn get_profile(&self, session: &Session) -> Result<Profile, ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.get_profile(&user.id).await?)
    }

    async fn get_stats(&self, session: &Session) -> Result<UserStats, ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.get_stats(&user.id).await?)
    }

    async fn create_stats(&self, session: &Session) -> Result<UserStats, ServiceError> {
        let user = self.authorize(session).await?;
        Ok(self.db.create_stats(&user.id).await?)
    }
}
