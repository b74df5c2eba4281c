use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use taskquest_core::stats::{Profile, UserStats};
use taskquest_core::task::{Completion, CreateTask, Task, TaskFilter, UpdateTask};
use taskquest_core::user::{Credentials, Session, SignUp, User};

use crate::{QuestService, ServiceError};

#[derive(Debug, serde::Deserialize)]
struct ResetCount {
    reset: usize,
}

/// Async HTTP client implementation of `QuestService`.
/// Connects to a running taskquest-server.
#[derive(Clone)]
pub struct HttpService {
    base_url: String,
    client: Client,
}

impl HttpService {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_auth(builder: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        match session {
            Some(s) => builder.bearer_auth(&s.access_token),
            None => builder,
        }
    }

    /// Check if the server is reachable.
    /// Health endpoint is NOT authenticated.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        let resp = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::Internal(format!(
                "health check failed: {}",
                resp.status()
            )))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<T, ServiceError> {
        let builder = self.client.get(format!("{}{path}", self.base_url));
        let resp = Self::with_auth(builder, Some(session))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        session: Option<&Session>,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        let resp = Self::with_auth(builder, session)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    async fn put_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .put(format!("{}{path}", self.base_url))
            .json(body);
        let resp = Self::with_auth(builder, Some(session))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    async fn post_empty(&self, session: &Session, path: &str) -> Result<(), ServiceError> {
        let builder = self.client.post(format!("{}{path}", self.base_url));
        let resp = Self::with_auth(builder, Some(session))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }

    async fn delete_req(&self, session: &Session, path: &str) -> Result<(), ServiceError> {
        let builder = self.client.delete(format!("{}{path}", self.base_url));
        let resp = Self::with_auth(builder, Some(session))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

async fn parse_error(resp: reqwest::Response) -> ServiceError {
    let status = resp.status();
    parse_error_with_status(status, resp).await
}

async fn parse_error_with_status(status: StatusCode, resp: reqwest::Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or(body);

    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(msg),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::InvalidInput(msg)
        }
        StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(msg),
        StatusCode::CONFLICT => ServiceError::Conflict(msg),
        _ => ServiceError::Internal(msg),
    }
}

fn task_query(filter: &TaskFilter) -> String {
    let mut params = Vec::new();
    if let Some(task_type) = filter.task_type {
        params.push(format!("task_type={}", task_type.as_str()));
    }
    if let Some(is_complete) = filter.is_complete {
        params.push(format!("is_complete={is_complete}"));
    }
    if let Some(limit) = filter.limit {
        params.push(format!("limit={limit}"));
    }
    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}

#[async_trait]
impl QuestService for HttpService {
    async fn sign_up(&self, form: &SignUp) -> Result<Session, ServiceError> {
        self.post_json(None, "/api/auth/signup", form).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ServiceError> {
        self.post_json(None, "/api/auth/signin", credentials).await
    }

    async fn sign_out(&self, session: &Session) -> Result<(), ServiceError> {
        self.post_empty(session, "/api/auth/signout").await
    }

    async fn get_user(&self, session: &Session) -> Result<User, ServiceError> {
        self.get_json(session, "/api/auth/user").await
    }

    async fn list_tasks(
        &self,
        session: &Session,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, ServiceError> {
        self.get_json(session, &format!("/api/tasks{}", task_query(filter)))
            .await
    }

    async fn get_task(&self, session: &Session, id: &str) -> Result<Task, ServiceError> {
        self.get_json(session, &format!("/api/tasks/{id}")).await
    }

    async fn create_task(
        &self,
        session: &Session,
        input: &CreateTask,
    ) -> Result<Task, ServiceError> {
        self.post_json(Some(session), "/api/tasks", input).await
    }

    async fn update_task(
        &self,
        session: &Session,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, ServiceError> {
        self.put_json(session, &format!("/api/tasks/{id}"), update)
            .await
    }

    async fn delete_task(&self, session: &Session, id: &str) -> Result<(), ServiceError> {
        self.delete_req(session, &format!("/api/tasks/{id}")).await
    }

    async fn toggle_task(&self, session: &Session, id: &str) -> Result<Completion, ServiceError> {
        self.post_json(
            Some(session),
            &format!("/api/tasks/{id}/toggle"),
            &serde_json::json!({}),
        )
        .await
    }

    async fn reset_daily_tasks(&self, session: &Session) -> Result<usize, ServiceError> {
        let count: ResetCount = self
            .post_json(Some(session), "/api/tasks/reset-daily", &serde_json::json!({}))
            .await?;
        Ok(count.reset)
    }

    async fn get_profile(&self, session: &Session) -> Result<Profile, ServiceError> {
        self.get_json(session, "/api/profile").await
    }

    async fn get_stats(&self, session: &Session) -> Result<UserStats, ServiceError> {
        self.get_json(session, "/api/stats").await
    }

    async fn create_stats(&self, session: &Session) -> Result<UserStats, ServiceError> {
        self.post_json(Some(session), "/api/stats", &serde_json::json!({}))
            .await
    }
}

#[cfg(test)]
mod tests {
    use taskquest_core::task::TaskType;

    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(
            HttpService::new("http://localhost:3710/").base_url(),
            "http://localhost:3710"
        );
    }

    #[test]
    fn task_query_encodes_filters() {
        assert_eq!(task_query(&TaskFilter::default()), "");
        let filter = TaskFilter {
            task_type: Some(TaskType::Recurring),
            is_complete: Some(false),
            limit: Some(5),
        };
        assert_eq!(
            task_query(&filter),
            "?task_type=recurring&is_complete=false&limit=5"
        );
    }
}
