use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use taskquest_core::user::{Credentials, Session, SignUp};
use taskquest_service::{QuestService, ServiceError};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The saved session has not been checked yet.
    Loading,
    SignedOut,
    SignedIn(Session),
}

/// Owns the current authentication state and tells subscribers when it
/// changes.
pub struct SessionProvider {
    service: Arc<dyn QuestService>,
    state: watch::Sender<SessionState>,
}

impl SessionProvider {
    pub fn new(service: Arc<dyn QuestService>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { service, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Loading)
    }

    pub fn session(&self) -> Option<Session> {
        match &*self.state.borrow() {
            SessionState::SignedIn(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// The signed-in session, or `Unauthorized` when there is none.
    pub fn require(&self) -> Result<Session, ServiceError> {
        self.session()
            .ok_or_else(|| ServiceError::Unauthorized("not signed in".into()))
    }

    fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    /// Check a previously saved session with the service. A session the
    /// service no longer accepts signs the user out; other failures are
    /// returned and also leave the user signed out.
    pub async fn restore(&self, saved: Option<Session>) -> Result<(), ServiceError> {
        let Some(saved) = saved else {
            self.publish(SessionState::SignedOut);
            return Ok(());
        };
        if saved.is_expired(Utc::now()) {
            tracing::debug!("saved session expired");
            self.publish(SessionState::SignedOut);
            return Ok(());
        }

        match self.service.get_user(&saved).await {
            Ok(user) => {
                self.publish(SessionState::SignedIn(Session { user, ..saved }));
                Ok(())
            }
            Err(ServiceError::Unauthorized(_)) => {
                self.publish(SessionState::SignedOut);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to restore session");
                self.publish(SessionState::SignedOut);
                Err(e)
            }
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ServiceError> {
        let session = self
            .service
            .sign_in(credentials)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "sign-in failed"))?;
        self.publish(SessionState::SignedIn(session.clone()));
        Ok(session)
    }

    pub async fn sign_up(&self, form: &SignUp) -> Result<Session, ServiceError> {
        let session = self
            .service
            .sign_up(form)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "sign-up failed"))?;
        self.publish(SessionState::SignedIn(session.clone()));
        Ok(session)
    }

    /// Revoke the current session. The local state is signed out even if the
    /// service call fails.
    pub async fn sign_out(&self) -> Result<(), ServiceError> {
        let Some(session) = self.session() else {
            self.publish(SessionState::SignedOut);
            return Ok(());
        };
        let result = self.service.sign_out(&session).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "failed to revoke session");
        }
        self.publish(SessionState::SignedOut);
        result
    }
}

/// The signed-in session persisted between CLI invocations.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/session.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}
