use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::QuestError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// An authenticated identity. The access token is only ever known to the
/// holder; the server keeps a hash of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl SignUp {
    /// Validate and return the trimmed form (lower-cased e-mail).
    pub fn normalized(&self) -> Result<SignUp, QuestError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(QuestError::InvalidInput(
                "email must be a valid address".into(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(QuestError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let username = self.username.trim();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(QuestError::InvalidInput(format!(
                "username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        Ok(SignUp {
            email,
            password: self.password.clone(),
            username: username.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str, username: &str) -> SignUp {
        SignUp {
            email: email.into(),
            password: password.into(),
            username: username.into(),
        }
    }

    #[test]
    fn sign_up_normalizes_email_and_username() {
        let n = form(" Ada@Example.COM ", "secret1", "  ada ").normalized().unwrap();
        assert_eq!(n.email, "ada@example.com");
        assert_eq!(n.username, "ada");
    }

    #[test]
    fn sign_up_rejects_bad_input() {
        assert!(form("nope", "secret1", "ada").normalized().is_err());
        assert!(form("a@b.c", "short", "ada").normalized().is_err());
        assert!(form("a@b.c", "secret1", "ab").normalized().is_err());
    }

    #[test]
    fn credentials_email_is_case_insensitive() {
        let c = Credentials {
            email: "ADA@example.com ".into(),
            password: String::new(),
        };
        assert_eq!(c.normalized_email(), "ada@example.com");
    }
}
