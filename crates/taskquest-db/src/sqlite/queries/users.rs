use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use taskquest_core::stats::Profile;
use taskquest_core::user::User;

use super::super::{SqliteDatabase, SqliteResultExt};
use crate::{DbError, NewUser, UserCredentials};

pub(crate) fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get("id")?,
        username: row.get("username")?,
        created_at: row.get("created_at")?,
    })
}

impl SqliteDatabase {
    /// Insert a user and its profile in one transaction.
    pub fn create_user_sync(&self, input: &NewUser) -> Result<User, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            let tx = conn.unchecked_transaction().to_db()?;

            tx.execute(
                "INSERT INTO users (id, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, input.email, input.password_hash, now],
            )
            .map_err(|e| match crate::sqlite::map_sqlite_err(e) {
                DbError::Conflict(_) => {
                    DbError::Conflict(format!("user {} already registered", input.email))
                }
                other => other,
            })?;
            tx.execute(
                "INSERT INTO profiles (id, username, created_at) VALUES (?1, ?2, ?3)",
                params![id, input.username, now],
            )
            .to_db()?;

            let user = tx
                .query_row("SELECT * FROM users WHERE id = ?1", params![id], row_to_user)
                .to_db()?;
            tx.commit().to_db()?;
            Ok(user)
        })
    }

    pub fn find_user_by_email_sync(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(UserCredentials {
                        user: row_to_user(row)?,
                        password_hash: row.get("password_hash")?,
                    })
                },
            )
            .optional()
            .to_db()
        })
    }

    pub fn get_profile_sync(&self, user_id: &str) -> Result<Profile, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM profiles WHERE id = ?1",
                params![user_id],
                row_to_profile,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::NotFound(format!("profile {user_id}"))
                }
                other => DbError::Internal(other.to_string()),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "salt$hash".into(),
            username: "ada".into(),
        }
    }

    #[test]
    fn create_user_also_creates_profile() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let user = db.create_user_sync(&new_user("ada@example.com")).unwrap();
        assert_eq!(user.email, "ada@example.com");

        let profile = db.get_profile_sync(&user.id).unwrap();
        assert_eq!(profile.id, user.id);
        assert_eq!(profile.username, "ada");
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.create_user_sync(&new_user("ada@example.com")).unwrap();
        let err = db.create_user_sync(&new_user("ada@example.com")).unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn find_user_by_email_returns_hash() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let user = db.create_user_sync(&new_user("ada@example.com")).unwrap();

        let found = db.find_user_by_email_sync("ada@example.com").unwrap().unwrap();
        assert_eq!(found.user, user);
        assert_eq!(found.password_hash, "salt$hash");

        assert!(db.find_user_by_email_sync("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn missing_profile_is_not_found() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let err = db.get_profile_sync("ghost").unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
