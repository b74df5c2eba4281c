use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::super::{SqliteDatabase, SqliteResultExt};
use super::users::row_to_user;
use crate::{DbError, SessionRecord};

impl SqliteDatabase {
    pub fn create_session_sync(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token_hash, user_id, Utc::now(), expires_at],
            )
            .to_db()?;
            Ok(())
        })
    }

    /// Look up the user behind a token hash. Expired sessions are treated as
    /// absent.
    pub fn find_session_sync(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, DbError> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT u.*, s.expires_at AS session_expires_at
                     FROM sessions s JOIN users u ON u.id = s.user_id
                     WHERE s.token_hash = ?1",
                    params![token_hash],
                    |row| {
                        Ok(SessionRecord {
                            user: row_to_user(row)?,
                            expires_at: row.get("session_expires_at")?,
                        })
                    },
                )
                .optional()
                .to_db()?;
            Ok(record.filter(|r| r.expires_at > now))
        })
    }

    pub fn delete_session_sync(&self, token_hash: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM sessions WHERE token_hash = ?1",
                params![token_hash],
            )
            .to_db()?;
            Ok(())
        })
    }

    pub fn purge_expired_sessions_sync(&self, now: DateTime<Utc>) -> Result<usize, DbError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])
                .to_db()
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::sqlite::seed_user;

    #[test]
    fn session_round_trip() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let user = seed_user(&db, "ada@example.com");
        let now = Utc::now();

        db.create_session_sync(&user.id, "hash-1", now + Duration::days(1))
            .unwrap();
        let record = db.find_session_sync("hash-1", now).unwrap().unwrap();
        assert_eq!(record.user, user);

        db.delete_session_sync("hash-1").unwrap();
        assert!(db.find_session_sync("hash-1", now).unwrap().is_none());
    }

    #[test]
    fn expired_session_is_ignored_and_purged() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let user = seed_user(&db, "ada@example.com");
        let now = Utc::now();

        db.create_session_sync(&user.id, "old", now - Duration::minutes(1))
            .unwrap();
        db.create_session_sync(&user.id, "fresh", now + Duration::days(1))
            .unwrap();

        assert!(db.find_session_sync("old", now).unwrap().is_none());
        assert_eq!(db.purge_expired_sessions_sync(now).unwrap(), 1);
        assert!(db.find_session_sync("fresh", now).unwrap().is_some());
    }

    #[test]
    fn deleting_unknown_session_is_ok() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.delete_session_sync("nope").unwrap();
    }
}
