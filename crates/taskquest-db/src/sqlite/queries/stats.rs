use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use taskquest_core::stats::UserStats;

use super::super::{SqliteDatabase, SqliteResultExt};
use crate::DbError;

fn row_to_stats(row: &Row) -> rusqlite::Result<UserStats> {
    Ok(UserStats {
        user_id: row.get("user_id")?,
        level: row.get("level")?,
        exp: row.get("exp")?,
        exp_to_next: row.get("exp_to_next")?,
        current_hp: row.get("current_hp")?,
        max_hp: row.get("max_hp")?,
        physical_attack: row.get("physical_attack")?,
        physical_defense: row.get("physical_defense")?,
        magical_attack: row.get("magical_attack")?,
        magical_defense: row.get("magical_defense")?,
        crit_rate: row.get("crit_rate")?,
        action_points: row.get("action_points")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Insert the starting stats row for `user_id` unless one exists.
pub(crate) fn ensure_stats(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    let s = UserStats::starting(user_id, now);
    conn.execute(
        "INSERT OR IGNORE INTO user_stats (
            user_id, level, exp, exp_to_next, current_hp, max_hp,
            physical_attack, physical_defense, magical_attack, magical_defense,
            crit_rate, action_points, updated_at
         )
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            s.user_id,
            s.level,
            s.exp,
            s.exp_to_next,
            s.current_hp,
            s.max_hp,
            s.physical_attack,
            s.physical_defense,
            s.magical_attack,
            s.magical_defense,
            s.crit_rate,
            s.action_points,
            s.updated_at,
        ],
    )
    .to_db()?;
    Ok(())
}

pub(crate) fn select_stats(conn: &Connection, user_id: &str) -> Result<UserStats, DbError> {
    conn.query_row(
        "SELECT * FROM user_stats WHERE user_id = ?1",
        params![user_id],
        row_to_stats,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("stats for {user_id}")),
        other => DbError::Internal(other.to_string()),
    })
}

impl SqliteDatabase {
    pub fn get_stats_sync(&self, user_id: &str) -> Result<UserStats, DbError> {
        self.with_conn(|conn| select_stats(conn, user_id))
    }

    /// Create the starting stats row. Calling it again returns the existing
    /// row untouched.
    pub fn create_stats_sync(&self, user_id: &str) -> Result<UserStats, DbError> {
        self.with_conn(|conn| {
            ensure_stats(conn, user_id, Utc::now())?;
            select_stats(conn, user_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::seed_user;

    #[test]
    fn stats_absent_until_created() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let user = seed_user(&db, "ada@example.com");

        let err = db.get_stats_sync(&user.id).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));

        let created = db.create_stats_sync(&user.id).unwrap();
        assert_eq!(created.action_points, 0);
        assert_eq!(created.level, 1);

        let fetched = db.get_stats_sync(&user.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn create_stats_is_idempotent() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let user = seed_user(&db, "ada@example.com");
        db.create_stats_sync(&user.id).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE user_stats SET action_points = 7 WHERE user_id = ?1",
                params![user.id],
            )
            .to_db()
        })
        .unwrap();

        let again = db.create_stats_sync(&user.id).unwrap();
        assert_eq!(again.action_points, 7);
    }
}
