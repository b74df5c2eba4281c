use rusqlite::Connection;

use super::SqliteResultExt;
use crate::DbError;

pub(crate) const LATEST_VERSION: i64 = 2;

pub(crate) fn run(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )
    .to_db()?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .to_db()?;

    if current_version < 1 {
        // v1: users, profiles, sessions, tasks, user_stats
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id            TEXT PRIMARY KEY,
                email         TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS profiles (
                id          TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                username    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token_hash  TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                expires_at  TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

            CREATE TABLE IF NOT EXISTS tasks (
                id           TEXT PRIMARY KEY,
                user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title        TEXT NOT NULL,
                description  TEXT,
                task_type    TEXT NOT NULL
                                 CHECK(task_type IN ('recurring', 'normal')),
                difficulty   TEXT NOT NULL DEFAULT 'easy'
                                 CHECK(difficulty IN ('easy', 'medium', 'hard')),
                ap_reward    INTEGER NOT NULL,
                is_complete  INTEGER NOT NULL DEFAULT 0,
                due_date     TEXT,
                created_at   TEXT NOT NULL,
                CHECK(task_type = 'normal' OR due_date IS NULL)
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, created_at);

            CREATE TABLE IF NOT EXISTS user_stats (
                user_id          TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                level            INTEGER NOT NULL,
                exp              INTEGER NOT NULL,
                exp_to_next      INTEGER NOT NULL,
                current_hp       INTEGER NOT NULL,
                max_hp           INTEGER NOT NULL,
                physical_attack  INTEGER NOT NULL,
                physical_defense INTEGER NOT NULL,
                magical_attack   INTEGER NOT NULL,
                magical_defense  INTEGER NOT NULL,
                crit_rate        INTEGER NOT NULL,
                action_points    INTEGER NOT NULL DEFAULT 0 CHECK(action_points >= 0),
                updated_at       TEXT NOT NULL
            );

            INSERT INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
            ",
        )
        .to_db()?;
    }

    if current_version < 2 {
        // v2: completion bookkeeping for the daily reset and reversible awards
        let has_column = |table: &str, col: &str| -> bool {
            conn.prepare(&format!("SELECT {col} FROM {table} LIMIT 0"))
                .is_ok()
        };

        if !has_column("tasks", "completed_at") {
            conn.execute_batch(
                "ALTER TABLE tasks ADD COLUMN completed_at TEXT;
                 ALTER TABLE tasks ADD COLUMN ap_awarded INTEGER NOT NULL DEFAULT 0;",
            )
            .to_db()?;
        }

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_tasks_completed
                 ON tasks(user_id, task_type, is_complete);
             INSERT INTO schema_version (version, applied_at) VALUES (2, datetime('now'));",
        )
        .to_db()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, LATEST_VERSION);
    }

    #[test]
    fn unreadable_schema_version_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE schema_version (label TEXT);")
            .unwrap();

        assert!(run(&conn).is_err());
        // Nothing was applied on top of the broken version table.
        assert!(conn.prepare("SELECT id FROM users").is_err());
    }

    #[test]
    fn recurring_task_with_due_date_is_rejected_by_schema() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at)
             VALUES ('u1', 'a@b.c', 'x', '2026-01-01')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO tasks (id, user_id, title, task_type, ap_reward, due_date, created_at)
             VALUES ('t1', 'u1', 'x', 'recurring', 1, '2026-01-02', '2026-01-01')",
            [],
        );
        assert!(result.is_err());
    }
}
