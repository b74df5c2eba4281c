use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

use taskquest_core::task::{
    Completion, CreateTask, Difficulty, Task, TaskFilter, TaskKind, TaskType, UpdateTask,
};

use super::super::{SqliteDatabase, SqliteResultExt};
use super::stats::{ensure_stats, select_stats};
use crate::DbError;

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let task_type_str: String = row.get("task_type")?;
    let difficulty_str: String = row.get("difficulty")?;
    let due_date: Option<NaiveDate> = row.get("due_date")?;
    let is_complete: i64 = row.get("is_complete")?;
    Ok(Task {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        kind: TaskKind::new(
            TaskType::parse_str(&task_type_str).unwrap_or(TaskType::Normal),
            due_date,
        ),
        difficulty: Difficulty::parse_str(&difficulty_str).unwrap_or_default(),
        ap_reward: row.get("ap_reward")?,
        is_complete: is_complete != 0,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
    })
}

fn select_task(conn: &Connection, user_id: &str, id: &str) -> Result<Task, DbError> {
    conn.query_row(
        "SELECT * FROM tasks WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
        row_to_task,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("task {id}")),
        other => DbError::Internal(other.to_string()),
    })
}

impl SqliteDatabase {
    pub fn create_task_sync(&self, user_id: &str, input: &CreateTask) -> Result<Task, DbError> {
        let input = input.normalized()?;
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();

            conn.execute(
                "INSERT INTO tasks (
                    id, user_id, title, description, task_type, difficulty,
                    ap_reward, is_complete, due_date, created_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
                params![
                    id,
                    user_id,
                    input.title,
                    input.description,
                    input.kind.task_type().as_str(),
                    input.difficulty.as_str(),
                    input.difficulty.ap_reward(),
                    input.kind.due_date(),
                    now,
                ],
            )
            .to_db()?;

            select_task(conn, user_id, &id)
        })
    }

    pub fn get_task_sync(&self, user_id: &str, id: &str) -> Result<Task, DbError> {
        self.with_conn(|conn| select_task(conn, user_id, id))
    }

    /// Newest first; rows inserted within the same instant keep insertion
    /// order reversed.
    pub fn list_tasks_sync(&self, user_id: &str, filter: &TaskFilter) -> Result<Vec<Task>, DbError> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT * FROM tasks WHERE user_id = ?1");
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(user_id.to_string())];

            if let Some(task_type) = filter.task_type {
                param_values.push(Box::new(task_type.as_str().to_string()));
                sql.push_str(&format!(" AND task_type = ?{}", param_values.len()));
            }
            if let Some(is_complete) = filter.is_complete {
                param_values.push(Box::new(is_complete as i64));
                sql.push_str(&format!(" AND is_complete = ?{}", param_values.len()));
            }

            sql.push_str(" ORDER BY created_at DESC, rowid DESC");

            if let Some(limit) = filter.limit {
                param_values.push(Box::new(limit));
                sql.push_str(&format!(" LIMIT ?{}", param_values.len()));
            }

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql).to_db()?;
            let tasks = stmt
                .query_map(params_ref.as_slice(), row_to_task)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(tasks)
        })
    }

    /// Apply a partial edit. The patch is resolved against the stored row so
    /// the type/due-date invariant and the difficulty-derived reward hold for
    /// the result, whatever combination of fields was sent.
    pub fn update_task_sync(
        &self,
        user_id: &str,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, DbError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().to_db()?;
            let mut task = select_task(&tx, user_id, id)?;
            if update.is_empty() {
                return Ok(task);
            }
            update.apply(&mut task)?;

            tx.execute(
                "UPDATE tasks
                 SET title = ?1, description = ?2, task_type = ?3, difficulty = ?4,
                     ap_reward = ?5, due_date = ?6
                 WHERE id = ?7 AND user_id = ?8",
                params![
                    task.title,
                    task.description,
                    task.task_type().as_str(),
                    task.difficulty.as_str(),
                    task.ap_reward,
                    task.due_date(),
                    id,
                    user_id,
                ],
            )
            .to_db()?;

            let task = select_task(&tx, user_id, id)?;
            tx.commit().to_db()?;
            Ok(task)
        })
    }

    pub fn delete_task_sync(&self, user_id: &str, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                )
                .to_db()?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
    }

    /// Flip the completion flag and settle action points in one transaction.
    ///
    /// Completing credits `ap_reward` and remembers the amount on the row;
    /// reopening debits exactly that amount (never below zero).
    pub fn toggle_task_sync(&self, user_id: &str, id: &str) -> Result<Completion, DbError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().to_db()?;
            let task = select_task(&tx, user_id, id)?;
            let now = Utc::now();

            let ap_delta = if task.is_complete {
                let awarded: i64 = tx
                    .query_row(
                        "SELECT ap_awarded FROM tasks WHERE id = ?1",
                        params![id],
                        |r| r.get(0),
                    )
                    .to_db()?;
                tx.execute(
                    "UPDATE tasks SET is_complete = 0, completed_at = NULL, ap_awarded = 0
                     WHERE id = ?1",
                    params![id],
                )
                .to_db()?;
                -awarded
            } else {
                tx.execute(
                    "UPDATE tasks SET is_complete = 1, completed_at = ?1, ap_awarded = ?2
                     WHERE id = ?3",
                    params![now, task.ap_reward, id],
                )
                .to_db()?;
                task.ap_reward
            };

            ensure_stats(&tx, user_id, now)?;
            tx.execute(
                "UPDATE user_stats
                 SET action_points = MAX(0, action_points + ?1), updated_at = ?2
                 WHERE user_id = ?3",
                params![ap_delta, now, user_id],
            )
            .to_db()?;

            let task = select_task(&tx, user_id, id)?;
            let stats = select_stats(&tx, user_id)?;
            tx.commit().to_db()?;

            tracing::debug!(
                task_id = %id,
                is_complete = task.is_complete,
                ap_delta,
                action_points = stats.action_points,
                "toggled task"
            );
            Ok(Completion {
                task,
                ap_delta,
                action_points: stats.action_points,
            })
        })
    }

    /// Reopen recurring tasks completed before `completed_before`. Points
    /// already earned are kept.
    pub fn reset_recurring_tasks_sync(
        &self,
        user_id: &str,
        completed_before: DateTime<Utc>,
    ) -> Result<usize, DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET is_complete = 0, completed_at = NULL, ap_awarded = 0
                 WHERE user_id = ?1
                   AND task_type = 'recurring'
                   AND is_complete = 1
                   AND completed_at < ?2",
                params![user_id, completed_before],
            )
            .to_db()
        })
    }
}
