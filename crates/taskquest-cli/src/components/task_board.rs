use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;
use taskquest_core::task::{Completion, CreateTask, Task, TaskFilter, TaskType, UpdateTask};
use taskquest_core::user::Session;
use taskquest_service::{QuestService, ServiceError};

/// Characters of the id shown in listings and accepted as a short id.
pub const SHORT_ID_LEN: usize = 8;

/// The user's tasks, newest first, held in one collection keyed by id.
///
/// The daily and normal views are filtered out of the same list, so a task
/// whose type changes moves between views without any bookkeeping.
pub struct TaskBoard {
    service: Arc<dyn QuestService>,
    tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new(service: Arc<dyn QuestService>) -> Self {
        Self {
            service,
            tasks: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn daily(&self) -> impl Iterator<Item = &Task> {
        self.view(TaskType::Recurring)
    }

    pub fn normal(&self) -> impl Iterator<Item = &Task> {
        self.view(TaskType::Normal)
    }

    fn view(&self, task_type: TaskType) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.task_type() == task_type)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Look a task up by its full id or a unique id prefix.
    pub fn resolve(&self, id_or_prefix: &str) -> Result<&Task, ServiceError> {
        if let Some(task) = self.get(id_or_prefix) {
            return Ok(task);
        }
        let mut matches = self
            .tasks
            .iter()
            .filter(|t| !id_or_prefix.is_empty() && t.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task),
            (Some(_), Some(_)) => Err(ServiceError::InvalidInput(format!(
                "task id {id_or_prefix} is ambiguous"
            ))),
            (None, _) => Err(ServiceError::NotFound(format!("task {id_or_prefix}"))),
        }
    }

    /// Reset yesterday's daily tasks, then fetch every task the user owns.
    /// On failure the current list is kept.
    pub async fn load(&mut self, session: &Session) -> Result<(), ServiceError> {
        let result = match self.service.reset_daily_tasks(session).await {
            Ok(_) => {
                self.service
                    .list_tasks(session, &TaskFilter::default())
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "loaded tasks");
                self.tasks = tasks;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load tasks");
                Err(e)
            }
        }
    }

    pub async fn add(&mut self, session: &Session, draft: &CreateTask) -> Result<&Task, ServiceError> {
        let draft = draft.normalized()?;
        let task = self
            .service
            .create_task(session, &draft)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "failed to add task"))?;
        self.tasks.insert(0, task);
        Ok(&self.tasks[0])
    }

    pub async fn update(
        &mut self,
        session: &Session,
        id: &str,
        patch: &UpdateTask,
    ) -> Result<&Task, ServiceError> {
        patch.validate()?;
        let task = self
            .service
            .update_task(session, id, patch)
            .await
            .inspect_err(|e| tracing::warn!(task_id = %id, error = %e, "failed to update task"))?;
        Ok(self.replace(task))
    }

    /// Flip a task's completion flag. The returned completion carries the
    /// action point change and the new balance.
    pub async fn toggle_complete(
        &mut self,
        session: &Session,
        id: &str,
    ) -> Result<Completion, ServiceError> {
        let completion = self
            .service
            .toggle_task(session, id)
            .await
            .inspect_err(|e| tracing::warn!(task_id = %id, error = %e, "failed to toggle task"))?;
        self.replace(completion.task.clone());
        Ok(completion)
    }

    /// Delete a task once `confirm` approves it. Returns `false` when the
    /// user declined, in which case nothing is sent.
    pub async fn delete<F>(
        &mut self,
        session: &Session,
        id: &str,
        confirm: F,
    ) -> Result<bool, ServiceError>
    where
        F: FnOnce(&Task) -> bool,
    {
        let task = self
            .get(id)
            .ok_or_else(|| ServiceError::NotFound(format!("task {id}")))?;
        if !confirm(task) {
            return Ok(false);
        }
        self.service
            .delete_task(session, id)
            .await
            .inspect_err(|e| tracing::warn!(task_id = %id, error = %e, "failed to delete task"))?;
        self.tasks.retain(|t| t.id != id);
        Ok(true)
    }

    fn replace(&mut self, task: Task) -> &Task {
        match self.tasks.iter().position(|t| t.id == task.id) {
            Some(idx) => {
                self.tasks[idx] = task;
                &self.tasks[idx]
            }
            None => {
                self.tasks.insert(0, task);
                &self.tasks[0]
            }
        }
    }

    pub fn render(&self, today: NaiveDate, only: Option<TaskType>) -> String {
        let mut out = String::new();
        for &task_type in TaskType::ALL {
            if only.is_some_and(|t| t != task_type) {
                continue;
            }
            let _ = writeln!(out, "{} Tasks", task_type.display_name());
            let mut any = false;
            for task in self.view(task_type) {
                any = true;
                let _ = writeln!(out, "  {}", render_task(task, today));
            }
            if !any {
                let _ = writeln!(out, "  (none)");
            }
        }
        out
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

pub fn render_task(task: &Task, today: NaiveDate) -> String {
    let mut line = format!(
        "[{}] {}  {}  ({}, +{} AP)",
        if task.is_complete { "x" } else { " " },
        short_id(&task.id),
        task.title,
        task.difficulty.display_name(),
        task.ap_reward,
    );
    if let Some(due) = task.due_date() {
        let _ = write!(line, "  due {due}");
        if task.is_overdue(today) {
            line.push_str(" (overdue)");
        }
    }
    if let Some(description) = &task.description {
        let _ = write!(line, "\n      {description}");
    }
    line
}
