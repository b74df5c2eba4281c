use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::QuestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Recurring,
    Normal,
}

impl TaskType {
    pub const ALL: &[TaskType] = &[TaskType::Recurring, TaskType::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Recurring => "recurring",
            TaskType::Normal => "normal",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TaskType::Recurring => "Daily",
            TaskType::Normal => "Normal",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "recurring" | "daily" => Some(TaskType::Recurring),
            "normal" => Some(TaskType::Normal),
            _ => None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: &[Difficulty] = &[Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Action points granted for completing a task of this difficulty.
    pub fn ap_reward(&self) -> i64 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Task type together with the data only that type may carry.
///
/// On the wire this flattens to `task_type` plus an optional `due_date`, so a
/// recurring task cannot be given a deadline: any `due_date` sent alongside
/// `"task_type": "recurring"` is dropped during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskKind {
    Recurring,
    Normal {
        #[serde(default)]
        due_date: Option<NaiveDate>,
    },
}

impl TaskKind {
    pub fn new(task_type: TaskType, due_date: Option<NaiveDate>) -> Self {
        match task_type {
            TaskType::Recurring => TaskKind::Recurring,
            TaskType::Normal => TaskKind::Normal { due_date },
        }
    }

    pub fn task_type(&self) -> TaskType {
        match self {
            TaskKind::Recurring => TaskType::Recurring,
            TaskKind::Normal { .. } => TaskType::Normal,
        }
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        match self {
            TaskKind::Recurring => None,
            TaskKind::Normal { due_date } => *due_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: TaskKind,
    pub difficulty: Difficulty,
    pub ap_reward: i64,
    pub is_complete: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn task_type(&self) -> TaskType {
        self.kind.task_type()
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.kind.due_date()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_complete && self.due_date().is_some_and(|d| d < today)
    }
}

/// A task as submitted by the user. The reward is never supplied by the
/// caller; it is derived from `difficulty` when the task is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl CreateTask {
    pub fn recurring(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            kind: TaskKind::Recurring,
            difficulty: Difficulty::default(),
        }
    }

    pub fn normal(title: impl Into<String>, due_date: Option<NaiveDate>) -> Self {
        Self {
            title: title.into(),
            description: None,
            kind: TaskKind::Normal { due_date },
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Validate and return the trimmed form that gets persisted.
    pub fn normalized(&self) -> Result<CreateTask, QuestError> {
        Ok(CreateTask {
            title: normalize_title(&self.title)?,
            description: normalize_description(self.description.as_deref()),
            kind: self.kind,
            difficulty: self.difficulty,
        })
    }
}

/// Partial edit of a task. `None` leaves a field untouched; for the nullable
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.difficulty.is_none()
            && self.task_type.is_none()
            && self.due_date.is_none()
    }

    /// Reject a patch that would leave the task without a title.
    pub fn validate(&self) -> Result<(), QuestError> {
        if let Some(title) = &self.title {
            normalize_title(title)?;
        }
        Ok(())
    }

    /// Apply the patch to `task`. Validation happens before anything is
    /// written, so on error `task` is unchanged.
    pub fn apply(&self, task: &mut Task) -> Result<(), QuestError> {
        let title = self.title.as_deref().map(normalize_title).transpose()?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = &self.description {
            task.description = normalize_description(description.as_deref());
        }
        if let Some(difficulty) = self.difficulty {
            task.difficulty = difficulty;
            task.ap_reward = difficulty.ap_reward();
        }

        let task_type = self.task_type.unwrap_or(task.task_type());
        let due_date = match self.due_date {
            Some(due_date) => due_date,
            None => task.due_date(),
        };
        task.kind = TaskKind::new(task_type, due_date);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub task_type: Option<TaskType>,
    pub is_complete: Option<bool>,
    pub limit: Option<i64>,
}

/// Result of toggling a task's completion flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub task: Task,
    /// Change applied to the action point balance (negative when a completion
    /// was reversed).
    pub ap_delta: i64,
    /// Balance after the change.
    pub action_points: i64,
}

fn normalize_title(title: &str) -> Result<String, QuestError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(QuestError::InvalidInput("title must not be empty".into()));
    }
    Ok(title.to_string())
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(kind: TaskKind) -> Task {
        Task {
            id: "t1".into(),
            user_id: "u1".into(),
            title: "Stretch".into(),
            description: None,
            kind,
            difficulty: Difficulty::Easy,
            ap_reward: 1,
            is_complete: false,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn reward_follows_difficulty() {
        assert_eq!(Difficulty::Easy.ap_reward(), 1);
        assert_eq!(Difficulty::Medium.ap_reward(), 2);
        assert_eq!(Difficulty::Hard.ap_reward(), 3);
    }

    #[test]
    fn parse_str_accepts_wire_names() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::parse_str(t.as_str()), Some(*t));
        }
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::parse_str(d.as_str()), Some(*d));
        }
        assert_eq!(TaskType::parse_str("daily"), Some(TaskType::Recurring));
        assert_eq!(Difficulty::parse_str("legendary"), None);
    }

    #[test]
    fn recurring_kind_never_has_due_date() {
        let kind = TaskKind::new(TaskType::Recurring, Some(date("2026-01-01")));
        assert_eq!(kind, TaskKind::Recurring);
        assert_eq!(kind.due_date(), None);
    }

    #[test]
    fn task_serializes_flat_task_type() {
        let task = sample_task(TaskKind::Normal {
            due_date: Some(date("2026-03-04")),
        });
        let v = serde_json::to_value(&task).unwrap();
        assert_eq!(v["task_type"], "normal");
        assert_eq!(v["due_date"], "2026-03-04");
        assert_eq!(v["difficulty"], "easy");

        let back: Task = serde_json::from_value(v).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn recurring_payload_drops_due_date() {
        let json = r#"{"title":"Read","task_type":"recurring","due_date":"2026-01-01"}"#;
        let input: CreateTask = serde_json::from_str(json).unwrap();
        assert_eq!(input.kind, TaskKind::Recurring);
        assert_eq!(input.difficulty, Difficulty::Easy);
    }

    #[test]
    fn normalized_rejects_blank_title() {
        let err = CreateTask::recurring("   ").normalized().unwrap_err();
        assert!(matches!(err, QuestError::InvalidInput(_)));
    }

    #[test]
    fn normalized_trims_and_drops_empty_description() {
        let input = CreateTask::normal("  Taxes ", None).with_description("  ");
        let n = input.normalized().unwrap();
        assert_eq!(n.title, "Taxes");
        assert_eq!(n.description, None);
    }

    #[test]
    fn update_recomputes_reward() {
        let mut task = sample_task(TaskKind::Recurring);
        UpdateTask {
            difficulty: Some(Difficulty::Hard),
            ..Default::default()
        }
        .apply(&mut task)
        .unwrap();
        assert_eq!(task.difficulty, Difficulty::Hard);
        assert_eq!(task.ap_reward, 3);
    }

    #[test]
    fn update_to_recurring_clears_due_date() {
        let mut task = sample_task(TaskKind::Normal {
            due_date: Some(date("2026-05-05")),
        });
        UpdateTask {
            task_type: Some(TaskType::Recurring),
            ..Default::default()
        }
        .apply(&mut task)
        .unwrap();
        assert_eq!(task.kind, TaskKind::Recurring);
    }

    #[test]
    fn update_due_date_on_recurring_is_ignored() {
        let mut task = sample_task(TaskKind::Recurring);
        UpdateTask {
            due_date: Some(Some(date("2026-05-05"))),
            ..Default::default()
        }
        .apply(&mut task)
        .unwrap();
        assert_eq!(task.due_date(), None);
    }

    #[test]
    fn update_blank_title_leaves_task_untouched() {
        let mut task = sample_task(TaskKind::Recurring);
        let before = task.clone();
        let err = UpdateTask {
            title: Some(" ".into()),
            difficulty: Some(Difficulty::Hard),
            ..Default::default()
        }
        .apply(&mut task)
        .unwrap_err();
        assert!(matches!(err, QuestError::InvalidInput(_)));
        assert_eq!(task, before);
    }

    #[test]
    fn validate_checks_only_the_title() {
        assert!(UpdateTask::default().validate().is_ok());
        let blank = UpdateTask {
            title: Some("\t ".into()),
            ..Default::default()
        };
        assert!(matches!(blank.validate(), Err(QuestError::InvalidInput(_))));
        let renamed = UpdateTask {
            title: Some(" Run ".into()),
            ..Default::default()
        };
        assert!(renamed.validate().is_ok());
    }

    #[test]
    fn update_null_clears_but_missing_keeps() {
        let clear: UpdateTask = serde_json::from_str(r#"{"due_date":null}"#).unwrap();
        assert_eq!(clear.due_date, Some(None));

        let keep: UpdateTask = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(keep.due_date, None);
        assert!(!keep.is_empty());
        assert!(UpdateTask::default().is_empty());
    }

    #[test]
    fn overdue_only_for_open_normal_tasks() {
        let today = date("2026-06-10");
        let mut task = sample_task(TaskKind::Normal {
            due_date: Some(date("2026-06-09")),
        });
        assert!(task.is_overdue(today));
        task.is_complete = true;
        assert!(!task.is_overdue(today));
        assert!(!sample_task(TaskKind::Recurring).is_overdue(today));
    }
}
