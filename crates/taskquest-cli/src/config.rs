use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use taskquest_core::task::{Difficulty, TaskType};

#[derive(Debug, Parser)]
#[command(name = "taskquest", about = "Gamified to-do list: finish tasks, earn action points")]
pub struct Cli {
    /// Server URL
    #[arg(long, env = "TASKQUEST_SERVER_URL", default_value = "http://127.0.0.1:3710")]
    pub server: String,

    /// Where the signed-in session is kept
    #[arg(long, env = "TASKQUEST_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(taskquest_db::data_dir)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "TASKQUEST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with e-mail and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKQUEST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show daily and normal tasks
    List {
        /// Only daily (recurring) tasks
        #[arg(long, conflicts_with = "normal")]
        daily: bool,
        /// Only normal tasks
        #[arg(long)]
        normal: bool,
    },
    /// Add a task
    Add(AddArgs),
    /// Edit a task
    Edit(EditArgs),
    /// Mark a task complete, or reopen it
    Toggle {
        /// Task id or unique id prefix
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task id or unique id prefix
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Show the character stats panel
    Stats,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// daily (recurring) or normal
    #[arg(long = "type", value_parser = parse_task_type, default_value = "daily")]
    pub task_type: TaskType,
    /// easy, medium or hard
    #[arg(long, value_parser = parse_difficulty, default_value = "easy")]
    pub difficulty: Difficulty,
    /// Due date (YYYY-MM-DD), normal tasks only
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Task id or unique id prefix
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    #[arg(long)]
    pub clear_description: bool,
    #[arg(long = "type", value_parser = parse_task_type)]
    pub task_type: Option<TaskType>,
    #[arg(long, value_parser = parse_difficulty)]
    pub difficulty: Option<Difficulty>,
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,
    #[arg(long)]
    pub clear_due: bool,
}

fn parse_task_type(s: &str) -> Result<TaskType, String> {
    TaskType::parse_str(&s.to_lowercase())
        .ok_or_else(|| format!("expected daily or normal, got {s:?}"))
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::parse_str(&s.to_lowercase())
        .ok_or_else(|| format!("expected easy, medium or hard, got {s:?}"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{s:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_defaults_to_easy_daily() {
        let cli = Cli::try_parse_from(["taskquest", "add", "Stretch"]).unwrap();
        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.task_type, TaskType::Recurring);
        assert_eq!(args.difficulty, Difficulty::Easy);
        assert_eq!(args.due, None);
    }

    #[test]
    fn add_parses_normal_with_due_date() {
        let cli = Cli::try_parse_from([
            "taskquest",
            "--server",
            "http://example.test",
            "add",
            "Taxes",
            "--type",
            "normal",
            "--difficulty",
            "Hard",
            "--due",
            "2026-04-15",
        ])
        .unwrap();
        assert_eq!(cli.server, "http://example.test");
        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.task_type, TaskType::Normal);
        assert_eq!(args.difficulty, Difficulty::Hard);
        assert_eq!(args.due, NaiveDate::from_ymd_opt(2026, 4, 15));
    }

    #[test]
    fn rejects_unknown_difficulty_and_bad_date() {
        assert!(Cli::try_parse_from(["taskquest", "add", "x", "--difficulty", "epic"]).is_err());
        assert!(Cli::try_parse_from(["taskquest", "add", "x", "--due", "tomorrow"]).is_err());
    }

    #[test]
    fn edit_conflicting_flags_are_rejected() {
        assert!(Cli::try_parse_from([
            "taskquest", "edit", "abc", "--due", "2026-01-01", "--clear-due"
        ])
        .is_err());
    }

    #[test]
    fn list_views_are_exclusive() {
        assert!(Cli::try_parse_from(["taskquest", "list", "--daily", "--normal"]).is_err());
    }
}
