use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use taskquest_core::task::{CreateTask, Task, TaskKind, TaskType, UpdateTask};
use taskquest_core::user::{Credentials, Session, SignUp};
use taskquest_service::{QuestService, ServiceError};

use crate::components::stats_panel::StatsPanel;
use crate::components::task_board::{render_task, TaskBoard};
use crate::config::{AddArgs, Command, EditArgs};
use crate::session::{SessionFile, SessionProvider};

/// Asked before a task is deleted. Returns whether to go ahead.
pub type ConfirmFn = Box<dyn FnMut(&Task) -> bool + Send>;

/// One CLI invocation: restores the saved session, runs a command, and
/// writes what the user should see to `out`.
pub struct App {
    sessions: SessionProvider,
    board: TaskBoard,
    panel: StatsPanel,
    session_file: SessionFile,
    confirm: ConfirmFn,
}

impl App {
    pub fn new(service: Arc<dyn QuestService>, session_file: SessionFile, confirm: ConfirmFn) -> Self {
        Self {
            sessions: SessionProvider::new(service.clone()),
            board: TaskBoard::new(service.clone()),
            panel: StatsPanel::new(service),
            session_file,
            confirm,
        }
    }

    pub async fn run<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Register {
                email,
                username,
                password,
            } => {
                let session = self
                    .sessions
                    .sign_up(&SignUp {
                        email,
                        password,
                        username,
                    })
                    .await
                    .map_err(user_facing)?;
                self.session_file.save(&session)?;
                writeln!(out, "Welcome, adventurer! Signed in as {}", session.user.email)?;
            }
            Command::Login { email, password } => {
                let session = self
                    .sessions
                    .sign_in(&Credentials { email, password })
                    .await
                    .map_err(user_facing)?;
                self.session_file.save(&session)?;
                writeln!(out, "Signed in as {}", session.user.email)?;
            }
            Command::Logout => {
                // The local session is forgotten even if the server is unreachable.
                let restored = self.restore().await;
                let result = self.sessions.sign_out().await;
                self.session_file.clear()?;
                restored?;
                result.map_err(user_facing)?;
                writeln!(out, "Signed out")?;
            }
            Command::Whoami => {
                let session = self.signed_in().await?;
                writeln!(out, "{} ({})", session.user.email, session.user.id)?;
                writeln!(
                    out,
                    "session expires {}",
                    session.expires_at.format("%Y-%m-%d %H:%M UTC")
                )?;
            }
            Command::List { daily, normal } => {
                let session = self.signed_in().await?;
                self.board.load(&session).await.map_err(user_facing)?;
                let only = match (daily, normal) {
                    (true, _) => Some(TaskType::Recurring),
                    (_, true) => Some(TaskType::Normal),
                    _ => None,
                };
                write!(out, "{}", self.board.render(Utc::now().date_naive(), only))?;
            }
            Command::Add(args) => {
                let session = self.signed_in().await?;
                let draft = draft_from(args);
                let task = self.board.add(&session, &draft).await.map_err(user_facing)?;
                writeln!(out, "Added {}", render_task(task, Utc::now().date_naive()))?;
            }
            Command::Edit(args) => {
                let session = self.signed_in().await?;
                self.board.load(&session).await.map_err(user_facing)?;
                let id = self.board.resolve(&args.id).map_err(user_facing)?.id.clone();
                let patch = patch_from(args);
                if patch.is_empty() {
                    bail!("nothing to change");
                }
                let task = self
                    .board
                    .update(&session, &id, &patch)
                    .await
                    .map_err(user_facing)?;
                writeln!(out, "Updated {}", render_task(task, Utc::now().date_naive()))?;
            }
            Command::Toggle { id } => {
                let session = self.signed_in().await?;
                self.board.load(&session).await.map_err(user_facing)?;
                let id = self.board.resolve(&id).map_err(user_facing)?.id.clone();
                let completion = self
                    .board
                    .toggle_complete(&session, &id)
                    .await
                    .map_err(user_facing)?;
                self.panel.apply_completion(&completion);
                let verb = if completion.task.is_complete {
                    "Completed"
                } else {
                    "Reopened"
                };
                writeln!(
                    out,
                    "{verb} {} ({:+} AP, balance {})",
                    completion.task.title, completion.ap_delta, completion.action_points
                )?;
            }
            Command::Delete { id, yes } => {
                let session = self.signed_in().await?;
                self.board.load(&session).await.map_err(user_facing)?;
                let task_id = self.board.resolve(&id).map_err(user_facing)?.id.clone();
                let confirm = &mut self.confirm;
                let deleted = self
                    .board
                    .delete(&session, &task_id, |task| yes || confirm(task))
                    .await
                    .map_err(user_facing)?;
                if deleted {
                    writeln!(out, "Deleted")?;
                } else {
                    writeln!(out, "Kept")?;
                }
            }
            Command::Stats => {
                let session = self.signed_in().await?;
                self.panel.load(&session).await;
                write!(out, "{}", self.panel.render())?;
            }
        }
        Ok(())
    }

    async fn restore(&mut self) -> Result<()> {
        let saved = self.session_file.load()?;
        let had_saved = saved.is_some();
        self.sessions.restore(saved).await.map_err(user_facing)?;
        if had_saved && self.sessions.session().is_none() {
            tracing::info!("saved session no longer valid");
            self.session_file.clear()?;
        }
        Ok(())
    }

    /// The "protected route" guard: every task and stats command needs a
    /// valid session.
    async fn signed_in(&mut self) -> Result<Session> {
        self.restore().await?;
        match self.sessions.require() {
            Ok(session) => Ok(session),
            Err(_) => bail!("not signed in; run `taskquest login` first"),
        }
    }
}

fn user_facing(e: ServiceError) -> anyhow::Error {
    anyhow::anyhow!("{}", e.message())
}

fn draft_from(args: AddArgs) -> CreateTask {
    CreateTask {
        title: args.title,
        description: args.description,
        kind: TaskKind::new(args.task_type, args.due),
        difficulty: args.difficulty,
    }
}

fn patch_from(args: EditArgs) -> UpdateTask {
    UpdateTask {
        title: args.title,
        description: if args.clear_description {
            Some(None)
        } else {
            args.description.map(Some)
        },
        difficulty: args.difficulty,
        task_type: args.task_type,
        due_date: if args.clear_due {
            Some(None)
        } else {
            args.due.map(Some)
        },
    }
}

#[cfg(test)]
mod tests {
    use taskquest_core::task::Difficulty;

    use super::*;

    fn edit_args(id: &str) -> EditArgs {
        EditArgs {
            id: id.into(),
            title: None,
            description: None,
            clear_description: false,
            task_type: None,
            difficulty: None,
            due: None,
            clear_due: false,
        }
    }

    #[test]
    fn draft_for_daily_task_ignores_due_date() {
        let draft = draft_from(AddArgs {
            title: "Stretch".into(),
            description: None,
            task_type: TaskType::Recurring,
            difficulty: Difficulty::Medium,
            due: chrono::NaiveDate::from_ymd_opt(2026, 1, 1),
        });
        assert_eq!(draft.kind, TaskKind::Recurring);
        assert_eq!(draft.difficulty, Difficulty::Medium);
    }

    #[test]
    fn patch_distinguishes_clear_from_untouched() {
        assert!(patch_from(edit_args("a")).is_empty());

        let mut args = edit_args("a");
        args.clear_due = true;
        args.clear_description = true;
        let patch = patch_from(args);
        assert_eq!(patch.due_date, Some(None));
        assert_eq!(patch.description, Some(None));

        let mut args = edit_args("a");
        args.description = Some("new".into());
        assert_eq!(patch_from(args).description, Some(Some("new".into())));
    }
}
