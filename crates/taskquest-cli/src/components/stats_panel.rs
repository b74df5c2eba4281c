use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use taskquest_core::stats::{UserStats, DEFAULT_USERNAME};
use taskquest_core::task::Completion;
use taskquest_core::user::Session;
use taskquest_service::{QuestService, ServiceError};

const BAR_WIDTH: usize = 20;

/// The character sheet shown next to the board.
pub struct StatsPanel {
    service: Arc<dyn QuestService>,
    username: String,
    stats: Option<UserStats>,
    /// True when `stats` are placeholder values that were never stored.
    fallback: bool,
}

impl StatsPanel {
    pub fn new(service: Arc<dyn QuestService>) -> Self {
        Self {
            service,
            username: DEFAULT_USERNAME.to_string(),
            stats: None,
            fallback: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn stats(&self) -> Option<&UserStats> {
        self.stats.as_ref()
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Fetch the display name and the stats row. A user without a stats row
    /// gets one created. Any other failure leaves the panel showing default
    /// values, so this never fails.
    pub async fn load(&mut self, session: &Session) {
        self.username = match self.service.get_profile(session).await {
            Ok(profile) => profile.username,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load profile");
                DEFAULT_USERNAME.to_string()
            }
        };

        match self.fetch_or_create_stats(session).await {
            Ok(stats) => {
                self.stats = Some(stats);
                self.fallback = false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load stats, showing defaults");
                self.stats = Some(UserStats::starting(session.user.id.clone(), Utc::now()));
                self.fallback = true;
            }
        }
    }

    async fn fetch_or_create_stats(&self, session: &Session) -> Result<UserStats, ServiceError> {
        match self.service.get_stats(session).await {
            Err(ServiceError::NotFound(_)) => {
                tracing::info!(user_id = %session.user.id, "creating stats row");
                self.service.create_stats(session).await?;
                self.service.get_stats(session).await
            }
            other => other,
        }
    }

    /// Patch the action point balance after a toggle without reloading.
    pub fn apply_completion(&mut self, completion: &Completion) {
        if let Some(stats) = &mut self.stats {
            stats.action_points = completion.action_points;
        }
    }

    pub fn hp_percentage(&self) -> f64 {
        self.stats.as_ref().map_or(0.0, UserStats::hp_percentage)
    }

    pub fn exp_percentage(&self) -> f64 {
        self.stats.as_ref().map_or(0.0, UserStats::exp_percentage)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let Some(s) = &self.stats else {
            let _ = writeln!(out, "{}\n  (stats not loaded)", self.username);
            return out;
        };
        let _ = writeln!(out, "{}  Lv {}", self.username, s.level);
        let _ = writeln!(
            out,
            "  HP  {} {}/{}",
            bar(self.hp_percentage()),
            s.current_hp,
            s.max_hp
        );
        let _ = writeln!(
            out,
            "  EXP {} {}/{}",
            bar(self.exp_percentage()),
            s.exp,
            s.exp_to_next
        );
        let _ = writeln!(
            out,
            "  P.ATK {:<4} P.DEF {:<4} M.ATK {:<4} M.DEF {:<4} CRIT {}%",
            s.physical_attack, s.physical_defense, s.magical_attack, s.magical_defense, s.crit_rate
        );
        let _ = writeln!(out, "  Action Points: {}", s.action_points);
        if self.fallback {
            let _ = writeln!(out, "  (offline: showing default stats)");
        }
        out
    }
}

fn bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}
