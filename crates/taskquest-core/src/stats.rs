use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name shown on the stats panel when a user has no profile.
pub const DEFAULT_USERNAME: &str = "Hero";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Role-playing stats attached to a user. One row per user, created lazily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    pub level: i64,
    pub exp: i64,
    pub exp_to_next: i64,
    pub current_hp: i64,
    pub max_hp: i64,
    pub physical_attack: i64,
    pub physical_defense: i64,
    pub magical_attack: i64,
    pub magical_defense: i64,
    /// Percent chance of a critical hit.
    pub crit_rate: i64,
    pub action_points: i64,
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    /// Starting stats for a fresh adventurer.
    pub fn starting(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            level: 1,
            exp: 0,
            exp_to_next: 100,
            current_hp: 100,
            max_hp: 100,
            physical_attack: 10,
            physical_defense: 5,
            magical_attack: 8,
            magical_defense: 4,
            crit_rate: 5,
            action_points: 0,
            updated_at: now,
        }
    }

    /// HP bar fill in percent. Zero when `max_hp` is not positive.
    pub fn hp_percentage(&self) -> f64 {
        percentage(self.current_hp, self.max_hp)
    }

    /// EXP bar fill in percent. Zero when `exp_to_next` is not positive.
    pub fn exp_percentage(&self) -> f64 {
        percentage(self.exp, self.exp_to_next)
    }
}

fn percentage(value: i64, max: i64) -> f64 {
    if max <= 0 {
        return 0.0;
    }
    (value as f64 / max as f64 * 100.0).clamp(0.0, 100.0)
}
