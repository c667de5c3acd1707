use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Base community goal table model. `current_progress` is a stored running
/// total over all contributions recorded against the goal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommunityGoal {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub target_energy_reduction: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub current_progress: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCommunityGoal {
    pub title: String,
    pub description: String,
    pub target_energy_reduction: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Per-user accumulated contribution, unique per (user, goal).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GoalContribution {
    pub id: i64,
    pub user_id: UserId,
    pub goal_id: i64,
    pub energy_contributed: f64,
    pub updated_at: DateTime<Utc>,
}

/// Both aggregates as they stand after a contribution is recorded.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContributionSummary {
    pub energy_contributed: f64,
    pub current_progress: f64,
    pub target_energy_reduction: f64,
}
