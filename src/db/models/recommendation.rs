use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Advisory message shown to its owner until marked read. Read state only
/// ever transitions false to true.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recommendation {
    pub id: i64,
    pub user_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

pub const GOAL_PROGRESS_TEXT: &str =
    "Great job! You're helping the community reach 75% of our energy reduction goal. Keep it up!";

pub const HIGH_USAGE_TEXT: &str =
    "Consider using energy-efficient appliances to reduce your consumption.";

pub const THERMOSTAT_OWNED_TEXT: &str =
    "Optimize your thermostat settings to save energy during peak hours.";

pub const THERMOSTAT_MISSING_TEXT: &str =
    "Consider installing a smart thermostat for better energy management.";

/// Total consumption above which the high-usage advisory is generated, in
/// kWh summed over every reading the user's devices have ever reported.
pub const HIGH_USAGE_THRESHOLD_KWH: f64 = 100.0;

/// Fraction of a goal's target at which the congratulation advisory fires.
pub const GOAL_PROGRESS_THRESHOLD: f64 = 0.75;
