use serde::{Deserialize, Serialize};

pub mod challenge;
pub mod energy;
pub mod goal;
pub mod recommendation;
pub mod waste;

/// Identifies an account in the external identity store. Account management
/// itself lives outside this service; rows here only carry the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[inline]
const fn default_leaderboard_limit() -> i64 {
    10
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: i64,
}
