use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Base challenge table model. Challenges are created by an administrator
/// and are immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Challenge {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    /// Active window is inclusive on both ends.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub points: i64,
}

/// Per-user completion state, created lazily on the first completion
/// attempt. At most one row per (user, challenge) pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserChallenge {
    pub id: i64,
    pub user_id: UserId,
    pub challenge_id: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub points: i64,
}

/// Outcome of a completion attempt on an active challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStatus {
    /// First completion for this (user, challenge) pair; points were awarded.
    Completed { points_awarded: i64, total: i64 },
    /// The pair was already completed; nothing was awarded.
    AlreadyCompleted,
}
