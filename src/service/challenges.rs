use chrono::Utc;
use tracing::{info, instrument};

use crate::db::models::UserId;
use crate::db::models::challenge::{CompletionStatus, LeaderboardEntry};
use crate::db::store::Store;
use crate::error::{AppError, AppResult};

/// Marks a challenge completed for `user` and awards its points once.
///
/// The challenge must exist and the current time must lie inside its
/// [start, end] window, inclusive. A repeat call for an already-completed
/// pair is a success-shaped no-op; points are awarded at most once per
/// (user, challenge) regardless of call interleaving, which the store
/// backends guarantee with a conditional upsert.
#[instrument(skip(store), fields(user = user.0))]
pub async fn complete_challenge<S: Store>(
    store: &S,
    user: UserId,
    challenge_id: i64,
) -> AppResult<CompletionStatus> {
    let challenge = store
        .get_challenge(challenge_id)
        .await?
        .ok_or(AppError::NotFound("Challenge"))?;

    let now = Utc::now();
    if !challenge.is_active_at(now) {
        return Err(AppError::InvalidState("Challenge is not active.".into()));
    }

    let status = store.complete_challenge(user, &challenge, now).await?;

    if let CompletionStatus::Completed { points_awarded, total } = &status {
        info!(points_awarded, total, "challenge completed, points awarded");
    }

    Ok(status)
}

/// Highest point totals, descending. Tie order among equal totals is left
/// to the store.
#[instrument(skip(store))]
pub async fn top_leaderboard<S: Store>(store: &S, limit: i64) -> AppResult<Vec<LeaderboardEntry>> {
    Ok(store.top_leaderboard(limit).await?)
}
