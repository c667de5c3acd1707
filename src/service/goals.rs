use chrono::Utc;
use tracing::{info, instrument};

use crate::db::models::UserId;
use crate::db::models::goal::ContributionSummary;
use crate::db::models::recommendation::{GOAL_PROGRESS_TEXT, GOAL_PROGRESS_THRESHOLD};
use crate::db::store::Store;
use crate::error::{AppError, AppResult};

/// Parses the wire-level contribution amount. The field arrives as
/// arbitrary JSON; numbers and numeric strings are accepted, anything else
/// (or anything not strictly positive) is an InvalidArgument.
pub fn parse_amount(raw: Option<&serde_json::Value>) -> AppResult<f64> {
    let raw = raw.ok_or_else(|| {
        AppError::InvalidArgument("Please provide energy_reduced value.".into())
    })?;

    let amount = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(v) if v > 0.0 && v.is_finite() => Ok(v),
        _ => Err(AppError::InvalidArgument(
            "energy_reduced must be a positive number.".into(),
        )),
    }
}

/// Adds the submitted amount to the caller's accumulated contribution and
/// to the goal's running progress, atomically. Whenever the updated
/// progress sits at or above 75% of the target a congratulation
/// recommendation is created for the contributor, on every such call, with
/// no already-notified guard.
///
/// The goal lookup runs before amount validation, so an unknown goal is
/// NotFound even when the amount is also bad.
#[instrument(skip(store, amount_raw), fields(user = user.0, goal = goal_id))]
pub async fn contribute_to_goal<S: Store>(
    store: &S,
    user: UserId,
    goal_id: i64,
    amount_raw: Option<&serde_json::Value>,
) -> AppResult<ContributionSummary> {
    store
        .get_goal(goal_id)
        .await?
        .ok_or(AppError::NotFound("Community Energy Goal"))?;

    let amount = parse_amount(amount_raw)?;

    let summary = store
        .record_contribution(user, goal_id, amount, Utc::now())
        .await?;

    if summary.current_progress >= GOAL_PROGRESS_THRESHOLD * summary.target_energy_reduction {
        store.insert_recommendation(user, GOAL_PROGRESS_TEXT).await?;
        info!(
            progress = summary.current_progress,
            target = summary.target_energy_reduction,
            "goal progress threshold reached, congratulation queued"
        );
    }

    Ok(summary)
}
