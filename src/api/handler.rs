use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::api::middleware::admin::AdminIdent;
use crate::api::middleware::identity::Identity;
use crate::api::server::{AppState, JsonResult};
use crate::db::models::LeaderboardQuery;
use crate::db::models::challenge::{
    Challenge, CompletionStatus, LeaderboardEntry, NewChallenge, UserChallenge,
};
use crate::db::models::energy::{EnergyReading, NewEnergyReading, NewSmartDevice, SmartDevice};
use crate::db::models::goal::{CommunityGoal, GoalContribution, NewCommunityGoal};
use crate::db::models::recommendation::Recommendation;
use crate::db::models::waste::{
    NewRecyclingCenter, NewWasteEntry, RecyclingCenter, WasteEntry, WasteSummaryRow,
};
use crate::db::store::Store;
use crate::error::AppError;
use crate::service::{challenges, goals, recommendations};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<i64>,
}

impl MessageResponse {
    fn new(message: &'static str) -> Self {
        Self {
            message,
            points_awarded: None,
        }
    }
}

//
// challenges + leaderboard

#[instrument(skip(state))]
pub async fn list_challenges<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<Challenge>> {
    Ok(Json(state.store.list_challenges().await?))
}

#[instrument(skip(state, new), fields(title = %new.title))]
pub async fn create_challenge<S: Store>(
    _admin: AdminIdent,
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewChallenge>,
) -> JsonResult<Challenge> {
    if new.points <= 0 {
        return Err(AppError::InvalidArgument(
            "points must be a positive integer.".into(),
        ));
    }
    if new.start_date >= new.end_date {
        return Err(AppError::InvalidArgument(
            "start_date must precede end_date.".into(),
        ));
    }

    Ok(Json(state.store.insert_challenge(&new).await?))
}

#[instrument(skip(state))]
pub async fn my_challenges<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<UserChallenge>> {
    Ok(Json(state.store.user_challenges(user).await?))
}

#[instrument(skip(state))]
pub async fn complete_challenge<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
    Path(challenge_id): Path<i64>,
) -> JsonResult<MessageResponse> {
    let status = challenges::complete_challenge(&state.store, user, challenge_id).await?;

    Ok(Json(match status {
        CompletionStatus::Completed { points_awarded, .. } => MessageResponse {
            message: "Challenge completed successfully!",
            points_awarded: Some(points_awarded),
        },
        CompletionStatus::AlreadyCompleted => MessageResponse::new("Challenge already completed."),
    }))
}

#[instrument(skip(state))]
pub async fn leaderboard<S: Store>(
    Query(query): Query<LeaderboardQuery>,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<LeaderboardEntry>> {
    Ok(Json(
        challenges::top_leaderboard(&state.store, query.limit).await?,
    ))
}

//
// community goals

#[instrument(skip(state))]
pub async fn list_goals<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<CommunityGoal>> {
    Ok(Json(state.store.list_goals().await?))
}

#[instrument(skip(state, new), fields(title = %new.title))]
pub async fn create_goal<S: Store>(
    _admin: AdminIdent,
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewCommunityGoal>,
) -> JsonResult<CommunityGoal> {
    if !(new.target_energy_reduction > 0.0) {
        return Err(AppError::InvalidArgument(
            "target_energy_reduction must be a positive number.".into(),
        ));
    }
    if new.start_date >= new.end_date {
        return Err(AppError::InvalidArgument(
            "start_date must precede end_date.".into(),
        ));
    }

    Ok(Json(state.store.insert_goal(&new).await?))
}

#[derive(Debug, Deserialize)]
pub struct ContributionBody {
    #[serde(default)]
    pub energy_reduced: Option<serde_json::Value>,
}

#[instrument(skip(state, body))]
pub async fn contribute_to_goal<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
    Path(goal_id): Path<i64>,
    Json(body): Json<ContributionBody>,
) -> JsonResult<MessageResponse> {
    goals::contribute_to_goal(&state.store, user, goal_id, body.energy_reduced.as_ref()).await?;

    Ok(Json(MessageResponse::new(
        "Energy contribution updated successfully.",
    )))
}

#[instrument(skip(state))]
pub async fn my_contributions<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<GoalContribution>> {
    Ok(Json(state.store.user_contributions(user).await?))
}

//
// recommendations

#[instrument(skip(state))]
pub async fn list_recommendations<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<Recommendation>> {
    Ok(Json(state.store.list_recommendations(user).await?))
}

#[instrument(skip(state))]
pub async fn generate_recommendations<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<Recommendation>> {
    Ok(Json(
        recommendations::generate_recommendations(&state.store, user).await?,
    ))
}

#[instrument(skip(state))]
pub async fn mark_recommendation_read<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
    Path(recommendation_id): Path<i64>,
) -> JsonResult<MessageResponse> {
    recommendations::mark_read(&state.store, user, recommendation_id).await?;

    Ok(Json(MessageResponse::new("Recommendation marked as read.")))
}

//
// devices + readings

#[instrument(skip(state))]
pub async fn list_devices<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<SmartDevice>> {
    Ok(Json(state.store.user_devices(user).await?))
}

#[instrument(skip(state, new), fields(name = %new.device_name))]
pub async fn register_device<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewSmartDevice>,
) -> JsonResult<SmartDevice> {
    let identifier = new
        .device_identifier
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(Json(
        state
            .store
            .insert_device(user, &new.device_name, new.device_type, &identifier)
            .await?,
    ))
}

#[instrument(skip(state, new))]
pub async fn record_reading<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
    Path(device_id): Path<i64>,
    Json(new): Json<NewEnergyReading>,
) -> JsonResult<EnergyReading> {
    let recorded_at = new.recorded_at.unwrap_or_else(Utc::now);
    let reading = state
        .store
        .insert_reading(user, device_id, new.energy_consumed, recorded_at)
        .await?
        .ok_or(AppError::NotFound("Smart Home Device"))?;

    Ok(Json(reading))
}

#[instrument(skip(state))]
pub async fn list_readings<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<EnergyReading>> {
    Ok(Json(state.store.user_readings(user).await?))
}

//
// waste log + recycling centers

#[instrument(skip(state))]
pub async fn list_waste_entries<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<WasteEntry>> {
    Ok(Json(state.store.user_waste_entries(user).await?))
}

#[instrument(skip(state, new))]
pub async fn log_waste_entry<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewWasteEntry>,
) -> JsonResult<WasteEntry> {
    if !(new.quantity > 0.0) {
        return Err(AppError::InvalidArgument(
            "quantity must be a positive number.".into(),
        ));
    }

    Ok(Json(
        state.store.insert_waste_entry(user, &new, Utc::now()).await?,
    ))
}

#[instrument(skip(state))]
pub async fn waste_summary<S: Store>(
    Identity(user): Identity,
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<WasteSummaryRow>> {
    Ok(Json(state.store.waste_summary(user).await?))
}

#[instrument(skip(state))]
pub async fn list_centers<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> JsonResult<Vec<RecyclingCenter>> {
    Ok(Json(state.store.list_centers().await?))
}

#[instrument(skip(state, new), fields(name = %new.name))]
pub async fn create_center<S: Store>(
    _admin: AdminIdent,
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewRecyclingCenter>,
) -> JsonResult<RecyclingCenter> {
    Ok(Json(state.store.insert_center(&new).await?))
}
