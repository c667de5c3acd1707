use tracing::instrument;

use crate::db::models::UserId;
use crate::db::models::energy::DeviceType;
use crate::db::models::recommendation::{
    HIGH_USAGE_TEXT, HIGH_USAGE_THRESHOLD_KWH, Recommendation, THERMOSTAT_MISSING_TEXT,
    THERMOSTAT_OWNED_TEXT,
};
use crate::db::store::Store;
use crate::error::{AppError, AppResult};

/// Generates advisory rows for `user` from their consumption history and
/// device inventory, then returns every unread recommendation (old and new)
/// in insertion order.
///
/// The heuristic always emits exactly one thermostat line, plus the
/// high-usage line when lifetime consumption exceeds the threshold. Rows
/// are persisted on every run with no de-duplication against earlier runs.
#[instrument(skip(store), fields(user = user.0))]
pub async fn generate_recommendations<S: Store>(
    store: &S,
    user: UserId,
) -> AppResult<Vec<Recommendation>> {
    let total_energy = store.total_energy(user).await?;

    let mut texts = Vec::new();
    if total_energy > HIGH_USAGE_THRESHOLD_KWH {
        texts.push(HIGH_USAGE_TEXT);
    }

    if store.owns_device_type(user, DeviceType::Thermostat).await? {
        texts.push(THERMOSTAT_OWNED_TEXT);
    } else {
        texts.push(THERMOSTAT_MISSING_TEXT);
    }

    for text in texts {
        store.insert_recommendation(user, text).await?;
    }

    Ok(store.unread_recommendations(user).await?)
}

/// Flips the read flag on one of the caller's recommendations. A foreign or
/// unknown id is NotFound; repeating the call on an already-read row still
/// succeeds.
#[instrument(skip(store), fields(user = user.0))]
pub async fn mark_read<S: Store>(store: &S, user: UserId, recommendation_id: i64) -> AppResult<()> {
    if store.mark_recommendation_read(user, recommendation_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("Recommendation"))
    }
}
