use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DbResult;
use crate::db::models::UserId;
use crate::db::models::challenge::{
    Challenge, CompletionStatus, LeaderboardEntry, NewChallenge, UserChallenge,
};
use crate::db::models::energy::{DeviceType, EnergyReading, SmartDevice};
use crate::db::models::goal::{CommunityGoal, ContributionSummary, GoalContribution, NewCommunityGoal};
use crate::db::models::recommendation::Recommendation;
use crate::db::models::waste::{
    NewRecyclingCenter, NewWasteEntry, RecyclingCenter, WasteEntry, WasteSummaryRow,
};

/// Persistence seam for the platform. The production backend is
/// [`PgStore`](crate::db::pg::PgStore); [`MemoryStore`](crate::db::memory::MemoryStore)
/// backs the test suite.
///
/// The multi-step operations (`complete_challenge`, `record_contribution`)
/// are required to be atomic per implementation: a pair of concurrent calls
/// for the same (user, challenge) must award points at most once, and both
/// contribution aggregates must move together.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // challenges + leaderboard
    async fn insert_challenge(&self, new: &NewChallenge) -> DbResult<Challenge>;
    async fn list_challenges(&self) -> DbResult<Vec<Challenge>>;
    async fn get_challenge(&self, id: i64) -> DbResult<Option<Challenge>>;
    async fn user_challenges(&self, user: UserId) -> DbResult<Vec<UserChallenge>>;

    /// Marks the (user, challenge) pair completed and awards
    /// `challenge.points` to the user's leaderboard entry, both lazily
    /// created. Repeat calls are a no-op reported as `AlreadyCompleted`.
    async fn complete_challenge(
        &self,
        user: UserId,
        challenge: &Challenge,
        now: DateTime<Utc>,
    ) -> DbResult<CompletionStatus>;

    async fn top_leaderboard(&self, limit: i64) -> DbResult<Vec<LeaderboardEntry>>;
    async fn leaderboard_entry(&self, user: UserId) -> DbResult<Option<LeaderboardEntry>>;

    // community goals
    async fn insert_goal(&self, new: &NewCommunityGoal) -> DbResult<CommunityGoal>;
    async fn list_goals(&self) -> DbResult<Vec<CommunityGoal>>;
    async fn get_goal(&self, id: i64) -> DbResult<Option<CommunityGoal>>;

    /// Adds `amount` to both the (user, goal) contribution and the goal's
    /// running progress in one transaction, returning both aggregates as
    /// they stand afterwards. `amount` has been validated as positive.
    async fn record_contribution(
        &self,
        user: UserId,
        goal_id: i64,
        amount: f64,
        now: DateTime<Utc>,
    ) -> DbResult<ContributionSummary>;

    async fn user_contributions(&self, user: UserId) -> DbResult<Vec<GoalContribution>>;

    // recommendations
    async fn insert_recommendation(&self, user: UserId, text: &str) -> DbResult<Recommendation>;
    async fn unread_recommendations(&self, user: UserId) -> DbResult<Vec<Recommendation>>;
    async fn list_recommendations(&self, user: UserId) -> DbResult<Vec<Recommendation>>;

    /// Sets the read flag on a recommendation owned by `user`. Ownership is
    /// part of the lookup predicate; returns `false` when no owned row
    /// matches the id. Already-read rows still match (idempotent).
    async fn mark_recommendation_read(&self, user: UserId, id: i64) -> DbResult<bool>;

    // devices + readings
    async fn insert_device(
        &self,
        user: UserId,
        name: &str,
        device_type: DeviceType,
        identifier: &str,
    ) -> DbResult<SmartDevice>;
    async fn user_devices(&self, user: UserId) -> DbResult<Vec<SmartDevice>>;

    /// Records a reading against a device owned by `user`; `None` when the
    /// device does not exist or belongs to someone else.
    async fn insert_reading(
        &self,
        user: UserId,
        device_id: i64,
        energy_consumed: f64,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<Option<EnergyReading>>;

    async fn user_readings(&self, user: UserId) -> DbResult<Vec<EnergyReading>>;

    /// Sum of every reading ever recorded across the user's devices.
    async fn total_energy(&self, user: UserId) -> DbResult<f64>;
    async fn owns_device_type(&self, user: UserId, device_type: DeviceType) -> DbResult<bool>;

    // waste log + recycling centers
    async fn insert_waste_entry(
        &self,
        user: UserId,
        new: &NewWasteEntry,
        now: DateTime<Utc>,
    ) -> DbResult<WasteEntry>;
    async fn user_waste_entries(&self, user: UserId) -> DbResult<Vec<WasteEntry>>;
    async fn waste_summary(&self, user: UserId) -> DbResult<Vec<WasteSummaryRow>>;

    async fn insert_center(&self, new: &NewRecyclingCenter) -> DbResult<RecyclingCenter>;
    async fn list_centers(&self) -> DbResult<Vec<RecyclingCenter>>;
}
