use chrono::{DateTime, Utc};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

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
use crate::db::store::Store;
use crate::db::{DbError, DbResult};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Production store over a Postgres pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> DbResult<()> {
        MIGRATOR.run(&self.pool).await.map_err(DbError::from)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self, new), fields(title = %new.title))]
    async fn insert_challenge(&self, new: &NewChallenge) -> DbResult<Challenge> {
        let challenge = sqlx::query_as::<_, Challenge>(
            r#"
            INSERT INTO challenges (title, description, start_date, end_date, points)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, start_date, end_date, points, created_at
            "#,
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.points)
        .fetch_one(&self.pool)
        .await?;

        Ok(challenge)
    }

    #[instrument(skip(self))]
    async fn list_challenges(&self) -> DbResult<Vec<Challenge>> {
        Ok(sqlx::query_as::<_, Challenge>(
            r#"
            SELECT id, title, description, start_date, end_date, points, created_at
            FROM challenges
            ORDER BY start_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn get_challenge(&self, id: i64) -> DbResult<Option<Challenge>> {
        Ok(sqlx::query_as::<_, Challenge>(
            r#"
            SELECT id, title, description, start_date, end_date, points, created_at
            FROM challenges
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn user_challenges(&self, user: UserId) -> DbResult<Vec<UserChallenge>> {
        Ok(sqlx::query_as::<_, UserChallenge>(
            r#"
            SELECT id, user_id, challenge_id, completed, completed_at
            FROM user_challenges
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self, challenge), fields(user = user.0, challenge = challenge.id))]
    async fn complete_challenge(
        &self,
        user: UserId,
        challenge: &Challenge,
        now: DateTime<Utc>,
    ) -> DbResult<CompletionStatus> {
        let mut tx = self.pool.begin().await?;

        // The conditional upsert only yields a row on the completed=false
        // path, so the award below runs at most once per pair even under
        // concurrent duplicate requests.
        let newly_completed = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO user_challenges (user_id, challenge_id, completed, completed_at)
            VALUES ($1, $2, TRUE, $3)
            ON CONFLICT (user_id, challenge_id) DO UPDATE
            SET completed = TRUE,
                completed_at = EXCLUDED.completed_at
            WHERE user_challenges.completed = FALSE
            RETURNING completed_at
            "#,
        )
        .bind(user)
        .bind(challenge.id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        if newly_completed.is_none() {
            tx.rollback().await?;
            return Ok(CompletionStatus::AlreadyCompleted);
        }

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO leaderboard_entries (user_id, points)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET points = leaderboard_entries.points + $2
            RETURNING points
            "#,
        )
        .bind(user)
        .bind(challenge.points)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CompletionStatus::Completed {
            points_awarded: challenge.points,
            total,
        })
    }

    #[instrument(skip(self))]
    async fn top_leaderboard(&self, limit: i64) -> DbResult<Vec<LeaderboardEntry>> {
        Ok(sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT user_id, points
            FROM leaderboard_entries
            ORDER BY points DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn leaderboard_entry(&self, user: UserId) -> DbResult<Option<LeaderboardEntry>> {
        Ok(sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT user_id, points
            FROM leaderboard_entries
            WHERE user_id = $1
            "#,
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await?)
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    async fn insert_goal(&self, new: &NewCommunityGoal) -> DbResult<CommunityGoal> {
        Ok(sqlx::query_as::<_, CommunityGoal>(
            r#"
            INSERT INTO community_goals
                (title, description, target_energy_reduction, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, target_energy_reduction,
                      start_date, end_date, current_progress
            "#,
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.target_energy_reduction)
        .bind(new.start_date)
        .bind(new.end_date)
        .fetch_one(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn list_goals(&self) -> DbResult<Vec<CommunityGoal>> {
        Ok(sqlx::query_as::<_, CommunityGoal>(
            r#"
            SELECT id, title, description, target_energy_reduction,
                   start_date, end_date, current_progress
            FROM community_goals
            ORDER BY start_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn get_goal(&self, id: i64) -> DbResult<Option<CommunityGoal>> {
        Ok(sqlx::query_as::<_, CommunityGoal>(
            r#"
            SELECT id, title, description, target_energy_reduction,
                   start_date, end_date, current_progress
            FROM community_goals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    #[instrument(skip(self), fields(user = user.0, goal = goal_id))]
    async fn record_contribution(
        &self,
        user: UserId,
        goal_id: i64,
        amount: f64,
        now: DateTime<Utc>,
    ) -> DbResult<ContributionSummary> {
        let mut tx = self.pool.begin().await?;

        let energy_contributed = sqlx::query_scalar::<_, f64>(
            r#"
            INSERT INTO goal_contributions (user_id, goal_id, energy_contributed, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, goal_id) DO UPDATE
            SET energy_contributed = goal_contributions.energy_contributed + $3,
                updated_at = $4
            RETURNING energy_contributed
            "#,
        )
        .bind(user)
        .bind(goal_id)
        .bind(amount)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let (current_progress, target_energy_reduction) = sqlx::query_as::<_, (f64, f64)>(
            r#"
            UPDATE community_goals
            SET current_progress = current_progress + $2
            WHERE id = $1
            RETURNING current_progress, target_energy_reduction
            "#,
        )
        .bind(goal_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ContributionSummary {
            energy_contributed,
            current_progress,
            target_energy_reduction,
        })
    }

    #[instrument(skip(self))]
    async fn user_contributions(&self, user: UserId) -> DbResult<Vec<GoalContribution>> {
        Ok(sqlx::query_as::<_, GoalContribution>(
            r#"
            SELECT id, user_id, goal_id, energy_contributed, updated_at
            FROM goal_contributions
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self, text))]
    async fn insert_recommendation(&self, user: UserId, text: &str) -> DbResult<Recommendation> {
        Ok(sqlx::query_as::<_, Recommendation>(
            r#"
            INSERT INTO recommendations (user_id, text)
            VALUES ($1, $2)
            RETURNING id, user_id, text, created_at, is_read
            "#,
        )
        .bind(user)
        .bind(text)
        .fetch_one(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn unread_recommendations(&self, user: UserId) -> DbResult<Vec<Recommendation>> {
        Ok(sqlx::query_as::<_, Recommendation>(
            r#"
            SELECT id, user_id, text, created_at, is_read
            FROM recommendations
            WHERE user_id = $1 AND is_read = FALSE
            ORDER BY created_at, id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn list_recommendations(&self, user: UserId) -> DbResult<Vec<Recommendation>> {
        Ok(sqlx::query_as::<_, Recommendation>(
            r#"
            SELECT id, user_id, text, created_at, is_read
            FROM recommendations
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn mark_recommendation_read(&self, user: UserId, id: i64) -> DbResult<bool> {
        // Ownership lives in the predicate: a foreign id updates nothing and
        // is indistinguishable from a missing one.
        let updated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE recommendations
            SET is_read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated.is_some())
    }

    #[instrument(skip(self, name, identifier))]
    async fn insert_device(
        &self,
        user: UserId,
        name: &str,
        device_type: DeviceType,
        identifier: &str,
    ) -> DbResult<SmartDevice> {
        Ok(sqlx::query_as::<_, SmartDevice>(
            r#"
            INSERT INTO devices (user_id, device_name, device_type, device_identifier)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, device_name, device_type, device_identifier,
                      is_active, last_sync
            "#,
        )
        .bind(user)
        .bind(name)
        .bind(device_type)
        .bind(identifier)
        .fetch_one(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn user_devices(&self, user: UserId) -> DbResult<Vec<SmartDevice>> {
        Ok(sqlx::query_as::<_, SmartDevice>(
            r#"
            SELECT id, user_id, device_name, device_type, device_identifier,
                   is_active, last_sync
            FROM devices
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self), fields(user = user.0, device = device_id))]
    async fn insert_reading(
        &self,
        user: UserId,
        device_id: i64,
        energy_consumed: f64,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<Option<EnergyReading>> {
        // INSERT .. SELECT keeps the ownership check and the write in one
        // statement; a foreign or unknown device inserts nothing.
        Ok(sqlx::query_as::<_, EnergyReading>(
            r#"
            INSERT INTO energy_readings (device_id, energy_consumed, recorded_at)
            SELECT d.id, $3, $4
            FROM devices d
            WHERE d.id = $1 AND d.user_id = $2
            RETURNING id, device_id, recorded_at, energy_consumed
            "#,
        )
        .bind(device_id)
        .bind(user)
        .bind(energy_consumed)
        .bind(recorded_at)
        .fetch_optional(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn user_readings(&self, user: UserId) -> DbResult<Vec<EnergyReading>> {
        Ok(sqlx::query_as::<_, EnergyReading>(
            r#"
            SELECT r.id, r.device_id, r.recorded_at, r.energy_consumed
            FROM energy_readings r
            JOIN devices d ON r.device_id = d.id
            WHERE d.user_id = $1
            ORDER BY r.recorded_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn total_energy(&self, user: UserId) -> DbResult<f64> {
        Ok(sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(r.energy_consumed), 0)
            FROM energy_readings r
            JOIN devices d ON r.device_id = d.id
            WHERE d.user_id = $1
            "#,
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn owns_device_type(&self, user: UserId, device_type: DeviceType) -> DbResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM devices
                WHERE user_id = $1 AND device_type = $2
            )
            "#,
        )
        .bind(user)
        .bind(device_type)
        .fetch_one(&self.pool)
        .await?)
    }

    #[instrument(skip(self, new))]
    async fn insert_waste_entry(
        &self,
        user: UserId,
        new: &NewWasteEntry,
        now: DateTime<Utc>,
    ) -> DbResult<WasteEntry> {
        Ok(sqlx::query_as::<_, WasteEntry>(
            r#"
            INSERT INTO waste_entries (user_id, waste_type, quantity, logged_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, waste_type, quantity, logged_at
            "#,
        )
        .bind(user)
        .bind(new.waste_type)
        .bind(new.quantity)
        .bind(new.logged_at.unwrap_or(now))
        .fetch_one(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn user_waste_entries(&self, user: UserId) -> DbResult<Vec<WasteEntry>> {
        Ok(sqlx::query_as::<_, WasteEntry>(
            r#"
            SELECT id, user_id, waste_type, quantity, logged_at
            FROM waste_entries
            WHERE user_id = $1
            ORDER BY logged_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn waste_summary(&self, user: UserId) -> DbResult<Vec<WasteSummaryRow>> {
        Ok(sqlx::query_as::<_, WasteSummaryRow>(
            r#"
            SELECT waste_type, SUM(quantity) AS total_quantity
            FROM waste_entries
            WHERE user_id = $1
            GROUP BY waste_type
            ORDER BY waste_type
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    async fn insert_center(&self, new: &NewRecyclingCenter) -> DbResult<RecyclingCenter> {
        Ok(sqlx::query_as::<_, RecyclingCenter>(
            r#"
            INSERT INTO recycling_centers
                (name, address, latitude, longitude, contact_email, contact_phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, address, latitude, longitude, contact_email, contact_phone
            "#,
        )
        .bind(&new.name)
        .bind(&new.address)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(&new.contact_email)
        .bind(&new.contact_phone)
        .fetch_one(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn list_centers(&self) -> DbResult<Vec<RecyclingCenter>> {
        Ok(sqlx::query_as::<_, RecyclingCenter>(
            r#"
            SELECT id, name, address, latitude, longitude, contact_email, contact_phone
            FROM recycling_centers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
