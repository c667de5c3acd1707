use thiserror::Error;

pub mod memory;
pub mod models;
pub mod pg;
pub mod store;

pub mod prelude {
    pub use crate::db::models::UserId;
    pub use crate::db::models::challenge::{
        Challenge, CompletionStatus, LeaderboardEntry, NewChallenge, UserChallenge,
    };
    pub use crate::db::models::energy::{
        DeviceType, EnergyReading, NewEnergyReading, NewSmartDevice, SmartDevice,
    };
    pub use crate::db::models::goal::{
        CommunityGoal, ContributionSummary, GoalContribution, NewCommunityGoal,
    };
    pub use crate::db::models::recommendation::Recommendation;
    pub use crate::db::models::waste::{
        NewRecyclingCenter, NewWasteEntry, RecyclingCenter, WasteEntry, WasteSummaryRow, WasteType,
    };
    pub use crate::db::store::Store;
    pub use crate::db::{DbError, DbResult};
}

pub type DbResult<T> = core::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}
