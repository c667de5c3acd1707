use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "waste_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WasteType {
    Plastic,
    Paper,
    Glass,
    Metal,
    Organic,
    Other,
}

/// One logged disposal, quantity in kilograms.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WasteEntry {
    pub id: i64,
    pub user_id: UserId,
    pub waste_type: WasteType,
    pub quantity: f64,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWasteEntry {
    pub waste_type: WasteType,
    pub quantity: f64,
    pub logged_at: Option<DateTime<Utc>>,
}

/// Sum of logged quantities for one waste type.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WasteSummaryRow {
    pub waste_type: WasteType,
    pub total_quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecyclingCenter {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_email: String,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecyclingCenter {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_email: String,
    pub contact_phone: Option<String>,
}
