use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "device_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Thermostat,
    Light,
    Plug,
    Camera,
}

/// Base smart device table model. `device_identifier` is the physical
/// identifier (MAC address or similar) and is globally unique.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SmartDevice {
    pub id: i64,
    pub user_id: UserId,
    pub device_name: String,
    pub device_type: DeviceType,
    pub device_identifier: String,
    pub is_active: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSmartDevice {
    pub device_name: String,
    pub device_type: DeviceType,
    /// Filled with a generated UUID when the device has no physical id.
    pub device_identifier: Option<String>,
}

/// One time-series sample of a device's consumption, in kWh.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnergyReading {
    pub id: i64,
    pub device_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub energy_consumed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEnergyReading {
    pub energy_consumed: f64,
    pub recorded_at: Option<DateTime<Utc>>,
}
