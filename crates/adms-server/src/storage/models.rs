//! Row types for ADMS storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub sn: String,
    pub name: String,
    pub ip_address: Option<String>,
    pub timezone: String,
    pub status: String,
    pub verified: bool,
    pub initial_sync_completed: bool,
    pub fw_version: Option<String>,
    pub platform: Option<String>,
    pub mac: Option<String>,
    pub main_time: Option<String>,
    pub user_count: Option<i64>,
    pub transaction_count: Option<i64>,
    pub last_activity: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub device_sn: String,
    pub user_pin: String,
    pub check_time: String,
    pub status: Option<i64>,
    pub verify_mode: Option<i64>,
    pub raw_data: String,
    pub received_at: i64,
}

/// A queue row. `command_params` is the JSON encoding of the command's
/// parameters; see [`adms_core::Command::from_parts`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredCommand {
    pub id: i64,
    pub device_sn: String,
    pub command_type: String,
    pub command_params: String,
    pub status: String,
    pub created_at: i64,
    pub executed_at: Option<i64>,
}

/// Pending queue entry joined with its terminal's display name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingCommand {
    pub id: i64,
    pub device_sn: String,
    pub device_name: Option<String>,
    pub command_type: String,
    pub command_params: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subject {
    pub pin: String,
    pub name: String,
    pub privilege: i64,
    pub password: String,
    pub card: String,
    pub group_no: i64,
    pub timezone: String,
    pub verify_mode: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubjectDevice {
    pub pin: String,
    pub device_sn: String,
    pub device_name: Option<String>,
    pub first_seen: i64,
    pub last_seen: i64,
}

/// A subject as seen from one terminal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceSubject {
    pub pin: String,
    pub name: String,
    pub privilege: i64,
    pub fingerprint_count: i64,
    pub last_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Fingerprint {
    pub pin: String,
    pub device_sn: String,
    pub finger_id: i64,
    pub template: String,
    pub size: i64,
    pub valid: bool,
    pub updated_at: i64,
}
