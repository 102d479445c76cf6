//! Terminal registry queries.

use adms_core::codec::DeviceTelemetry;
use adms_core::db::unix_timestamp;

use super::db::{AdmsDatabase, DatabaseError};
use super::models::Device;

impl AdmsDatabase {
    // =========================================================================
    // Registration and liveness
    // =========================================================================

    /// Record contact from a terminal, creating it on first sight.
    ///
    /// New rows are named after the serial and start unverified with
    /// `initial_timezone`. Existing rows get `status = 'online'` and a fresh
    /// `last_activity`; the address and timezone are only overwritten when a
    /// value is supplied.
    pub async fn upsert_device(
        &self,
        sn: &str,
        ip_address: Option<&str>,
        timezone: Option<&str>,
        initial_timezone: &str,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO devices (sn, name, ip_address, timezone, status, last_activity, created_at)
             VALUES (?, ?, ?, ?, 'online', ?, ?)
             ON CONFLICT(sn) DO UPDATE SET
                 ip_address = COALESCE(excluded.ip_address, devices.ip_address),
                 timezone = COALESCE(?, devices.timezone),
                 status = 'online',
                 last_activity = excluded.last_activity",
        )
        .bind(sn)
        .bind(sn)
        .bind(ip_address)
        .bind(timezone.unwrap_or(initial_timezone))
        .bind(now)
        .bind(now)
        .bind(timezone)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Get a terminal by serial.
    #[cfg(test)]
    pub async fn get_device(&self, sn: &str) -> Result<Device, DatabaseError> {
        self.find_device(sn)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {sn}")))
    }

    pub async fn find_device(&self, sn: &str) -> Result<Option<Device>, DatabaseError> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE sn = ?")
            .bind(sn)
            .fetch_optional(self.pool())
            .await?;

        Ok(device)
    }

    /// All terminals, most recently active first.
    pub async fn list_devices(&self) -> Result<Vec<Device>, DatabaseError> {
        let devices = sqlx::query_as::<_, Device>(
            "SELECT * FROM devices ORDER BY last_activity DESC, sn ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(devices)
    }

    /// Mark terminals silent since before `cutoff` as offline.
    pub async fn mark_stale_devices_offline(&self, cutoff: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE devices SET status = 'offline' WHERE status = 'online' AND last_activity < ?",
        )
        .bind(cutoff)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Trust and first-contact sync
    // =========================================================================

    /// `None` when the terminal has never been seen.
    pub async fn device_verified(&self, sn: &str) -> Result<Option<bool>, DatabaseError> {
        let verified: Option<bool> = sqlx::query_scalar("SELECT verified FROM devices WHERE sn = ?")
            .bind(sn)
            .fetch_optional(self.pool())
            .await?;

        Ok(verified)
    }

    /// Returns `false` when the terminal does not exist.
    pub async fn set_device_verified(&self, sn: &str, verified: bool) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE devices SET verified = ? WHERE sn = ?")
            .bind(verified)
            .bind(sn)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// `false` for unknown terminals as well as for those not yet synced.
    pub async fn initial_sync_completed(&self, sn: &str) -> Result<bool, DatabaseError> {
        let done: Option<bool> =
            sqlx::query_scalar("SELECT initial_sync_completed FROM devices WHERE sn = ?")
                .bind(sn)
                .fetch_optional(self.pool())
                .await?;

        Ok(done.unwrap_or(false))
    }

    /// Returns `false` when the terminal does not exist.
    pub async fn set_initial_sync_completed(
        &self,
        sn: &str,
        completed: bool,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE devices SET initial_sync_completed = ? WHERE sn = ?")
            .bind(completed)
            .bind(sn)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Telemetry
    // =========================================================================

    /// Apply the fields present in `telemetry`, leaving the rest untouched.
    ///
    /// Returns `false` when the terminal does not exist.
    pub async fn update_device_telemetry(
        &self,
        sn: &str,
        telemetry: &DeviceTelemetry,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE devices SET
                 name = COALESCE(?, name),
                 mac = COALESCE(?, mac),
                 user_count = COALESCE(?, user_count),
                 transaction_count = COALESCE(?, transaction_count),
                 main_time = COALESCE(?, main_time),
                 platform = COALESCE(?, platform),
                 fw_version = COALESCE(?, fw_version),
                 ip_address = COALESCE(?, ip_address),
                 last_activity = ?
             WHERE sn = ?",
        )
        .bind(telemetry.device_name.as_deref())
        .bind(telemetry.mac.as_deref())
        .bind(telemetry.user_count)
        .bind(telemetry.transaction_count)
        .bind(telemetry.main_time.as_deref())
        .bind(telemetry.platform.as_deref())
        .bind(telemetry.fw_version.as_deref())
        .bind(telemetry.ip_address.as_deref())
        .bind(unix_timestamp())
        .bind(sn)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
