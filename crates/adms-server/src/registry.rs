//! Terminal registry: liveness, trust, telemetry and first-contact sync.
//!
//! Liveness and telemetry writes are best-effort: failures are logged, not
//! returned.

use std::sync::Arc;

use adms_core::ProtocolConfig;
use adms_core::codec::DeviceTelemetry;
use adms_core::db::unix_timestamp;
use tracing::{debug, info, warn};

use crate::storage::{AdmsDatabase, DatabaseError, Device};

/// Whether a terminal's uploads are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustStatus {
    /// Never seen.
    Unknown,
    Unverified,
    Verified,
}

impl TrustStatus {
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }
}

#[derive(Clone)]
pub struct DeviceRegistry {
    db: AdmsDatabase,
    config: Arc<ProtocolConfig>,
}

impl DeviceRegistry {
    pub const fn new(db: AdmsDatabase, config: Arc<ProtocolConfig>) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Record contact from a terminal, registering it on first sight.
    pub async fn record_contact(&self, sn: &str, ip_address: Option<&str>) {
        if let Err(e) = self
            .db
            .upsert_device(sn, ip_address, None, &self.config.default_timezone)
            .await
        {
            warn!(device_sn = %sn, error = %e, "Failed to record terminal contact");
        }
    }

    pub async fn trust_status(&self, sn: &str) -> Result<TrustStatus, DatabaseError> {
        let status = match self.db.device_verified(sn).await? {
            None => TrustStatus::Unknown,
            Some(false) => TrustStatus::Unverified,
            Some(true) => TrustStatus::Verified,
        };
        Ok(status)
    }

    /// Grant or revoke trust. Granting also re-arms the first-contact sync
    /// so the terminal uploads its backlog on its next heartbeat.
    ///
    /// Returns `false` when the terminal is unknown.
    pub async fn set_verified(&self, sn: &str, verified: bool) -> Result<bool, DatabaseError> {
        if !self.db.set_device_verified(sn, verified).await? {
            return Ok(false);
        }
        if verified {
            self.db.set_initial_sync_completed(sn, false).await?;
        }
        info!(device_sn = %sn, verified, "Terminal trust changed");
        Ok(true)
    }

    pub async fn initial_sync_completed(&self, sn: &str) -> Result<bool, DatabaseError> {
        self.db.initial_sync_completed(sn).await
    }

    pub async fn mark_initial_sync_completed(&self, sn: &str) -> Result<bool, DatabaseError> {
        self.db.set_initial_sync_completed(sn, true).await
    }

    pub async fn reset_initial_sync(&self, sn: &str) -> Result<bool, DatabaseError> {
        self.db.set_initial_sync_completed(sn, false).await
    }

    /// Apply reported telemetry. Empty reports are ignored.
    pub async fn apply_telemetry(&self, sn: &str, telemetry: &DeviceTelemetry) {
        if telemetry.is_empty() {
            return;
        }
        match self.db.update_device_telemetry(sn, telemetry).await {
            Ok(true) => debug!(device_sn = %sn, "Terminal telemetry updated"),
            Ok(false) => warn!(device_sn = %sn, "Telemetry for unregistered terminal dropped"),
            Err(e) => warn!(device_sn = %sn, error = %e, "Failed to store terminal telemetry"),
        }
    }

    /// Timezone label for the handshake, lagged when the terminal is not
    /// trusted. Lookup failures fall back to the unverified answer.
    pub async fn advertised_timezone(&self, sn: &str) -> String {
        let device = match self.db.find_device(sn).await {
            Ok(device) => device,
            Err(e) => {
                warn!(device_sn = %sn, error = %e, "Terminal lookup failed during handshake");
                None
            }
        };
        let verified = device.as_ref().is_some_and(|d| d.verified);
        self.config
            .advertised_timezone(device.as_ref().map(|d| d.timezone.as_str()), verified)
    }

    /// Hours the clock reported to this terminal lags real time.
    pub async fn clock_lag_hours(&self, sn: &str) -> i64 {
        let verified = match self.trust_status(sn).await {
            Ok(status) => status.is_verified(),
            Err(e) => {
                warn!(device_sn = %sn, error = %e, "Trust lookup failed during time sync");
                false
            }
        };
        self.config.clock_lag_hours(verified)
    }

    pub async fn get(&self, sn: &str) -> Result<Option<Device>, DatabaseError> {
        self.db.find_device(sn).await
    }

    pub async fn list(&self) -> Result<Vec<Device>, DatabaseError> {
        self.db.list_devices().await
    }

    /// Mark terminals that have been silent past the threshold as offline.
    pub async fn sweep_offline(&self) -> Result<u64, DatabaseError> {
        let cutoff = unix_timestamp() - self.config.offline_after_secs;
        let count = self.db.mark_stale_devices_offline(cutoff).await?;
        if count > 0 {
            info!(count, "Marked silent terminals offline");
        }
        Ok(count)
    }
}
