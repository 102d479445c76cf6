//! Subject directory: who is enrolled where, and with which templates.
//!
//! Fed by OPERLOG uploads. Used to copy a subject's fingerprints from one
//! terminal to another.

use adms_core::Command;
use adms_core::codec::OperationLog;
use adms_core::command::{FingerprintOwner, PushFingerprint};
use serde::Serialize;
use tracing::{error, info};

use crate::registry::DeviceRegistry;
use crate::storage::{AdmsDatabase, DatabaseError, DeviceSubject, Fingerprint, Subject, SubjectDevice};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    #[error("No fingerprints found for subject {pin} at device {device_sn}")]
    NoFingerprints { pin: String, device_sn: String },

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result of applying one OPERLOG batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub users: u64,
    pub fingerprints: u64,
    pub failed: u64,
}

impl SyncReport {
    pub const fn stored(&self) -> u64 {
        self.users + self.fingerprints
    }
}

/// A subject with every terminal and template it is known by.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectProfile {
    pub subject: Subject,
    pub devices: Vec<SubjectDevice>,
    pub fingerprints: Vec<Fingerprint>,
}

#[derive(Clone)]
pub struct Directory {
    db: AdmsDatabase,
    registry: DeviceRegistry,
}

impl Directory {
    pub const fn new(db: AdmsDatabase, registry: DeviceRegistry) -> Self {
        Self { db, registry }
    }

    /// Store every record of an OPERLOG batch. Records are applied one by
    /// one; a failing record is logged and skipped.
    pub async fn sync_operation_log(&self, device_sn: &str, log: &OperationLog) -> SyncReport {
        let mut report = SyncReport::default();
        if log.is_empty() {
            return report;
        }

        let device_name = match self.registry.get(device_sn).await {
            Ok(device) => device.map(|d| d.name),
            Err(e) => {
                error!(device_sn = %device_sn, error = %e, "Terminal lookup failed during OPERLOG sync");
                None
            }
        };

        for user in &log.users {
            match self
                .db
                .upsert_subject(device_sn, device_name.as_deref(), user)
                .await
            {
                Ok(()) => report.users += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(device_sn = %device_sn, pin = %user.pin, error = %e, "Failed to sync subject");
                }
            }
        }

        for fp in &log.fingerprints {
            match self
                .db
                .upsert_fingerprint(device_sn, device_name.as_deref(), fp)
                .await
            {
                Ok(()) => report.fingerprints += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        device_sn = %device_sn,
                        pin = %fp.pin,
                        finger_id = fp.finger_id,
                        error = %e,
                        "Failed to sync fingerprint"
                    );
                }
            }
        }

        info!(
            device_sn = %device_sn,
            users = report.users,
            fingerprints = report.fingerprints,
            failed = report.failed,
            "OPERLOG batch synced"
        );
        report
    }

    pub async fn subject_profile(&self, pin: &str) -> Result<Option<SubjectProfile>, DatabaseError> {
        let Some(subject) = self.db.find_subject(pin).await? else {
            return Ok(None);
        };
        let devices = self.db.list_subject_devices(pin).await?;
        let fingerprints = self.db.list_fingerprints(pin, None).await?;

        Ok(Some(SubjectProfile {
            subject,
            devices,
            fingerprints,
        }))
    }

    pub async fn subjects_at_device(&self, device_sn: &str) -> Result<Vec<DeviceSubject>, DatabaseError> {
        self.db.list_device_subjects(device_sn).await
    }

    pub async fn fingerprints(
        &self,
        pin: &str,
        device_sn: Option<&str>,
    ) -> Result<Vec<Fingerprint>, DatabaseError> {
        self.db.list_fingerprints(pin, device_sn).await
    }

    /// Build the commands that copy a subject's templates from `source_sn`
    /// onto another terminal, one per finger.
    pub async fn plan_fingerprint_transfer(
        &self,
        pin: &str,
        source_sn: &str,
    ) -> Result<Vec<Command>, DirectoryError> {
        let fingerprints = self.db.list_fingerprints(pin, Some(source_sn)).await?;
        if fingerprints.is_empty() {
            return Err(DirectoryError::NoFingerprints {
                pin: pin.to_string(),
                device_sn: source_sn.to_string(),
            });
        }

        let subject = self
            .db
            .find_subject(pin)
            .await?
            .ok_or_else(|| DirectoryError::SubjectNotFound(pin.to_string()))?;

        let owner = FingerprintOwner {
            name: Some(subject.name).filter(|n| !n.is_empty()),
            privilege: Some(subject.privilege),
            timezone: Some(subject.timezone).filter(|tz| !tz.is_empty()),
            group_no: Some(subject.group_no),
        };

        Ok(fingerprints
            .into_iter()
            .map(|fp| {
                Command::PushFingerprint(PushFingerprint {
                    pin: pin.to_string(),
                    finger_id: fp.finger_id,
                    template: fp.template,
                    owner: owner.clone(),
                })
            })
            .collect())
    }
}
