//! Upload intake for `POST /iclock/cdata`.
//!
//! Storage failures are logged and still answered `OK`. Only an untrusted
//! terminal gets the not-verified marker.

use adms_core::codec::{self, decode_attendance_batch, decode_operation_log};
use tracing::{debug, error, info, warn};

use crate::directory::Directory;
use crate::registry::DeviceRegistry;
use crate::storage::{AdmsDatabase, AttendanceRecord, DatabaseError};

/// The `table` a terminal uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTable {
    Attendance,
    OperationLog,
    Other(String),
}

impl UploadTable {
    pub fn from_query(table: Option<&str>) -> Self {
        match table.map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("ATTLOG") => Self::Attendance,
            Some(t) if t.eq_ignore_ascii_case("OPERLOG") => Self::OperationLog,
            other => Self::Other(other.unwrap_or_default().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Terminal is not trusted; nothing was stored.
    NotVerified,
    /// Batch decoded. `stored` counts new rows; duplicates are not counted.
    Accepted { decoded: usize, stored: u64 },
    /// Something failed server-side; the terminal is still told OK.
    StorageFailed,
    /// A table this server does not process.
    Ignored,
}

impl IngestOutcome {
    pub const fn wire_response(self) -> &'static str {
        match self {
            Self::NotVerified => codec::NOT_VERIFIED,
            Self::Accepted { .. } | Self::StorageFailed | Self::Ignored => codec::OK,
        }
    }
}

#[derive(Clone)]
pub struct AttendanceIngest {
    db: AdmsDatabase,
    registry: DeviceRegistry,
    directory: Directory,
}

impl AttendanceIngest {
    pub const fn new(db: AdmsDatabase, registry: DeviceRegistry, directory: Directory) -> Self {
        Self {
            db,
            registry,
            directory,
        }
    }

    /// Process one upload body for `sn`.
    pub async fn accept(&self, sn: &str, table: &UploadTable, raw: &str) -> IngestOutcome {
        if let UploadTable::Other(name) = table {
            debug!(device_sn = %sn, table = %name, "Ignoring upload for unhandled table");
            return IngestOutcome::Ignored;
        }

        match self.registry.trust_status(sn).await {
            Ok(status) if status.is_verified() => {}
            Ok(_) => {
                warn!(device_sn = %sn, "Upload from unverified terminal rejected");
                return IngestOutcome::NotVerified;
            }
            Err(e) => {
                error!(device_sn = %sn, error = %e, "Trust lookup failed, dropping upload");
                return IngestOutcome::StorageFailed;
            }
        }

        match table {
            UploadTable::Attendance => self.store_attendance(sn, raw).await,
            UploadTable::OperationLog => self.store_operation_log(sn, raw).await,
            UploadTable::Other(_) => IngestOutcome::Ignored,
        }
    }

    /// Most recent stored punches for `sn`, newest first.
    pub async fn recent(
        &self,
        sn: &str,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, DatabaseError> {
        self.db.list_attendance(sn, limit).await
    }

    pub async fn total(&self, sn: &str) -> Result<i64, DatabaseError> {
        self.db.count_attendance(sn).await
    }

    async fn store_attendance(&self, sn: &str, raw: &str) -> IngestOutcome {
        let lines = decode_attendance_batch(raw);
        let decoded = lines.len();

        match self.db.insert_attendance_batch(sn, &lines).await {
            Ok(stored) => {
                info!(device_sn = %sn, decoded, stored, "Attendance batch stored");
                IngestOutcome::Accepted { decoded, stored }
            }
            Err(e) => {
                error!(device_sn = %sn, decoded, error = %e, "Failed to store attendance batch");
                IngestOutcome::StorageFailed
            }
        }
    }

    async fn store_operation_log(&self, sn: &str, raw: &str) -> IngestOutcome {
        let log = decode_operation_log(raw);
        let decoded = log.users.len() + log.fingerprints.len();
        let report = self.directory.sync_operation_log(sn, &log).await;
        IngestOutcome::Accepted {
            decoded,
            stored: report.stored(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use adms_core::ProtocolConfig;

    use super::*;

    const SAMPLE: &str = "7\t2024-01-01 08:00:00\t0\t1\t0\t0\n";

    async fn ingest() -> (AttendanceIngest, DeviceRegistry, AdmsDatabase) {
        let db = AdmsDatabase::open_in_memory().await.unwrap();
        let registry = DeviceRegistry::new(db.clone(), Arc::new(ProtocolConfig::default()));
        let directory = Directory::new(db.clone(), registry.clone());
        let ingest = AttendanceIngest::new(db.clone(), registry.clone(), directory);
        (ingest, registry, db)
    }

    #[test]
    fn table_names() {
        assert_eq!(UploadTable::from_query(Some("ATTLOG")), UploadTable::Attendance);
        assert_eq!(UploadTable::from_query(Some("OPERLOG")), UploadTable::OperationLog);
        assert_eq!(
            UploadTable::from_query(Some("ATTPHOTO")),
            UploadTable::Other("ATTPHOTO".into())
        );
        assert_eq!(UploadTable::from_query(None), UploadTable::Other(String::new()));
    }

    #[tokio::test]
    async fn unverified_upload_is_rejected() {
        let (ingest, registry, db) = ingest().await;
        registry.record_contact("SIM01", None).await;

        let outcome = ingest.accept("SIM01", &UploadTable::Attendance, SAMPLE).await;
        assert_eq!(outcome, IngestOutcome::NotVerified);
        assert_eq!(outcome.wire_response(), "ERROR: Device not verified");
        assert_eq!(db.count_attendance("SIM01").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_terminal_is_rejected() {
        let (ingest, _, _) = ingest().await;
        let outcome = ingest.accept("ghost", &UploadTable::Attendance, SAMPLE).await;
        assert_eq!(outcome, IngestOutcome::NotVerified);
    }

    #[tokio::test]
    async fn verified_upload_is_stored_once() {
        let (ingest, registry, db) = ingest().await;
        registry.record_contact("SIM01", None).await;
        registry.set_verified("SIM01", true).await.unwrap();

        let outcome = ingest.accept("SIM01", &UploadTable::Attendance, SAMPLE).await;
        assert_eq!(outcome, IngestOutcome::Accepted { decoded: 1, stored: 1 });
        assert_eq!(outcome.wire_response(), "OK");

        let again = ingest.accept("SIM01", &UploadTable::Attendance, SAMPLE).await;
        assert_eq!(again, IngestOutcome::Accepted { decoded: 1, stored: 0 });
        assert_eq!(db.count_attendance("SIM01").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn storage_failure_is_still_acknowledged() {
        let (ingest, registry, db) = ingest().await;
        registry.record_contact("SIM01", None).await;
        registry.set_verified("SIM01", true).await.unwrap();
        sqlx::query("DROP TABLE attendance_logs")
            .execute(db.pool())
            .await
            .unwrap();

        let outcome = ingest.accept("SIM01", &UploadTable::Attendance, SAMPLE).await;
        assert_eq!(outcome, IngestOutcome::StorageFailed);
        assert_eq!(outcome.wire_response(), "OK");
    }

    #[tokio::test]
    async fn other_tables_are_acknowledged_without_trust() {
        let (ingest, _, _) = ingest().await;
        let outcome = ingest
            .accept("ghost", &UploadTable::Other("ATTPHOTO".into()), "junk")
            .await;
        assert_eq!(outcome, IngestOutcome::Ignored);
        assert_eq!(outcome.wire_response(), "OK");
    }

    #[tokio::test]
    async fn operation_log_feeds_directory() {
        let (ingest, registry, db) = ingest().await;
        registry.record_contact("SIM01", None).await;
        registry.set_verified("SIM01", true).await.unwrap();

        let body = "USER PIN=5\tName=Eve\tPri=0\nFP PIN=5\tFID=1\tSize=4\tValid=1\tTMP=eA==\n";
        let outcome = ingest.accept("SIM01", &UploadTable::OperationLog, body).await;
        assert_eq!(outcome, IngestOutcome::Accepted { decoded: 2, stored: 2 });
        assert_eq!(db.find_subject("5").await.unwrap().unwrap().name, "Eve");
    }

    #[tokio::test]
    async fn operation_log_from_unverified_terminal_is_rejected() {
        let (ingest, registry, db) = ingest().await;
        registry.record_contact("SIM01", None).await;

        let outcome = ingest
            .accept("SIM01", &UploadTable::OperationLog, "USER PIN=5\tName=Eve")
            .await;
        assert_eq!(outcome, IngestOutcome::NotVerified);
        assert!(db.find_subject("5").await.unwrap().is_none());
    }
}
