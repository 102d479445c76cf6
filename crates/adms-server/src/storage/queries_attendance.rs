//! Attendance log queries.

use adms_core::codec::AttendanceLine;
use adms_core::db::unix_timestamp;

use super::db::{AdmsDatabase, DatabaseError};
use super::models::AttendanceRecord;

impl AdmsDatabase {
    /// Store a decoded ATTLOG batch in one transaction.
    ///
    /// A punch already stored for the same `(device, pin, check_time)` is
    /// kept as is. Returns the number of new rows.
    pub async fn insert_attendance_batch(
        &self,
        device_sn: &str,
        lines: &[AttendanceLine],
    ) -> Result<u64, DatabaseError> {
        if lines.is_empty() {
            return Ok(0);
        }

        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;

        for line in lines {
            let result = sqlx::query(
                "INSERT INTO attendance_logs
                     (device_sn, user_pin, check_time, status, verify_mode, raw_data, received_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(device_sn, user_pin, check_time) DO NOTHING",
            )
            .bind(device_sn)
            .bind(&line.user_pin)
            .bind(line.check_time_iso())
            .bind(line.status)
            .bind(line.verify_mode)
            .bind(&line.raw)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Most recent punches for a terminal, newest check time first.
    pub async fn list_attendance(
        &self,
        device_sn: &str,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT * FROM attendance_logs WHERE device_sn = ?
             ORDER BY check_time DESC, id DESC LIMIT ?",
        )
        .bind(device_sn)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn count_attendance(&self, device_sn: &str) -> Result<i64, DatabaseError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attendance_logs WHERE device_sn = ?")
                .bind(device_sn)
                .fetch_one(self.pool())
                .await?;

        Ok(count)
    }
}
