//! Subject directory queries.

use adms_core::codec::{FingerprintRecord, UserRecord};
use adms_core::db::unix_timestamp;

use super::db::{AdmsDatabase, DatabaseError};
use super::models::{DeviceSubject, Fingerprint, Subject, SubjectDevice};

impl AdmsDatabase {
    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a user profile and link it to the terminal that reported it.
    pub async fn upsert_subject(
        &self,
        device_sn: &str,
        device_name: Option<&str>,
        user: &UserRecord,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO subjects
                 (pin, name, privilege, password, card, group_no, timezone, verify_mode, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(pin) DO UPDATE SET
                 name = excluded.name,
                 privilege = excluded.privilege,
                 password = excluded.password,
                 card = excluded.card,
                 group_no = excluded.group_no,
                 timezone = excluded.timezone,
                 verify_mode = excluded.verify_mode,
                 updated_at = excluded.updated_at",
        )
        .bind(&user.pin)
        .bind(&user.name)
        .bind(user.privilege)
        .bind(&user.password)
        .bind(&user.card)
        .bind(user.group_no)
        .bind(&user.timezone)
        .bind(user.verify_mode)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        link_subject_device(&mut tx, &user.pin, device_sn, device_name, now).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Store a fingerprint template reported by a terminal.
    ///
    /// A PIN not yet in the directory gets a placeholder profile so the
    /// template has an owner.
    pub async fn upsert_fingerprint(
        &self,
        device_sn: &str,
        device_name: Option<&str>,
        fp: &FingerprintRecord,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();
        let size = fp
            .size
            .unwrap_or_else(|| i64::try_from(fp.template.len()).unwrap_or(i64::MAX));
        let valid = fp.valid.is_none_or(|v| v != 0);
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO subjects (pin, created_at, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(pin) DO NOTHING",
        )
        .bind(&fp.pin)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        link_subject_device(&mut tx, &fp.pin, device_sn, device_name, now).await?;

        sqlx::query(
            "INSERT INTO fingerprints (pin, device_sn, finger_id, template, size, valid, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(pin, device_sn, finger_id) DO UPDATE SET
                 template = excluded.template,
                 size = excluded.size,
                 valid = excluded.valid,
                 updated_at = excluded.updated_at",
        )
        .bind(&fp.pin)
        .bind(device_sn)
        .bind(fp.finger_id)
        .bind(&fp.template)
        .bind(size)
        .bind(valid)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn find_subject(&self, pin: &str) -> Result<Option<Subject>, DatabaseError> {
        let subject = sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE pin = ?")
            .bind(pin)
            .fetch_optional(self.pool())
            .await?;

        Ok(subject)
    }

    /// Terminals a subject has been seen on, most recent first.
    pub async fn list_subject_devices(&self, pin: &str) -> Result<Vec<SubjectDevice>, DatabaseError> {
        let rows = sqlx::query_as::<_, SubjectDevice>(
            "SELECT * FROM subject_devices WHERE pin = ? ORDER BY last_seen DESC, device_sn ASC",
        )
        .bind(pin)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Subjects known on one terminal, with their template counts there.
    pub async fn list_device_subjects(
        &self,
        device_sn: &str,
    ) -> Result<Vec<DeviceSubject>, DatabaseError> {
        let rows = sqlx::query_as::<_, DeviceSubject>(
            "SELECT s.pin, s.name, s.privilege, sd.last_seen,
                    (SELECT COUNT(*) FROM fingerprints f
                     WHERE f.pin = sd.pin AND f.device_sn = sd.device_sn) AS fingerprint_count
             FROM subject_devices sd
             JOIN subjects s ON s.pin = sd.pin
             WHERE sd.device_sn = ?
             ORDER BY s.pin ASC",
        )
        .bind(device_sn)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Templates for a subject, optionally restricted to one terminal.
    pub async fn list_fingerprints(
        &self,
        pin: &str,
        device_sn: Option<&str>,
    ) -> Result<Vec<Fingerprint>, DatabaseError> {
        let rows = if let Some(sn) = device_sn {
            sqlx::query_as::<_, Fingerprint>(
                "SELECT * FROM fingerprints WHERE pin = ? AND device_sn = ? ORDER BY finger_id ASC",
            )
            .bind(pin)
            .bind(sn)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, Fingerprint>(
                "SELECT * FROM fingerprints WHERE pin = ? ORDER BY device_sn ASC, finger_id ASC",
            )
            .bind(pin)
            .fetch_all(self.pool())
            .await?
        };

        Ok(rows)
    }
}

async fn link_subject_device(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    pin: &str,
    device_sn: &str,
    device_name: Option<&str>,
    now: i64,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO subject_devices (pin, device_sn, device_name, first_seen, last_seen)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(pin, device_sn) DO UPDATE SET
             device_name = COALESCE(excluded.device_name, subject_devices.device_name),
             last_seen = excluded.last_seen",
    )
    .bind(pin)
    .bind(device_sn)
    .bind(device_name)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
