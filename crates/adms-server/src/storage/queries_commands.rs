//! Command queue queries.

use adms_core::db::unix_timestamp;

use super::db::{AdmsDatabase, DatabaseError};
use super::models::{PendingCommand, StoredCommand};

impl AdmsDatabase {
    /// Append a pending command. Returns the new row id.
    pub async fn insert_command(
        &self,
        device_sn: &str,
        command_type: &str,
        command_params: &str,
    ) -> Result<i64, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO device_commands (device_sn, command_type, command_params, status, created_at)
             VALUES (?, ?, ?, 'pending', ?)",
        )
        .bind(device_sn)
        .bind(command_type)
        .bind(command_params)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Claim the oldest pending command for a terminal.
    ///
    /// Selection and the transition to `executed` happen in one statement,
    /// so two concurrent polls can never claim the same row.
    pub async fn pop_next_command(
        &self,
        device_sn: &str,
    ) -> Result<Option<StoredCommand>, DatabaseError> {
        let command = sqlx::query_as::<_, StoredCommand>(
            "UPDATE device_commands
             SET status = 'executed', executed_at = ?
             WHERE id = (
                 SELECT id FROM device_commands
                 WHERE device_sn = ? AND status = 'pending'
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1
             ) AND status = 'pending'
             RETURNING *",
        )
        .bind(unix_timestamp())
        .bind(device_sn)
        .fetch_optional(self.pool())
        .await?;

        Ok(command)
    }

    #[cfg(test)]
    pub async fn get_command(&self, id: i64) -> Result<StoredCommand, DatabaseError> {
        sqlx::query_as::<_, StoredCommand>("SELECT * FROM device_commands WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Command {id}")))
    }

    /// Every pending command across terminals, in delivery order.
    pub async fn list_pending_commands(&self) -> Result<Vec<PendingCommand>, DatabaseError> {
        let rows = sqlx::query_as::<_, PendingCommand>(
            "SELECT c.id, c.device_sn, d.name AS device_name, c.command_type,
                    c.command_params, c.created_at
             FROM device_commands c
             LEFT JOIN devices d ON d.sn = c.device_sn
             WHERE c.status = 'pending'
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    #[cfg(test)]
    pub async fn count_pending_commands(&self, device_sn: &str) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM device_commands WHERE device_sn = ? AND status = 'pending'",
        )
        .bind(device_sn)
        .fetch_one(self.pool())
        .await?;

        Ok(count)
    }
}
