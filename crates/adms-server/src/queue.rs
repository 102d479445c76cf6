//! Per-terminal FIFO of operator commands.
//!
//! Each command is delivered at most once. Claiming a command and marking
//! it executed happen in one store operation, so racing polls from the
//! same terminal never both receive it.

use adms_core::Command;
use adms_core::codec::encode_command;
use serde::Serialize;
use tracing::{info, warn};

use crate::storage::{AdmsDatabase, DatabaseError, PendingCommand};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Failed to encode command parameters: {0}")]
    Encode(#[from] adms_core::Error),
}

/// A command claimed for delivery on this poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: i64,
    pub kind: String,
    /// Directive text, or `None` when the stored row no longer decodes.
    pub directive: Option<String>,
}

/// Queue entry as shown to operators.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedCommand {
    pub id: i64,
    pub device_sn: String,
    pub device_name: Option<String>,
    pub command_type: String,
    pub params: serde_json::Value,
    pub created_at: i64,
}

impl From<PendingCommand> for QueuedCommand {
    fn from(row: PendingCommand) -> Self {
        let params = serde_json::from_str(&row.command_params)
            .unwrap_or(serde_json::Value::String(row.command_params));
        Self {
            id: row.id,
            device_sn: row.device_sn,
            device_name: row.device_name,
            command_type: row.command_type,
            params,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct CommandQueue {
    db: AdmsDatabase,
}

impl CommandQueue {
    pub const fn new(db: AdmsDatabase) -> Self {
        Self { db }
    }

    /// Append a command for `device_sn`. Returns the queue id.
    pub async fn enqueue(&self, device_sn: &str, command: &Command) -> Result<i64, QueueError> {
        let params = command.params_json()?;
        let id = self
            .db
            .insert_command(device_sn, command.kind(), &params)
            .await?;

        info!(
            device_sn = %device_sn,
            command_id = id,
            command = command.label(),
            "Command queued"
        );
        Ok(id)
    }

    /// Claim the oldest pending command for `device_sn`.
    ///
    /// A row whose type or parameters no longer decode is still consumed,
    /// so it cannot block the commands behind it.
    pub async fn pop_next_for_delivery(
        &self,
        device_sn: &str,
    ) -> Result<Option<Delivery>, QueueError> {
        let Some(row) = self.db.pop_next_command(device_sn).await? else {
            return Ok(None);
        };

        let directive = match Command::from_parts(&row.command_type, &row.command_params) {
            Ok(command) => {
                info!(
                    device_sn = %device_sn,
                    command_id = row.id,
                    command = command.label(),
                    "Delivering command"
                );
                Some(encode_command(&command))
            }
            Err(e) => {
                warn!(
                    device_sn = %device_sn,
                    command_id = row.id,
                    command_type = %row.command_type,
                    error = %e,
                    "Discarding undeliverable command"
                );
                None
            }
        };

        Ok(Some(Delivery {
            id: row.id,
            kind: row.command_type,
            directive,
        }))
    }

    /// Pending commands across every terminal, in delivery order.
    pub async fn list_pending(&self) -> Result<Vec<QueuedCommand>, QueueError> {
        let rows = self.db.list_pending_commands().await?;
        Ok(rows.into_iter().map(QueuedCommand::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use adms_core::command::DeleteUser;

    use super::*;

    async fn queue() -> (CommandQueue, AdmsDatabase) {
        let db = AdmsDatabase::open_in_memory().await.unwrap();
        db.upsert_device("SIM01", None, None, "+07:00").await.unwrap();
        (CommandQueue::new(db.clone()), db)
    }

    #[tokio::test]
    async fn delivers_in_enqueue_order_then_empties() {
        let (queue, _) = queue().await;
        queue.enqueue("SIM01", &Command::Reboot).await.unwrap();
        queue
            .enqueue("SIM01", &Command::DeleteUser(DeleteUser { pin: "42".into() }))
            .await
            .unwrap();

        let first = queue.pop_next_for_delivery("SIM01").await.unwrap().unwrap();
        assert_eq!(first.directive.as_deref(), Some("C:10:REBOOT"));

        let second = queue.pop_next_for_delivery("SIM01").await.unwrap().unwrap();
        assert_eq!(second.directive.as_deref(), Some("C:10:DATA DEL_USER PIN=42"));

        assert!(queue.pop_next_for_delivery("SIM01").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_row_is_consumed() {
        let (queue, db) = queue().await;
        db.insert_command("SIM01", "self_destruct", "{}").await.unwrap();
        queue.enqueue("SIM01", &Command::Info).await.unwrap();

        let bad = queue.pop_next_for_delivery("SIM01").await.unwrap().unwrap();
        assert_eq!(bad.kind, "self_destruct");
        assert!(bad.directive.is_none());

        let next = queue.pop_next_for_delivery("SIM01").await.unwrap().unwrap();
        assert_eq!(next.directive.as_deref(), Some("C:10:INFO"));
    }

    #[tokio::test]
    async fn enqueue_for_unknown_terminal_fails() {
        let (queue, _) = queue().await;
        assert!(matches!(
            queue.enqueue("ghost", &Command::Reboot).await,
            Err(QueueError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn pending_list_decodes_params() {
        let (queue, _) = queue().await;
        queue
            .enqueue("SIM01", &Command::DeleteUser(DeleteUser { pin: "42".into() }))
            .await
            .unwrap();

        let pending = queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].command_type, "delete_user");
        assert_eq!(pending[0].params["pin"], "42");
        assert_eq!(pending[0].device_name.as_deref(), Some("SIM01"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_polls_never_share_a_command() {
        let (queue, _) = queue().await;
        for _ in 0..20 {
            queue.enqueue("SIM01", &Command::Info).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                while let Some(delivery) = queue.pop_next_for_delivery("SIM01").await.unwrap() {
                    ids.push(delivery.id);
                }
                ids
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "command {id} delivered twice");
            }
        }
        assert_eq!(seen.len(), 20);
    }
}
