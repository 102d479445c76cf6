//! Operator-requested "upload your whole log again" nudges.
//!
//! Flags live in memory only and are lost on restart; an operator can
//! simply request again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use adms_core::db::unix_timestamp;
use tokio::sync::Mutex;
use tracing::info;

/// Pending reupload requests keyed by serial, valued by request time.
#[derive(Clone, Default)]
pub struct ReuploadTrigger {
    pending: Arc<Mutex<HashMap<String, i64>>>,
}

impl ReuploadTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag `sn` for a reupload on its next poll. Repeated requests before
    /// that poll collapse into one.
    pub async fn request(&self, sn: &str) {
        self.pending
            .lock()
            .await
            .insert(sn.to_string(), unix_timestamp());
        info!(device_sn = %sn, "Reupload requested");
    }

    /// Test and clear the flag for `sn`. Returns `true` at most once per
    /// request, however many polls race.
    pub async fn consume_if_pending(&self, sn: &str) -> bool {
        let consumed = self.pending.lock().await.remove(sn).is_some();
        if consumed {
            info!(device_sn = %sn, "Reupload directive issued");
        }
        consumed
    }

    #[cfg(test)]
    pub async fn is_pending(&self, sn: &str) -> bool {
        self.pending.lock().await.contains_key(sn)
    }

    /// Current requests, sorted by serial.
    pub async fn snapshot(&self) -> BTreeMap<String, i64> {
        self.pending
            .lock()
            .await
            .iter()
            .map(|(sn, at)| (sn.clone(), *at))
            .collect()
    }
}
