//! Heartbeat (`GET /iclock/getrequest`) handling.
//!
//! Every poll is answered with at most one directive, chosen in this
//! order: a pending reupload nudge, the oldest queued command, the
//! first-contact resync, and finally a plain `OK`.

use adms_core::codec::{self, decode_info_csv};
use tracing::{error, info};

use crate::queue::CommandQueue;
use crate::registry::DeviceRegistry;
use crate::reupload::ReuploadTrigger;

/// One heartbeat from a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Poll<'a> {
    pub sn: &'a str,
    pub ip_address: Option<&'a str>,
    /// The `INFO` query parameter, if sent.
    pub info: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Reupload,
    Command { id: i64, directive: String },
    InitialSync,
    Idle,
}

impl PollOutcome {
    pub fn body(&self) -> &str {
        match self {
            Self::Reupload | Self::InitialSync => codec::RESYNC_DIRECTIVE,
            Self::Command { directive, .. } => directive.as_str(),
            Self::Idle => codec::OK,
        }
    }
}

#[derive(Clone)]
pub struct PollDispatcher {
    registry: DeviceRegistry,
    queue: CommandQueue,
    reupload: ReuploadTrigger,
}

impl PollDispatcher {
    pub const fn new(registry: DeviceRegistry, queue: CommandQueue, reupload: ReuploadTrigger) -> Self {
        Self {
            registry,
            queue,
            reupload,
        }
    }

    pub async fn poll(&self, poll: Poll<'_>) -> PollOutcome {
        let sn = poll.sn;
        self.registry.record_contact(sn, poll.ip_address).await;

        let info = poll.info.map(str::trim).filter(|i| !i.is_empty());
        if let Some(info) = info {
            self.registry.apply_telemetry(sn, &decode_info_csv(info)).await;
        }

        if self.reupload.consume_if_pending(sn).await {
            return PollOutcome::Reupload;
        }

        match self.queue.pop_next_for_delivery(sn).await {
            Ok(Some(delivery)) => {
                return match delivery.directive {
                    Some(directive) => PollOutcome::Command {
                        id: delivery.id,
                        directive,
                    },
                    None => PollOutcome::Idle,
                };
            }
            Ok(None) => {}
            Err(e) => error!(device_sn = %sn, error = %e, "Command queue unavailable during poll"),
        }

        if info.is_some() {
            match self.registry.initial_sync_completed(sn).await {
                Ok(false) => {
                    if let Err(e) = self.registry.mark_initial_sync_completed(sn).await {
                        error!(device_sn = %sn, error = %e, "Failed to record initial sync");
                        return PollOutcome::Idle;
                    }
                    info!(device_sn = %sn, "Requesting initial sync");
                    return PollOutcome::InitialSync;
                }
                Ok(true) => {}
                Err(e) => error!(device_sn = %sn, error = %e, "Initial sync lookup failed"),
            }
        }

        PollOutcome::Idle
    }
}
