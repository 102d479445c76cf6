//! Shared handles passed to every request handler.

use std::sync::Arc;

use adms_core::ProtocolConfig;

use crate::directory::Directory;
use crate::dispatcher::PollDispatcher;
use crate::ingest::AttendanceIngest;
use crate::queue::CommandQueue;
use crate::registry::DeviceRegistry;
use crate::reupload::ReuploadTrigger;
use crate::storage::AdmsDatabase;

#[derive(Clone)]
pub struct AppState {
    pub registry: DeviceRegistry,
    pub ingest: AttendanceIngest,
    pub queue: CommandQueue,
    pub reupload: ReuploadTrigger,
    pub dispatcher: PollDispatcher,
    pub directory: Directory,
    /// `None` leaves the admin API unusable until a key is configured.
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(db: AdmsDatabase, config: ProtocolConfig, admin_api_key: Option<String>) -> Self {
        let config = Arc::new(config);
        let registry = DeviceRegistry::new(db.clone(), config);
        let directory = Directory::new(db.clone(), registry.clone());
        let ingest = AttendanceIngest::new(db.clone(), registry.clone(), directory.clone());
        let queue = CommandQueue::new(db);
        let reupload = ReuploadTrigger::new();
        let dispatcher = PollDispatcher::new(registry.clone(), queue.clone(), reupload.clone());

        Self {
            registry,
            ingest,
            queue,
            reupload,
            dispatcher,
            directory,
            admin_api_key: admin_api_key
                .filter(|key| !key.is_empty())
                .map(Arc::from),
        }
    }
}
