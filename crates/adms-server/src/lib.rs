//! ADMS Push Server Library
//!
//! Server side of the ZKTeco ADMS push protocol:
//! - Terminal registry with trust gating and liveness
//! - Attendance and OPERLOG ingest
//! - Per-terminal command queue with at-most-once delivery
//! - Heartbeat dispatcher and reupload nudges
//! - Subject directory and fingerprint transfer
//! - HTTP endpoints for terminals and operators

pub mod directory;
pub mod dispatcher;
pub mod http;
pub mod ingest;
pub mod queue;
pub mod registry;
pub mod reupload;
pub mod state;
pub mod storage;

pub use http::build_router;
pub use state::AppState;
