//! ADMS Core Library
//!
//! Shared functionality for the ADMS push server:
//! - Wire codec for the terminal protocol (ATTLOG, OPERLOG, info blobs, directives)
//! - Command model for the per-terminal queue
//! - Protocol policy configuration and clock arithmetic
//! - `SQLite` pool helpers and common error types

pub mod clock;
pub mod codec;
pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use command::Command;
pub use config::ProtocolConfig;
pub use error::{Error, Result};
