//! SQLite storage for the ADMS server.
//!
//! Persists terminals, attendance punches, the per-terminal command queue,
//! and the subject directory learned from OPERLOG uploads.

mod db;
mod models;
mod queries_attendance;
mod queries_commands;
mod queries_devices;
mod queries_directory;


pub use db::{AdmsDatabase, DatabaseError};
pub use models::*;
