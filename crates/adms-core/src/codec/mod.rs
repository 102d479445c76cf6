//! Wire codec for the ADMS terminal protocol.
//!
//! Every decoder is total. Lines or pairs that do not fit the format are
//! dropped, never reported.

mod attendance;
mod keyvalue;
mod operlog;
mod response;

pub use attendance::{AttendanceLine, CHECK_TIME_FORMAT, decode_attendance_batch};
pub use keyvalue::{DeviceTelemetry, decode_info_csv, decode_key_value_blob};
pub use operlog::{FingerprintRecord, OperationLog, UserRecord, decode_operation_log};
pub use response::{encode_command, encode_handshake, encode_time};

/// Generic acknowledgment.
pub const OK: &str = "OK";

/// Sent instead of [`OK`] when an unverified terminal uploads data.
pub const NOT_VERIFIED: &str = "ERROR: Device not verified";

/// Ask the terminal for its info block and a full data check.
pub const RESYNC_DIRECTIVE: &str = "C:9:INFO\nC:10:CHECK";
