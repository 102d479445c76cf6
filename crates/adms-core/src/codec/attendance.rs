//! ATTLOG upload lines.
//!
//! Format, one punch per line, tab separated:
//! `PIN \t YYYY-MM-DD HH:MM:SS \t status \t verify-mode [\t validation [\t work-code]]`

use chrono::NaiveDateTime;

/// Timestamp layout used by terminals on the wire.
pub const CHECK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One decoded punch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceLine {
    pub user_pin: String,
    /// Terminal wall clock; no timezone is attached here.
    pub check_time: NaiveDateTime,
    pub status: Option<i32>,
    pub verify_mode: Option<i32>,
    pub validation: Option<String>,
    pub work_code: Option<String>,
    /// The line as received, kept for forensic replay.
    pub raw: String,
}

impl AttendanceLine {
    /// `check_time` in the `YYYY-MM-DDTHH:MM:SS` form used for storage.
    pub fn check_time_iso(&self) -> String {
        self.check_time.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// Re-encode the line in wire form.
    pub fn to_wire(&self) -> String {
        let mut fields = vec![
            self.user_pin.clone(),
            self.check_time.format(CHECK_TIME_FORMAT).to_string(),
            self.status.map(|s| s.to_string()).unwrap_or_default(),
            self.verify_mode.map(|v| v.to_string()).unwrap_or_default(),
        ];
        if let Some(validation) = &self.validation {
            fields.push(validation.clone());
            if let Some(work_code) = &self.work_code {
                fields.push(work_code.clone());
            }
        }
        fields.join("\t")
    }
}

/// Decode an ATTLOG body into punch events.
///
/// Lines with fewer than four fields, an empty PIN, or an unparseable
/// timestamp are dropped.
pub fn decode_attendance_batch(raw: &str) -> Vec<AttendanceLine> {
    raw.lines().filter_map(decode_line).collect()
}

fn decode_line(line: &str) -> Option<AttendanceLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 {
        return None;
    }

    let user_pin = fields[0].trim();
    if user_pin.is_empty() {
        return None;
    }

    let check_time = NaiveDateTime::parse_from_str(fields[1].trim(), CHECK_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(fields[1].trim(), "%Y-%m-%dT%H:%M:%S"))
        .ok()?;

    Some(AttendanceLine {
        user_pin: user_pin.to_string(),
        check_time,
        status: fields[2].trim().parse().ok(),
        verify_mode: fields[3].trim().parse().ok(),
        validation: fields.get(4).map(|v| v.trim().to_string()),
        work_code: fields.get(5).map(|v| v.trim().to_string()),
        raw: line.to_string(),
    })
}
