//! Server → terminal response bodies.
//!
//! Terminals parse these literally and silently drop a directive with a
//! missing tab or a misspelled key.

use chrono::NaiveDateTime;

use crate::command::{
    Command, DEFAULT_USER_TIMEZONE, EnrollFingerprint, PasswordUpdate, PushFingerprint, SetUser,
};

/// Handshake reply to `GET /iclock/cdata?options=all`.
///
/// Every field except the serial and the timezone is a protocol constant.
pub fn encode_handshake(serial: &str, timezone: &str) -> String {
    format!(
        "GET OPTION FROM: {serial}\n\
         Stamp=9999\n\
         OpStamp=9999\n\
         PhotoStamp=9999\n\
         ErrorDelay=30\n\
         Delay=30\n\
         TransTimes=00:00;14:05\n\
         TransInterval=1\n\
         TransFlag=1111000000\n\
         Realtime=1\n\
         Encrypt=0\n\
         TimeZone={timezone}\n\
         ServerVer=3.4.1 2018-06-30\n\
         ATTLOGStamp=0"
    )
}

/// Time-sync reply to `GET /iclock/cdata?type=time`.
pub fn encode_time(now: NaiveDateTime) -> String {
    format!("Time={}", now.format("%Y-%m-%dT%H:%M:%S"))
}

/// Render a queued command as the directive text delivered on a poll.
pub fn encode_command(command: &Command) -> String {
    match command {
        Command::Reboot => "C:10:REBOOT".to_string(),
        Command::ClearLog => "C:10:CLEAR LOG".to_string(),
        Command::Info => "C:10:INFO".to_string(),
        Command::ResyncCheck => super::RESYNC_DIRECTIVE.to_string(),
        Command::SetUser(p) => encode_set_user(p),
        Command::DeleteUser(p) => format!("C:10:DATA DEL_USER PIN={}", p.pin),
        Command::EnrollFingerprint(p) => encode_enroll(p),
        Command::PushFingerprint(p) => encode_push_fingerprint(p),
    }
}

fn encode_set_user(p: &SetUser) -> String {
    let mut line = format!("C:10:DATA USER PIN={}\tPri={}", p.pin, p.privilege);
    match &p.password {
        None => {}
        Some(PasswordUpdate::Clear) => line.push_str("\tPasswd="),
        Some(PasswordUpdate::Set(value)) => {
            line.push_str("\tPasswd=");
            line.push_str(value);
        }
    }
    line
}

fn encode_enroll(p: &EnrollFingerprint) -> String {
    format!(
        "C:10:ENROLL_FP PIN={}\tFID={}\tRETRY={}\tOVERWRITE={}",
        p.pin,
        p.fid,
        p.retry,
        u8::from(p.overwrite)
    )
}

fn encode_push_fingerprint(p: &PushFingerprint) -> String {
    let owner = &p.owner;
    let name = owner
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&p.pin);
    let privilege = owner.privilege.unwrap_or(0);
    let timezone = owner
        .timezone
        .as_deref()
        .filter(|tz| !tz.is_empty())
        .unwrap_or(DEFAULT_USER_TIMEZONE);
    let group = owner.group_no.filter(|g| *g != 0).unwrap_or(1);

    // The two empty fields stand in for Passwd and Card.
    let user_line = format!(
        "C:10:DATA USER PIN={}\tName={name}\tPri={privilege}\t\t\tTZ={timezone}\tGrp={group}",
        p.pin
    );
    let fp_line = format!(
        "C:10:DATA FP PIN={}\tFID={}\tSize={}\tValid=1\tTMP={}",
        p.pin,
        p.finger_id,
        p.template.len(),
        p.template
    );
    format!("{user_line}\n{fp_line}")
}
