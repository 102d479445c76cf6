//! Outbound directives queued for a terminal.
//!
//! A command is stored as a `(kind, params)` pair: `kind` is one of the
//! stable strings returned by [`Command::kind`], `params` is the JSON of the
//! variant's parameter struct. Rows written by a newer build may carry a
//! kind this build does not know; [`Command::from_parts`] reports those as
//! [`Error::UnknownCommand`] so the caller can skip them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default timezone pattern pushed with a transferred fingerprint owner.
pub const DEFAULT_USER_TIMEZONE: &str = "0001000100000000";

/// One directive for one terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reboot,
    ClearLog,
    Info,
    SetUser(SetUser),
    DeleteUser(DeleteUser),
    EnrollFingerprint(EnrollFingerprint),
    PushFingerprint(PushFingerprint),
    ResyncCheck,
}

/// How a set-user command touches the user's password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordUpdate {
    /// Send an empty `Passwd=`, removing the password on the terminal.
    Clear,
    /// Send `Passwd=<value>`.
    Set(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUser {
    pub pin: String,
    pub privilege: i64,
    /// `None` leaves the password field out of the directive entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteUser {
    pub pin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollFingerprint {
    pub pin: String,
    pub fid: i64,
    pub retry: u32,
    pub overwrite: bool,
}

/// Profile fields sent in the `DATA USER` line that precedes a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintOwner {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub privilege: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub group_no: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFingerprint {
    pub pin: String,
    pub finger_id: i64,
    /// Base64 template exactly as the source terminal uploaded it.
    pub template: String,
    #[serde(default)]
    pub owner: FingerprintOwner,
}

impl Command {
    /// Stable discriminator stored alongside the parameters.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Reboot => "reboot",
            Self::ClearLog => "clear_log",
            Self::Info => "info",
            Self::SetUser(_) => "set_user",
            Self::DeleteUser(_) => "delete_user",
            Self::EnrollFingerprint(_) => "enroll_fp",
            Self::PushFingerprint(_) => "data_fp",
            Self::ResyncCheck => "resync_check",
        }
    }

    /// Parameter JSON stored alongside the kind. Unit variants store `{}`.
    pub fn params_json(&self) -> Result<String> {
        let json = match self {
            Self::Reboot | Self::ClearLog | Self::Info | Self::ResyncCheck => "{}".to_string(),
            Self::SetUser(p) => serde_json::to_string(p)?,
            Self::DeleteUser(p) => serde_json::to_string(p)?,
            Self::EnrollFingerprint(p) => serde_json::to_string(p)?,
            Self::PushFingerprint(p) => serde_json::to_string(p)?,
        };
        Ok(json)
    }

    /// Rebuild a command from its stored `(kind, params)` pair.
    pub fn from_parts(kind: &str, params: &str) -> Result<Self> {
        let params = if params.trim().is_empty() { "{}" } else { params };
        let command = match kind {
            "reboot" => Self::Reboot,
            "clear_log" => Self::ClearLog,
            "info" => Self::Info,
            "resync_check" => Self::ResyncCheck,
            "set_user" => Self::SetUser(serde_json::from_str(params)?),
            "delete_user" => Self::DeleteUser(serde_json::from_str(params)?),
            "enroll_fp" => Self::EnrollFingerprint(serde_json::from_str(params)?),
            "data_fp" => Self::PushFingerprint(serde_json::from_str(params)?),
            other => return Err(Error::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Short label for operator-facing messages.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Reboot => "REBOOT",
            Self::ClearLog => "CLEAR LOG",
            Self::Info => "INFO",
            Self::SetUser(_) => "UPDATE USER",
            Self::DeleteUser(_) => "DELETE USER",
            Self::EnrollFingerprint(_) => "ENROLL_FP",
            Self::PushFingerprint(_) => "DATA_FP",
            Self::ResyncCheck => "CHECK",
        }
    }
}
