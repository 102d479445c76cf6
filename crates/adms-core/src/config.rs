//! Protocol policy configuration.
//!
//! Values are injected by the binary (CLI flags / env); nothing in the core
//! reads the environment itself.

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::error::{Error, Result};

/// Policy knobs for the terminal protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Timezone label recorded for terminals and advertised to verified ones.
    pub default_timezone: String,
    /// Hours by which clock and timezone are lagged for unverified terminals.
    pub unverified_offset_hours: i64,
    /// Seconds without contact after which a terminal is considered offline.
    pub offline_after_secs: i64,
    /// `RETRY` used by enroll-fingerprint when the operator gives none.
    pub enroll_retry: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            default_timezone: "+07:00".to_string(),
            unverified_offset_hours: 5,
            offline_after_secs: 300,
            enroll_retry: 1,
        }
    }
}

impl ProtocolConfig {
    /// Reject values the protocol cannot express.
    pub fn validate(&self) -> Result<()> {
        if clock::parse_offset_minutes(&self.default_timezone).is_none() {
            return Err(Error::Config(format!(
                "default timezone must look like +HH:MM, got {:?}",
                self.default_timezone
            )));
        }
        if !(0..=24).contains(&self.unverified_offset_hours) {
            return Err(Error::Config(format!(
                "unverified offset must be between 0 and 24 hours, got {}",
                self.unverified_offset_hours
            )));
        }
        if self.offline_after_secs <= 0 {
            return Err(Error::Config("offline threshold must be positive".into()));
        }
        Ok(())
    }

    /// Hours of clock lag applied to a terminal given its trust.
    pub const fn clock_lag_hours(&self, verified: bool) -> i64 {
        if verified { 0 } else { self.unverified_offset_hours }
    }

    /// Timezone label to advertise in the handshake.
    pub fn advertised_timezone(&self, device_timezone: Option<&str>, verified: bool) -> String {
        let base = device_timezone
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or(&self.default_timezone);
        clock::shift_timezone_label(base, self.clock_lag_hours(verified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ProtocolConfig::default().validate().unwrap();
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let config = ProtocolConfig {
            default_timezone: "Jakarta".into(),
            ..ProtocolConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn non_ascii_timezone_is_rejected() {
        let config = ProtocolConfig {
            default_timezone: "+a€".into(),
            ..ProtocolConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn offset_out_of_range_is_rejected() {
        let config = ProtocolConfig {
            unverified_offset_hours: 48,
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn verified_terminal_gets_its_own_timezone() {
        let config = ProtocolConfig::default();
        assert_eq!(config.advertised_timezone(Some("+08:00"), true), "+08:00");
        assert_eq!(config.advertised_timezone(None, true), "+07:00");
    }

    #[test]
    fn unverified_terminal_gets_lagged_timezone() {
        let config = ProtocolConfig::default();
        assert_eq!(config.advertised_timezone(Some("+07:00"), false), "+02:00");
        assert_eq!(config.advertised_timezone(Some(""), false), "+02:00");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: ProtocolConfig =
            serde_json::from_str(r#"{"unverified_offset_hours": 3}"#).unwrap();
        assert_eq!(config.unverified_offset_hours, 3);
        assert_eq!(config.default_timezone, "+07:00");
        assert_eq!(config.enroll_retry, 1);
    }
}
