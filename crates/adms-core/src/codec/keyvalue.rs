//! Device info blobs (`POST /iclock/devicecmd`) and the heartbeat `INFO` CSV.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Terminal key → normalised key. Keys not listed pass through unchanged.
const KEY_RENAMES: &[(&str, &str)] = &[
    ("DeviceName", "deviceName"),
    ("MAC", "mac"),
    ("UserCount", "userCount"),
    ("TransactionCount", "transactionCount"),
    ("MainTime", "mainTime"),
    ("Platform", "platform"),
    ("FWVersion", "fwVersion"),
    ("IPAddress", "ipAddress"),
];

/// Decode a `key=value` blob separated by `&` or newlines.
///
/// A leading `~` on a key is stripped. Pairs without `=` or with an empty
/// key are dropped. A repeated key keeps its last value.
pub fn decode_key_value_blob(raw: &str) -> BTreeMap<String, String> {
    let normalized = raw.replace("\r\n", "&").replace('\n', "&");

    let mut pairs = BTreeMap::new();
    for pair in normalized.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.strip_prefix('~').unwrap_or(key);
        if key.is_empty() {
            continue;
        }
        let key = KEY_RENAMES
            .iter()
            .find(|(wire, _)| *wire == key)
            .map_or(key, |&(_, renamed)| renamed);
        pairs.insert(key.to_string(), value.to_string());
    }
    pairs
}

/// Variable telemetry reported by a terminal. Absent fields are left
/// untouched when applied to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTelemetry {
    pub device_name: Option<String>,
    pub mac: Option<String>,
    pub user_count: Option<i64>,
    pub transaction_count: Option<i64>,
    pub main_time: Option<String>,
    pub platform: Option<String>,
    pub fw_version: Option<String>,
    pub ip_address: Option<String>,
}

impl DeviceTelemetry {
    /// Pick the known fields out of a decoded blob. Counters that do not
    /// parse as integers are treated as absent.
    pub fn from_key_values(pairs: &BTreeMap<String, String>) -> Self {
        let text = |key: &str| pairs.get(key).cloned();
        let count = |key: &str| pairs.get(key).and_then(|v| v.trim().parse().ok());

        Self {
            device_name: text("deviceName"),
            mac: text("mac"),
            user_count: count("userCount"),
            transaction_count: count("transactionCount"),
            main_time: text("mainTime"),
            platform: text("platform"),
            fw_version: text("fwVersion"),
            ip_address: text("ipAddress"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Decode the `INFO` query parameter of a heartbeat.
///
/// Layout: `fwVersion,userCount,transactionCount,<unused>,ipAddress,...`.
/// Empty positions are absent.
pub fn decode_info_csv(raw: &str) -> DeviceTelemetry {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let part = |i: usize| parts.get(i).copied().filter(|p| !p.is_empty());

    DeviceTelemetry {
        fw_version: part(0).map(str::to_string),
        user_count: part(1).and_then(|p| p.parse().ok()),
        transaction_count: part(2).and_then(|p| p.parse().ok()),
        ip_address: part(4).map(str::to_string),
        ..DeviceTelemetry::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ampersand_blob_is_decoded_and_renamed() {
        let pairs = decode_key_value_blob("~DeviceName=Front Door&MAC=00:17:61:AA:BB:CC&UserCount=12");
        assert_eq!(pairs["deviceName"], "Front Door");
        assert_eq!(pairs["mac"], "00:17:61:AA:BB:CC");
        assert_eq!(pairs["userCount"], "12");
    }

    #[test]
    fn newline_blob_is_decoded() {
        let pairs = decode_key_value_blob("FWVersion=Ver 6.60\r\n~Platform=ZMM220_TFT\nIPAddress=10.0.0.5\n");
        assert_eq!(pairs["fwVersion"], "Ver 6.60");
        assert_eq!(pairs["platform"], "ZMM220_TFT");
        assert_eq!(pairs["ipAddress"], "10.0.0.5");
    }

    #[test]
    fn unknown_keys_pass_through() {
        let pairs = decode_key_value_blob("FPCount=40&~OEMVendor=ZK");
        assert_eq!(pairs["FPCount"], "40");
        assert_eq!(pairs["OEMVendor"], "ZK");
    }

    #[test]
    fn value_may_contain_equals() {
        let pairs = decode_key_value_blob("MainTime=a=b");
        assert_eq!(pairs["mainTime"], "a=b");
    }

    #[test]
    fn pairs_without_key_or_separator_are_dropped() {
        let pairs = decode_key_value_blob("=orphan&noequals&~=x&&");
        assert!(pairs.is_empty());
    }

    #[test]
    fn telemetry_parses_counters() {
        let pairs = decode_key_value_blob("UserCount=12&TransactionCount=abc&Platform=X");
        let telemetry = DeviceTelemetry::from_key_values(&pairs);
        assert_eq!(telemetry.user_count, Some(12));
        assert_eq!(telemetry.transaction_count, None);
        assert_eq!(telemetry.platform.as_deref(), Some("X"));
        assert!(telemetry.mac.is_none());
    }

    #[test]
    fn info_csv_picks_positions() {
        let telemetry = decode_info_csv("Ver 8.0.4.2-20210315,35,1200,0,192.168.1.201,10,7,15");
        assert_eq!(telemetry.fw_version.as_deref(), Some("Ver 8.0.4.2-20210315"));
        assert_eq!(telemetry.user_count, Some(35));
        assert_eq!(telemetry.transaction_count, Some(1200));
        assert_eq!(telemetry.ip_address.as_deref(), Some("192.168.1.201"));
        assert!(telemetry.device_name.is_none());
    }

    #[test]
    fn info_csv_with_gaps() {
        let telemetry = decode_info_csv("Ver 6.60,,");
        assert_eq!(telemetry.fw_version.as_deref(), Some("Ver 6.60"));
        assert!(telemetry.user_count.is_none());
        assert!(telemetry.ip_address.is_none());
        assert!(decode_info_csv("").is_empty());
    }
}
