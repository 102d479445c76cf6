//! OPERLOG upload: user profiles and fingerprint templates.
//!
//! ```text
//! USER PIN=336\tName=RACHMAT\tPri=0\tPasswd=\tCard=\tGrp=1\tTZ=0000000000000000\tVerify=0
//! FP PIN=66\tFID=6\tSize=1656\tValid=1\tTMP=<base64>
//! ```
//!
//! Other OPERLOG lines (`OPLOG`, access-control records) are ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub pin: String,
    pub name: String,
    pub privilege: i64,
    pub password: String,
    pub card: String,
    pub group_no: i64,
    pub timezone: String,
    pub verify_mode: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub pin: String,
    pub finger_id: i64,
    pub size: Option<i64>,
    pub valid: Option<i64>,
    pub template: String,
}

/// Records decoded from one OPERLOG body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationLog {
    pub users: Vec<UserRecord>,
    pub fingerprints: Vec<FingerprintRecord>,
}

impl OperationLog {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.fingerprints.is_empty()
    }
}

pub fn decode_operation_log(raw: &str) -> OperationLog {
    let mut log = OperationLog::default();

    for line in raw.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("USER ") {
            if let Some(user) = decode_user(&fields(rest)) {
                log.users.push(user);
            }
        } else if let Some(rest) = line.strip_prefix("FP ") {
            if let Some(fp) = decode_fingerprint(&fields(rest)) {
                log.fingerprints.push(fp);
            }
        }
    }

    log
}

fn fields(rest: &str) -> HashMap<&str, &str> {
    rest.split('\t')
        .filter_map(|field| {
            let (key, value) = field.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key, value.trim()))
        })
        .collect()
}

fn decode_user(f: &HashMap<&str, &str>) -> Option<UserRecord> {
    let pin = f.get("PIN").filter(|p| !p.is_empty())?;
    let text = |key: &str| f.get(key).map_or_else(String::new, |v| (*v).to_string());
    let int_or = |key: &str, default: i64| {
        f.get(key)
            .and_then(|v| v.parse().ok())
            .filter(|n| *n != 0)
            .unwrap_or(default)
    };

    Some(UserRecord {
        pin: (*pin).to_string(),
        name: text("Name"),
        privilege: int_or("Pri", 0),
        password: text("Passwd"),
        card: text("Card"),
        group_no: int_or("Grp", 1),
        timezone: text("TZ"),
        verify_mode: int_or("Verify", 0),
    })
}

fn decode_fingerprint(f: &HashMap<&str, &str>) -> Option<FingerprintRecord> {
    let pin = f.get("PIN").filter(|p| !p.is_empty())?;
    let finger_id = f.get("FID")?.parse().ok()?;
    let template = f.get("TMP").filter(|t| !t.is_empty())?;

    Some(FingerprintRecord {
        pin: (*pin).to_string(),
        finger_id,
        size: f.get("Size").and_then(|v| v.parse().ok()),
        valid: f.get("Valid").and_then(|v| v.parse().ok()),
        template: (*template).to_string(),
    })
}
