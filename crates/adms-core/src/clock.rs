//! Clock and timezone-label arithmetic for the trust policy.
//!
//! Unverified terminals are served a clock and timezone that lag the real
//! ones by a fixed number of hours. Terminals only understand `+HH:MM`
//! style labels, so the arithmetic is done on minute offsets and formatted
//! back into that shape.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Parse a `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH` label into minutes east of UTC.
pub fn parse_offset_minutes(label: &str) -> Option<i32> {
    let label = label.trim();
    let (sign, rest) = match label.as_bytes().first()? {
        b'+' => (1, &label[1..]),
        b'-' => (-1, &label[1..]),
        _ => return None,
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => (rest, "0"),
    };

    if hours.is_empty() || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    Some(sign * (hours * 60 + minutes))
}

/// Format minutes east of UTC as a `+HH:MM` label.
pub fn format_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}

/// Shift a timezone label back by `hours`.
///
/// Labels that do not parse are returned unchanged.
pub fn shift_timezone_label(label: &str, hours: i64) -> String {
    let Some(minutes) = parse_offset_minutes(label) else {
        return label.to_string();
    };
    let shift = i32::try_from(hours.saturating_mul(60)).unwrap_or(0);
    format_offset(minutes.saturating_sub(shift))
}

/// The wall clock reported to a terminal, lagging `now` by `lag_hours`.
pub fn lagged_clock(now: DateTime<Utc>, lag_hours: i64) -> NaiveDateTime {
    let lag = Duration::try_hours(lag_hours).unwrap_or_else(Duration::zero);
    (now - lag).naive_utc()
}
