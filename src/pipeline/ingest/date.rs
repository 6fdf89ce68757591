//! Hospital-export timestamps: `yyyyMMdd` with optional `HHmmss`,
//! e.g. `20251014144355`.

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};

/// Instant returned for anything that is not a valid timestamp.
pub const INVALID_INSTANT: i64 = 0;

fn digits(raw: &str, range: std::ops::Range<usize>) -> Option<u32> {
    let part = raw.get(range)?;
    if part.bytes().all(|b| b.is_ascii_digit()) {
        part.parse().ok()
    } else {
        None
    }
}

/// Parse the fixed numeric layout into a calendar date-time.
///
/// Fewer than 8 characters, non-digit characters or an impossible
/// calendar value yield `None`. The time part is read only when at
/// least 14 characters are present.
pub fn parse_his_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.len() < 8 {
        return None;
    }

    let year = digits(raw, 0..4)? as i32;
    let month = digits(raw, 4..6)?;
    let day = digits(raw, 6..8)?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    if raw.len() >= 14 {
        let hour = digits(raw, 8..10)?;
        let minute = digits(raw, 10..12)?;
        let second = digits(raw, 12..14)?;
        date.and_hms_opt(hour, minute, second)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
}

/// Local wall-clock time → epoch milliseconds.
///
/// A time skipped by a DST jump has no instant and yields `None`;
/// an ambiguous one resolves to the earlier instant.
pub fn local_instant(datetime: NaiveDateTime) -> Option<i64> {
    Local
        .from_local_datetime(&datetime)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// Parse to epoch milliseconds, or [`INVALID_INSTANT`].
pub fn parse_his_instant(raw: &str) -> i64 {
    parse_his_datetime(raw)
        .and_then(local_instant)
        .filter(|millis| *millis > 0)
        .unwrap_or(INVALID_INSTANT)
}
