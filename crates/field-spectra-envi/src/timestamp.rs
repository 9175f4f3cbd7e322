//! Capture timestamp extraction.
//!
//! The high-resolution header of a capture starts its description block
//! with two lines of the form `Date: 08/15/2017,` and `Time: 5:57:02.34 P,`.
//! The time is 12-hour wall time at the field site, marked `A` or `P`, and
//! the site clock runs at a fixed +02:00 offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::header::{EnviError, EnviHeader};

/// Fixed UTC offset of the field-site clock, in hours.
pub const CAPTURE_UTC_OFFSET_HOURS: i32 = 2;

/// Extract the capture timestamp from a header's description block.
pub fn capture_datetime(header: &EnviHeader) -> Result<DateTime<Utc>, EnviError> {
    let description = header
        .description
        .as_deref()
        .ok_or(EnviError::MissingTimestamp {
            what: "description",
        })?;
    let mut lines = description.lines();
    let date_line = lines
        .next()
        .ok_or(EnviError::MissingTimestamp { what: "date" })?;
    let time_line = lines
        .next()
        .ok_or(EnviError::MissingTimestamp { what: "time" })?;

    let date = date_from_line(date_line)?;
    let time = time_from_line(time_line)?;

    let offset = FixedOffset::east_opt(CAPTURE_UTC_OFFSET_HOURS * 3600)
        .ok_or(EnviError::MissingTimestamp { what: "offset" })?;
    let local = date
        .and_time(time)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| EnviError::BadTimestamp {
            what: "datetime",
            value: format!("{date} {time}"),
        })?;
    Ok(local.with_timezone(&Utc))
}

/// Parse `Date: MM/DD/YYYY,`.
fn date_from_line(line: &str) -> Result<NaiveDate, EnviError> {
    let raw = line
        .trim()
        .strip_prefix("Date:")
        .ok_or(EnviError::MissingTimestamp { what: "date" })?
        .trim()
        .trim_end_matches(',');
    NaiveDate::parse_from_str(raw, "%m/%d/%Y").map_err(|_| EnviError::BadTimestamp {
        what: "date",
        value: raw.to_owned(),
    })
}

/// Parse `Time: h:mm:ss.ss P,` into 24-hour wall time.
fn time_from_line(line: &str) -> Result<NaiveTime, EnviError> {
    let raw = line
        .trim()
        .strip_prefix("Time:")
        .ok_or(EnviError::MissingTimestamp { what: "time" })?
        .trim()
        .trim_end_matches(',');
    let bad = || EnviError::BadTimestamp {
        what: "time",
        value: raw.to_owned(),
    };

    let (clock, marker) = raw.rsplit_once(' ').ok_or_else(bad)?;
    // Fractional seconds are dropped, the capture cadence is minutes.
    let clock = clock.split('.').next().ok_or_else(bad)?;
    let mut parts = clock.split(':');
    let hour: u32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    let minute: u32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    let second: u32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;

    let hour = to_24_hour(hour, marker.starts_with('P'));
    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(bad)
}

/// Apply the `A`/`P` marker to a 12-hour clock reading.
fn to_24_hour(hour: u32, is_pm: bool) -> u32 {
    if is_pm && hour < 12 {
        (hour + 12) % 24
    } else {
        hour
    }
}
