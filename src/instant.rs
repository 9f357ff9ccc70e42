use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound as _, Utc};

/// A calendar instant. All arithmetic happens in UTC.
pub type Instant = DateTime<Utc>;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parses a date as typed into the publish form.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ HH:MM[:SS]]` (with either a space or a
/// `T` separator) and plain unix timestamps. Dates without a time are
/// taken as midnight UTC. Fractional seconds are dropped, matching what
/// storage keeps.
pub fn parse_instant(input: &str) -> Option<Instant> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc).trunc_subsecs(0));
    }

    if let Some(naive) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
    {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    input
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Storage representation: whole seconds since the unix epoch.
pub fn to_timestamp(instant: Instant) -> i64 {
    instant.timestamp()
}

pub fn from_timestamp(secs: i64) -> Option<Instant> {
    DateTime::from_timestamp(secs, 0)
}
