use crate::monthly;
use crate::Instant;
use chrono::{Datelike as _, NaiveDate};

const MONTHS_IN_YEAR: u64 = 12;

/// `years` years after `start` on the same month and day. February 29th
/// becomes February 28th outside leap years.
pub(crate) fn by_date(start: Instant, years: u64) -> Option<Instant> {
    years
        .checked_mul(MONTHS_IN_YEAR)
        .and_then(|months| monthly::by_date(start, months))
}

/// `years` years after `start` in the same month on the same ordinal
/// weekday.
pub(crate) fn by_weekday(start: Instant, years: u64) -> Option<Instant> {
    let date = start.date_naive();
    let year = i32::try_from(years)
        .ok()
        .and_then(|years| date.year().checked_add(years))?;
    // validates the target year is representable
    NaiveDate::from_ymd_opt(year, date.month(), 1)?;

    let target = monthly::nth_weekday_of_month(
        year,
        date.month(),
        date.weekday(),
        monthly::weekday_ordinal(date),
    )?;

    Some(target.and_time(start.time()).and_utc())
}
