use crate::Instant;
use chrono::{Datelike as _, Months, NaiveDate, Weekday};

/// Which occurrence of its weekday `date` is within its month (1 to 5).
pub(crate) fn weekday_ordinal(date: NaiveDate) -> u8 {
    // day() is at most 31, so the ordinal always fits
    ((date.day() - 1) / 7 + 1) as u8
}

/// The `ordinal`th `weekday` of the month, or the last one when the month
/// has fewer.
pub(crate) fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: u8,
) -> Option<NaiveDate> {
    (1..=ordinal)
        .rev()
        .find_map(|n| NaiveDate::from_weekday_of_month_opt(year, month, weekday, n))
}

pub(crate) fn add_months(date: NaiveDate, months: u64) -> Option<NaiveDate> {
    let months = u32::try_from(months).ok()?;
    date.checked_add_months(Months::new(months))
}

/// `months` months after `start` on the same day of the month, clamped to
/// the last day of shorter months.
pub(crate) fn by_date(start: Instant, months: u64) -> Option<Instant> {
    let date = add_months(start.date_naive(), months)?;
    Some(date.and_time(start.time()).and_utc())
}

/// `months` months after `start` on the same ordinal weekday, e.g. the
/// third Tuesday.
pub(crate) fn by_weekday(start: Instant, months: u64) -> Option<Instant> {
    let date = start.date_naive();
    let first_of_month = add_months(date.with_day(1)?, months)?;
    let target = nth_weekday_of_month(
        first_of_month.year(),
        first_of_month.month(),
        date.weekday(),
        weekday_ordinal(date),
    )?;

    Some(target.and_time(start.time()).and_utc())
}
