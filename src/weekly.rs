use crate::Instant;

const DAYS_IN_WEEK: u64 = 7;

/// The date `weeks` weeks after `start`, on the same weekday and time.
pub(crate) fn nth(start: Instant, weeks: u64) -> Option<Instant> {
    weeks
        .checked_mul(DAYS_IN_WEEK)
        .and_then(|days| crate::daily::nth(start, days))
}
