use crate::Instant;
use chrono::Days;

/// The date `days` days after `start`, at the same time of day.
pub(crate) fn nth(start: Instant, days: u64) -> Option<Instant> {
    start.checked_add_days(Days::new(days))
}
