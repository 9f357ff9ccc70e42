use crate::{Error, Instant, RecurrenceSpec, RepeatMode, Result};
use std::iter::FusedIterator;

/// Upper bound on the occurrences a single recurrence may expand to.
pub const DEFAULT_MAX_OCCURRENCES: usize = 50_000;

/// Walks the repeat points of a recurrence strictly after its start, up to
/// and including its end.
///
/// Yields `Err(Error::TooLarge)` once instead of going past `limit`
/// occurrences, then stops.
pub struct DateIterator {
    start: Instant,
    end: Instant,
    units: u64,
    mode: RepeatMode,
    emitted: u64,
    limit: usize,
    done: bool,
}

impl DateIterator {
    pub fn new(spec: &RecurrenceSpec, limit: usize) -> Self {
        DateIterator {
            start: spec.start(),
            end: spec.end(),
            units: u64::from(spec.units()),
            mode: spec.mode(),
            emitted: 0,
            limit,
            done: false,
        }
    }
}

impl Iterator for DateIterator {
    type Item = Result<Instant>;

    fn next(&mut self) -> Option<Result<Instant>> {
        if self.done {
            return None;
        }

        let step = self.emitted + 1;
        let candidate = step
            .checked_mul(self.units)
            .and_then(|steps| self.mode.nth(self.start, steps));

        match candidate {
            Some(next) if next <= self.end => {
                if self.emitted >= self.limit as u64 {
                    self.done = true;
                    return Some(Err(Error::TooLarge { limit: self.limit }));
                }

                self.emitted = step;
                Some(Ok(next))
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

impl FusedIterator for DateIterator {}

/// Expands `spec` into its interior occurrences.
pub fn generate(spec: &RecurrenceSpec) -> Result<Vec<Instant>> {
    generate_with_limit(spec, DEFAULT_MAX_OCCURRENCES)
}

pub fn generate_with_limit(spec: &RecurrenceSpec, limit: usize) -> Result<Vec<Instant>> {
    let dates = DateIterator::new(spec, limit).collect::<Result<Vec<_>>>()?;
    tracing::debug!(
        mode = %spec.mode(),
        units = spec.units(),
        count = dates.len(),
        "generated occurrences"
    );
    Ok(dates)
}
