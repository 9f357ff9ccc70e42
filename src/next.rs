use crate::Instant;

/// The earliest occurrence at or after `reference`.
///
/// `occurrences` need not be sorted.
pub fn next_occurrence<I>(occurrences: I, reference: Instant) -> Option<Instant>
where
    I: IntoIterator<Item = Instant>,
{
    occurrences
        .into_iter()
        .filter(|date| *date >= reference)
        .min()
}
