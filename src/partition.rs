use crate::Instant;

/// Occurrences split around a reference instant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub before: Vec<Instant>,
    pub current: Option<Instant>,
    pub after: Vec<Instant>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.before.len() + usize::from(self.current.is_some()) + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reassembles the occurrences in their original order.
    pub fn into_occurrences(self) -> Vec<Instant> {
        let mut all = self.before;
        all.extend(self.current);
        all.extend(self.after);
        all
    }
}

/// Splits ordered `occurrences` into those before `reference`, the first
/// one at or after it, and the rest.
///
/// Nothing is dropped: the buckets together always hold every input.
pub fn partition(occurrences: &[Instant], reference: Instant) -> Partition {
    let split = occurrences
        .iter()
        .position(|date| *date >= reference)
        .unwrap_or(occurrences.len());
    let (before, rest) = occurrences.split_at(split);

    match rest.split_first() {
        Some((current, after)) => Partition {
            before: before.to_vec(),
            current: Some(*current),
            after: after.to_vec(),
        },
        None => Partition {
            before: before.to_vec(),
            current: None,
            after: Vec::new(),
        },
    }
}
