//! Persistence of field values and their expanded occurrences.
//!
//! Each entry owns one [`FieldValue`] and, through its [`LinkId`], one set
//! of occurrences. The set is only ever replaced as a whole.

use crate::{Instant, RecurrenceSpec, RepeatMode, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub i64);

/// Groups the occurrences generated for one entry's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The stored value of a repeating date field for one entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub link_id: LinkId,
    pub start: Instant,
    pub end: Instant,
    pub units: u32,
    pub mode: RepeatMode,
}

impl FieldValue {
    pub fn new(link_id: LinkId, spec: &RecurrenceSpec) -> Self {
        FieldValue {
            link_id,
            start: spec.start(),
            end: spec.end(),
            units: spec.units(),
            mode: spec.mode(),
        }
    }

    pub fn spec(&self) -> std::result::Result<RecurrenceSpec, ValidationError> {
        RecurrenceSpec::new(self.start, self.end, self.units, self.mode)
    }
}

/// Storage for field values and occurrence sets.
///
/// Implementations must make `save`, `replace_occurrences` and `delete`
/// atomic: a concurrent reader sees either the old or the new occurrence
/// set of a link, never a mix.
pub trait OccurrenceStore {
    /// The link owned by `entry`, allocating one on first use.
    fn link_id(&self, entry: EntryId) -> impl Future<Output = Result<LinkId>> + Send;

    /// Stores `value` for `entry` and replaces its link's occurrences.
    fn save(
        &self,
        entry: EntryId,
        value: &FieldValue,
        dates: &[Instant],
    ) -> impl Future<Output = Result<()>> + Send;

    fn replace_occurrences(
        &self,
        link: LinkId,
        dates: &[Instant],
    ) -> impl Future<Output = Result<()>> + Send;

    fn value(&self, entry: EntryId) -> impl Future<Output = Result<Option<FieldValue>>> + Send;

    /// Occurrences of `link`, earliest first.
    fn occurrences(&self, link: LinkId) -> impl Future<Output = Result<Vec<Instant>>> + Send;

    /// For every link, its earliest occurrence at or after `reference`.
    /// Links with nothing left are absent.
    fn next_occurrences(
        &self,
        reference: Instant,
    ) -> impl Future<Output = Result<HashMap<LinkId, Instant>>> + Send;

    /// Entries whose recurrence ends strictly after `instant`, by id.
    fn entries_ending_after(
        &self,
        instant: Instant,
    ) -> impl Future<Output = Result<Vec<EntryId>>> + Send;

    /// Removes the entry's value, link and occurrences.
    fn delete(&self, entry: EntryId) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Default)]
struct Tables {
    links: HashMap<EntryId, LinkId>,
    values: BTreeMap<EntryId, FieldValue>,
    dates: HashMap<LinkId, Vec<Instant>>,
    last_link: i64,
}

/// Keeps everything in memory behind a single lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.tables.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        f(&mut self.tables.write().unwrap_or_else(PoisonError::into_inner))
    }
}

fn sorted(dates: &[Instant]) -> Vec<Instant> {
    let mut dates = dates.to_vec();
    dates.sort_unstable();
    dates
}

impl OccurrenceStore for MemoryStore {
    async fn link_id(&self, entry: EntryId) -> Result<LinkId> {
        Ok(self.write(|tables| {
            if let Some(link) = tables.links.get(&entry) {
                return *link;
            }
            tables.last_link += 1;
            let link = LinkId(tables.last_link);
            tables.links.insert(entry, link);
            link
        }))
    }

    #[tracing::instrument(level = "debug", skip(self, value, dates), fields(link = %value.link_id, count = dates.len()))]
    async fn save(&self, entry: EntryId, value: &FieldValue, dates: &[Instant]) -> Result<()> {
        let dates = sorted(dates);
        self.write(|tables| {
            tables.links.insert(entry, value.link_id);
            tables.values.insert(entry, value.clone());
            tables.dates.insert(value.link_id, dates);
        });
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, dates), fields(count = dates.len()))]
    async fn replace_occurrences(&self, link: LinkId, dates: &[Instant]) -> Result<()> {
        let dates = sorted(dates);
        self.write(|tables| tables.dates.insert(link, dates));
        Ok(())
    }

    async fn value(&self, entry: EntryId) -> Result<Option<FieldValue>> {
        Ok(self.read(|tables| tables.values.get(&entry).cloned()))
    }

    async fn occurrences(&self, link: LinkId) -> Result<Vec<Instant>> {
        Ok(self.read(|tables| tables.dates.get(&link).cloned().unwrap_or_default()))
    }

    async fn next_occurrences(&self, reference: Instant) -> Result<HashMap<LinkId, Instant>> {
        Ok(self.read(|tables| {
            tables
                .dates
                .iter()
                .filter_map(|(link, dates)| {
                    crate::next_occurrence(dates.iter().copied(), reference)
                        .map(|next| (*link, next))
                })
                .collect()
        }))
    }

    async fn entries_ending_after(&self, instant: Instant) -> Result<Vec<EntryId>> {
        Ok(self.read(|tables| {
            tables
                .values
                .iter()
                .filter(|(_, value)| value.end > instant)
                .map(|(entry, _)| *entry)
                .collect()
        }))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete(&self, entry: EntryId) -> Result<()> {
        self.write(|tables| {
            tables.values.remove(&entry);
            if let Some(link) = tables.links.remove(&entry) {
                tables.dates.remove(&link);
            }
        });
        Ok(())
    }
}
