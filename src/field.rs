//! The repeating date field: validation, expansion, storage and output
//! wired together over an [`OccurrenceStore`].

use crate::config::FieldSettings;
use crate::render::{self, RenderSink};
use crate::store::{EntryId, FieldValue, LinkId, OccurrenceStore};
use crate::{generate_with_limit, Error, FieldInput, Instant, RepeatMode, Result, ValidationError};
use rand::seq::SliceRandom as _;
use rand::Rng;
use std::cmp::Ordering;
use std::str::FromStr;

/// How entries are ordered when sorting on this field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Soonest upcoming occurrence first.
    #[default]
    Ascending,
    Descending,
    Random,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            "random" | "rand" => Ok(SortOrder::Random),
            _ => Err(Error::Config(format!("unknown sort order '{s}'"))),
        }
    }
}

/// Values to show in the publish form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishForm {
    pub start: Option<String>,
    pub end: Option<String>,
    pub units: u32,
    pub mode: RepeatMode,
}

const FORM_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub struct RepeatingDateField<S> {
    settings: FieldSettings,
    store: S,
}

impl<S: OccurrenceStore> RepeatingDateField<S> {
    pub fn new(settings: FieldSettings, store: S) -> Self {
        RepeatingDateField { settings, store }
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates posted data without touching storage.
    pub fn check(&self, input: &FieldInput) -> std::result::Result<(), ValidationError> {
        input.check(&self.settings.label).inspect_err(|e| {
            tracing::warn!(field = %self.settings.label, error = %e, "rejected input");
        })
    }

    fn expand(&self, input: FieldInput, link: LinkId) -> Result<(FieldValue, Vec<Instant>)> {
        let spec = input.into_spec(&self.settings.label)?;
        let dates = generate_with_limit(&spec, self.settings.max_occurrences)?;
        Ok((FieldValue::new(link, &spec), dates))
    }

    /// Expands the input without storing anything.
    pub fn simulate(&self, input: FieldInput) -> Result<FieldValue> {
        self.expand(input, LinkId(0)).map(|(value, _)| value)
    }

    /// Validates and expands `input`, then replaces whatever `entry` had
    /// stored. Nothing is written if any step before storage fails.
    #[tracing::instrument(skip(self, input), fields(field = %self.settings.label))]
    pub async fn process(&self, entry: EntryId, input: FieldInput) -> Result<FieldValue> {
        let (value, dates) = self.expand(input, LinkId(0))?;
        let link_id = self.store.link_id(entry).await?;
        let value = FieldValue { link_id, ..value };

        self.store.save(entry, &value, &dates).await?;
        tracing::debug!(link = %link_id, count = dates.len(), "stored occurrences");
        Ok(value)
    }

    /// Regenerates the stored occurrences of `entry` from its stored value.
    pub async fn regenerate(&self, entry: EntryId) -> Result<Option<Vec<Instant>>> {
        let Some(value) = self.store.value(entry).await? else {
            return Ok(None);
        };
        let spec = value.spec()?;
        let dates = generate_with_limit(&spec, self.settings.max_occurrences)?;
        self.store.replace_occurrences(value.link_id, &dates).await?;
        Ok(Some(dates))
    }

    /// Renders `entry` into `sink`. Entries without a value render nothing.
    pub async fn render(
        &self,
        entry: EntryId,
        reference: Instant,
        sink: &mut impl RenderSink,
    ) -> Result<bool> {
        let Some(value) = self.store.value(entry).await? else {
            return Ok(false);
        };
        let dates = self.store.occurrences(value.link_id).await?;

        render::tag(&value, &dates, reference).write_to(&self.settings.handle(), sink)?;
        Ok(true)
    }

    pub async fn table_value(&self, entry: EntryId, reference: Instant) -> Result<Option<String>> {
        let Some(value) = self.store.value(entry).await? else {
            return Ok(None);
        };
        let dates = self.store.occurrences(value.link_id).await?;
        Ok(Some(render::table_value(&value, &dates, reference)))
    }

    /// Entries whose recurrence has not fully elapsed by `instant`.
    pub async fn filter(&self, instant: Instant) -> Result<Vec<EntryId>> {
        self.store.entries_ending_after(instant).await
    }

    /// Orders `entries` by their next occurrence at or after `reference`.
    ///
    /// Entries with nothing upcoming go last in either direction; ties keep
    /// entry id order. `Random` ignores the occurrences altogether.
    pub async fn sort<R: Rng + ?Sized>(
        &self,
        entries: &[EntryId],
        order: SortOrder,
        reference: Instant,
        rng: &mut R,
    ) -> Result<Vec<EntryId>> {
        let mut entries = entries.to_vec();

        if order == SortOrder::Random {
            entries.shuffle(rng);
            return Ok(entries);
        }

        let next = self.store.next_occurrences(reference).await?;
        let mut keyed = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = self
                .store
                .value(entry)
                .await?
                .and_then(|value| next.get(&value.link_id).copied());
            keyed.push((entry, key));
        }

        keyed.sort_by(|(a_entry, a), (b_entry, b)| {
            let by_date = match (a, b) {
                (Some(a), Some(b)) if order == SortOrder::Descending => b.cmp(a),
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_date.then(a_entry.cmp(b_entry))
        });

        Ok(keyed.into_iter().map(|(entry, _)| entry).collect())
    }

    /// What the publish form shows for `existing`, defaulting empty dates to
    /// `now` when the field pre-populates.
    pub fn prefill(&self, existing: Option<&FieldValue>, now: Instant) -> PublishForm {
        let format = |instant: Instant| instant.format(FORM_DATETIME_FORMAT).to_string();

        match existing {
            Some(value) => PublishForm {
                start: Some(format(value.start)),
                end: Some(format(value.end)),
                units: value.units.max(1),
                mode: value.mode,
            },
            None => {
                let default = self.settings.pre_populate.then(|| format(now));
                PublishForm {
                    start: default.clone(),
                    end: default,
                    units: 1,
                    mode: RepeatMode::default(),
                }
            }
        }
    }

    #[tracing::instrument(skip(self), fields(field = %self.settings.label))]
    pub async fn delete(&self, entry: EntryId) -> Result<()> {
        self.store.delete(entry).await
    }
}
