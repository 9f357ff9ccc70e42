//! Recurring dates for content fields.
//!
//! A recurrence is a start, an end and a repeat pattern ("every 2 weeks",
//! "every month on the third Tuesday"). It is expanded once into the
//! concrete dates between start and end, those dates are stored, and at
//! output time they are split into past, current and upcoming around a
//! reference date.

mod daily;
mod date_iterator;
mod error;
mod instant;
mod mode;
mod monthly;
mod next;
mod partition;
mod spec;
mod weekly;
mod yearly;

pub mod config;
pub mod field;
pub mod render;
pub mod sqlite;
pub mod store;

pub use config::FieldSettings;
pub use date_iterator::{generate, generate_with_limit, DateIterator, DEFAULT_MAX_OCCURRENCES};
pub use error::{Error, Result, ValidationError};
pub use field::{PublishForm, RepeatingDateField, SortOrder};
pub use instant::{from_timestamp, parse_instant, to_timestamp, Instant};
pub use mode::RepeatMode;
pub use next::next_occurrence;
pub use partition::{partition, Partition};
pub use spec::{FieldInput, RecurrenceSpec};
pub use store::{EntryId, FieldValue, LinkId, MemoryStore, OccurrenceStore};
