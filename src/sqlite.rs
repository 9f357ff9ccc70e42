//! SQLite backed [`OccurrenceStore`].

use crate::store::{EntryId, FieldValue, LinkId, OccurrenceStore};
use crate::{from_timestamp, to_timestamp, Error, Instant, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS repeating_date_links (
        link_id INTEGER PRIMARY KEY AUTOINCREMENT,
        entry_id INTEGER NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS repeating_date_values (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entry_id INTEGER NOT NULL UNIQUE,
        link_id INTEGER NOT NULL,
        start_at INTEGER NOT NULL,
        end_at INTEGER NOT NULL,
        units INTEGER NOT NULL DEFAULT 1,
        mode TEXT NOT NULL DEFAULT 'weeks'
    )",
    "CREATE INDEX IF NOT EXISTS repeating_date_values_link ON repeating_date_values (link_id)",
    "CREATE INDEX IF NOT EXISTS repeating_date_values_start ON repeating_date_values (start_at)",
    "CREATE INDEX IF NOT EXISTS repeating_date_values_end ON repeating_date_values (end_at)",
    "CREATE TABLE IF NOT EXISTS repeating_date_dates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        link_id INTEGER NOT NULL,
        value INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS repeating_date_dates_link ON repeating_date_dates (link_id)",
    "CREATE INDEX IF NOT EXISTS repeating_date_dates_value ON repeating_date_dates (value)",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// A private in-memory database. It lives as long as the store.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Smallest stored timestamp that is not before `instant`.
fn timestamp_at_or_after(instant: Instant) -> i64 {
    to_timestamp(instant) + i64::from(instant.timestamp_subsec_nanos() > 0)
}

fn decode_instant(secs: i64) -> Result<Instant> {
    from_timestamp(secs).ok_or_else(|| {
        Error::Storage(sqlx::Error::Decode(
            format!("timestamp {secs} is out of range").into(),
        ))
    })
}

fn decode_value(row: &SqliteRow) -> Result<FieldValue> {
    let units: i64 = row.try_get("units")?;
    let units = u32::try_from(units).map_err(|e| Error::Storage(sqlx::Error::Decode(e.into())))?;
    let mode: String = row.try_get("mode")?;

    Ok(FieldValue {
        link_id: LinkId(row.try_get("link_id")?),
        start: decode_instant(row.try_get("start_at")?)?,
        end: decode_instant(row.try_get("end_at")?)?,
        units,
        mode: mode.parse()?,
    })
}

impl OccurrenceStore for SqliteStore {
    async fn link_id(&self, entry: EntryId) -> Result<LinkId> {
        sqlx::query(
            "INSERT INTO repeating_date_links (entry_id) VALUES (?)
             ON CONFLICT (entry_id) DO NOTHING",
        )
        .bind(entry.0)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT link_id FROM repeating_date_links WHERE entry_id = ?")
            .bind(entry.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(LinkId(row.try_get("link_id")?))
    }

    #[tracing::instrument(level = "debug", skip(self, value, dates), fields(link = %value.link_id, count = dates.len()))]
    async fn save(&self, entry: EntryId, value: &FieldValue, dates: &[Instant]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO repeating_date_values (entry_id, link_id, start_at, end_at, units, mode)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (entry_id) DO UPDATE SET
                link_id = excluded.link_id,
                start_at = excluded.start_at,
                end_at = excluded.end_at,
                units = excluded.units,
                mode = excluded.mode",
        )
        .bind(entry.0)
        .bind(value.link_id.0)
        .bind(to_timestamp(value.start))
        .bind(to_timestamp(value.end))
        .bind(i64::from(value.units))
        .bind(value.mode.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO repeating_date_links (entry_id, link_id) VALUES (?, ?)
             ON CONFLICT (entry_id) DO UPDATE SET link_id = excluded.link_id",
        )
        .bind(entry.0)
        .bind(value.link_id.0)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM repeating_date_dates WHERE link_id = ?")
            .bind(value.link_id.0)
            .execute(&mut *tx)
            .await?;

        for date in dates {
            sqlx::query("INSERT INTO repeating_date_dates (link_id, value) VALUES (?, ?)")
                .bind(value.link_id.0)
                .bind(to_timestamp(*date))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, dates), fields(count = dates.len()))]
    async fn replace_occurrences(&self, link: LinkId, dates: &[Instant]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM repeating_date_dates WHERE link_id = ?")
            .bind(link.0)
            .execute(&mut *tx)
            .await?;

        for date in dates {
            sqlx::query("INSERT INTO repeating_date_dates (link_id, value) VALUES (?, ?)")
                .bind(link.0)
                .bind(to_timestamp(*date))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn value(&self, entry: EntryId) -> Result<Option<FieldValue>> {
        let row = sqlx::query(
            "SELECT link_id, start_at, end_at, units, mode
             FROM repeating_date_values WHERE entry_id = ?",
        )
        .bind(entry.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_value).transpose()
    }

    async fn occurrences(&self, link: LinkId) -> Result<Vec<Instant>> {
        let rows = sqlx::query(
            "SELECT value FROM repeating_date_dates WHERE link_id = ? ORDER BY value ASC",
        )
        .bind(link.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Instant> { decode_instant(row.try_get("value")?) })
            .collect()
    }

    async fn next_occurrences(&self, reference: Instant) -> Result<HashMap<LinkId, Instant>> {
        let rows = sqlx::query(
            "SELECT link_id, MIN(value) AS next FROM repeating_date_dates
             WHERE value >= ? GROUP BY link_id",
        )
        .bind(timestamp_at_or_after(reference))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<(LinkId, Instant)> {
                Ok((
                    LinkId(row.try_get("link_id")?),
                    decode_instant(row.try_get("next")?)?,
                ))
            })
            .collect()
    }

    async fn entries_ending_after(&self, instant: Instant) -> Result<Vec<EntryId>> {
        let rows = sqlx::query(
            "SELECT entry_id FROM repeating_date_values WHERE end_at > ? ORDER BY entry_id ASC",
        )
        .bind(to_timestamp(instant))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<EntryId> { Ok(EntryId(row.try_get("entry_id")?)) })
            .collect()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete(&self, entry: EntryId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM repeating_date_dates WHERE link_id IN
                (SELECT link_id FROM repeating_date_links WHERE entry_id = ?)",
        )
        .bind(entry.0)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM repeating_date_values WHERE entry_id = ?")
            .bind(entry.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM repeating_date_links WHERE entry_id = ?")
            .bind(entry.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
