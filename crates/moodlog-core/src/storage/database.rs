//! SQLite-based entry storage.
//!
//! Provides persistent storage for:
//! - Hourly mood entries (one row per hour-bucket, upserted)
//! - Key-value store for tracking state
//! - The deferred work queue (see [`crate::scheduler::queue`])

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result};
use crate::hour::HourBucket;

/// The mood recorded for one calendar hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub bucket: HourBucket,
    pub recorded_at: DateTime<FixedOffset>,
    pub mood: String,
}

impl MoodEntry {
    pub fn new(bucket: HourBucket, recorded_at: DateTime<FixedOffset>, mood: &str) -> Self {
        Self {
            bucket,
            recorded_at,
            mood: mood.to_string(),
        }
    }
}

/// SQLite database for entries, tracking flags and queued work.
pub struct Database {
    conn: Connection,
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode_entry((hour_id, recorded_at, mood): (i64, String, String)) -> Result<MoodEntry> {
    let bucket = HourBucket::from_id(hour_id).map_err(|_| DatabaseError::CorruptValue {
        column: "hour_id".into(),
        value: hour_id.to_string(),
    })?;
    let recorded_at =
        DateTime::parse_from_rfc3339(&recorded_at).map_err(|_| DatabaseError::CorruptValue {
            column: "recorded_at".into(),
            value: recorded_at.clone(),
        })?;
    Ok(MoodEntry {
        bucket,
        recorded_at,
        mood,
    })
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/moodlog/moodlog.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("moodlog.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()).into())
    }

    /// Insert or replace the entry for its hour-bucket.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn upsert_entry(&self, entry: &MoodEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO entries (hour_id, recorded_at, mood) VALUES (?1, ?2, ?3)
             ON CONFLICT(hour_id) DO UPDATE SET
                recorded_at = excluded.recorded_at,
                mood = excluded.mood",
            params![entry.bucket.id(), entry.recorded_at.to_rfc3339(), entry.mood],
        )?;
        Ok(())
    }

    /// Upsert a batch of entries in one transaction.
    ///
    /// # Errors
    /// Returns an error if any write fails; nothing is written in that case.
    pub fn upsert_entries(&self, entries: &[MoodEntry]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries (hour_id, recorded_at, mood) VALUES (?1, ?2, ?3)
                 ON CONFLICT(hour_id) DO UPDATE SET
                    recorded_at = excluded.recorded_at,
                    mood = excluded.mood",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.bucket.id(),
                    entry.recorded_at.to_rfc3339(),
                    entry.mood
                ])?;
            }
        }
        tx.commit()?;
        Ok(entries.len())
    }

    pub fn entry(&self, bucket: HourBucket) -> Result<Option<MoodEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT hour_id, recorded_at, mood FROM entries WHERE hour_id = ?1",
                params![bucket.id()],
                entry_from_row,
            )
            .optional()?;
        row.map(decode_entry).transpose()
    }

    pub fn has_entry(&self, bucket: HourBucket) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE hour_id = ?1",
            params![bucket.id()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Entries with `from <= bucket <= to`, oldest first.
    pub fn entries_between(&self, from: HourBucket, to: HourBucket) -> Result<Vec<MoodEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT hour_id, recorded_at, mood FROM entries
             WHERE hour_id >= ?1 AND hour_id <= ?2
             ORDER BY hour_id",
        )?;
        let rows = stmt.query_map(params![from.id(), to.id()], entry_from_row)?;
        rows.map(|row| decode_entry(row?)).collect()
    }

    /// Every entry, oldest first.
    pub fn all_entries(&self) -> Result<Vec<MoodEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT hour_id, recorded_at, mood FROM entries ORDER BY hour_id")?;
        let rows = stmt.query_map([], entry_from_row)?;
        rows.map(|row| decode_entry(row?)).collect()
    }

    pub fn latest_entry(&self) -> Result<Option<MoodEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT hour_id, recorded_at, mood FROM entries ORDER BY hour_id DESC LIMIT 1",
                [],
                entry_from_row,
            )
            .optional()?;
        row.map(decode_entry).transpose()
    }

    pub fn entry_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Delete every entry, flag and queued work item.
    ///
    /// # Errors
    /// Returns an error if the reset fails; the database is left unchanged.
    pub fn reset_all(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM entries;
             DELETE FROM kv;
             DELETE FROM work_queue;",
        )?;
        tx.commit()?;
        log::info!("Database reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn upsert_keeps_latest_write() {
        let db = Database::open_memory().unwrap();
        let bucket = HourBucket::from_id(2026101814).unwrap();
        db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T14:10:00+02:00"), "Happy"))
            .unwrap();
        db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T14:40:00+02:00"), "Tired"))
            .unwrap();

        assert_eq!(db.entry_count().unwrap(), 1);
        let entry = db.entry(bucket).unwrap().unwrap();
        assert_eq!(entry.mood, "Tired");
        assert_eq!(entry.recorded_at, at("2026-10-18T14:40:00+02:00"));
    }

    #[test]
    fn entries_between_is_inclusive_and_ordered() {
        let db = Database::open_memory().unwrap();
        for (id, mood) in [(2026101816, "Sad"), (2026101814, "Happy"), (2026101815, "Calm")] {
            let bucket = HourBucket::from_id(id).unwrap();
            db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T17:00:00+00:00"), mood))
                .unwrap();
        }
        let from = HourBucket::from_id(2026101814).unwrap();
        let to = HourBucket::from_id(2026101815).unwrap();
        let moods: Vec<_> = db
            .entries_between(from, to)
            .unwrap()
            .into_iter()
            .map(|e| e.mood)
            .collect();
        assert_eq!(moods, vec!["Happy", "Calm"]);
        assert_eq!(db.latest_entry().unwrap().unwrap().mood, "Sad");
    }

    #[test]
    fn upsert_entries_is_batched() {
        let db = Database::open_memory().unwrap();
        let bucket = HourBucket::from_id(2026101814).unwrap();
        let written = db
            .upsert_entries(&[
                MoodEntry::new(bucket, at("2026-10-18T14:00:00+00:00"), "Happy"),
                MoodEntry::new(bucket.next(), at("2026-10-18T15:00:00+00:00"), "Sad"),
            ])
            .unwrap();
        assert_eq!(written, 2);
        assert!(db.has_entry(bucket.next()).unwrap());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let db = Database::open_memory().unwrap();
        let bucket = HourBucket::from_id(2026101814).unwrap();
        db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T14:00:00+00:00"), "Happy"))
            .unwrap();
        db.kv_set("tracking.enabled", "true").unwrap();
        db.reset_all().unwrap();
        assert_eq!(db.entry_count().unwrap(), 0);
        assert!(db.kv_get("tracking.enabled").unwrap().is_none());
    }

    #[test]
    fn open_at_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moodlog.db");
        let bucket = HourBucket::from_id(2026101814).unwrap();
        {
            let db = Database::open_at(&path).unwrap();
            db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T14:00:00+00:00"), "Happy"))
                .unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert!(db.has_entry(bucket).unwrap());
    }
}
