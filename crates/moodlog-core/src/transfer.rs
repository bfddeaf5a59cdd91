//! Entry import/export as three-column delimited text.
//!
//! ```text
//! hour,timestamp,mood
//! 2026101814,2026-10-18 14:23:05 +02:00,Happy
//! ```
//!
//! One record per line. Fields containing a comma or a double quote are
//! quoted with doubled inner quotes; mood names never contain line breaks.
//! Import upserts rows; bad rows are skipped and reported.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransferError};
use crate::hour::HourBucket;
use crate::storage::{Database, MoodEntry};

pub const CSV_HEADER: &str = "hour,timestamp,mood";

/// Human-readable timestamp with the original offset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

fn quote(field: &str) -> String {
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split one record into fields, honouring quotes.
fn split_record(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".into());
    }
    fields.push(field);
    Ok(fields)
}

fn format_row(entry: &MoodEntry) -> String {
    format!(
        "{},{},{}",
        entry.bucket.id(),
        quote(&entry.recorded_at.format(TIMESTAMP_FORMAT).to_string()),
        quote(&entry.mood)
    )
}

fn parse_row(line: &str) -> std::result::Result<MoodEntry, String> {
    let fields = split_record(line)?;
    let [hour, timestamp, mood] = fields.as_slice() else {
        return Err(format!("expected 3 fields, found {}", fields.len()));
    };
    let id: i64 = hour
        .trim()
        .parse()
        .map_err(|_| format!("hour id '{hour}' is not a number"))?;
    let bucket = HourBucket::from_id(id).map_err(|e| e.to_string())?;
    let recorded_at = DateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| format!("timestamp '{timestamp}': {e}"))?;
    let mood = mood.trim();
    if mood.is_empty() {
        return Err("mood is empty".into());
    }
    Ok(MoodEntry::new(bucket, recorded_at, mood))
}

/// Write every entry, oldest first. Returns the number of rows written.
///
/// # Errors
/// Returns an error if reading the store or writing fails.
pub fn export_entries<W: Write>(db: &Database, mut out: W) -> Result<usize> {
    let entries = db.all_entries()?;
    writeln!(out, "{CSV_HEADER}")?;
    for entry in &entries {
        writeln!(out, "{}", format_row(entry))?;
    }
    out.flush()?;
    Ok(entries.len())
}

/// Export to a file, replacing it.
///
/// # Errors
/// See [`export_entries`].
pub fn export_entries_to(db: &Database, path: &Path) -> Result<usize> {
    let written = export_entries(db, BufWriter::new(File::create(path)?))?;
    log::info!("Exported {written} entries to {}", path.display());
    Ok(written)
}

/// Read rows and upsert the valid ones in one transaction.
///
/// # Errors
/// Returns an error for unreadable input, a missing or wrong header, or a
/// failed write. Individual bad rows are reported in the summary instead.
pub fn import_entries<R: BufRead>(db: &Database, input: R) -> Result<ImportSummary> {
    let mut lines = input.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(TransferError::Empty.into()),
    };
    if !header.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(CSV_HEADER) {
        return Err(TransferError::BadHeader(header).into());
    }

    let mut summary = ImportSummary::default();
    let mut entries = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line.trim_end_matches('\r')) {
            Ok(entry) => entries.push(entry),
            Err(message) => {
                // Header is line 1.
                let line = index + 2;
                log::warn!("Skipping line {line}: {message}");
                summary.skipped += 1;
                summary.errors.push(RowError { line, message });
            }
        }
    }

    summary.imported = db.upsert_entries(&entries)?;
    Ok(summary)
}

/// Import from a file.
///
/// # Errors
/// See [`import_entries`].
pub fn import_entries_from(db: &Database, path: &Path) -> Result<ImportSummary> {
    let summary = import_entries(db, BufReader::new(File::open(path)?))?;
    log::info!(
        "Imported {} entries from {} ({} skipped)",
        summary.imported,
        path.display(),
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn at(s: &str) -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn export_writes_header_and_rows() {
        let db = Database::open_memory().unwrap();
        let bucket = HourBucket::from_id(2026101814).unwrap();
        db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T14:23:05+02:00"), "Happy"))
            .unwrap();

        let mut out = Vec::new();
        assert_eq!(export_entries(&db, &mut out).unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "hour,timestamp,mood\n2026101814,2026-10-18 14:23:05 +02:00,Happy\n"
        );
    }

    #[test]
    fn quoted_fields_survive() {
        let entry = MoodEntry::new(
            HourBucket::from_id(2026101814).unwrap(),
            at("2026-10-18T14:23:05+00:00"),
            "Meh, \"fine\"",
        );
        let row = format_row(&entry);
        assert_eq!(row, "2026101814,2026-10-18 14:23:05 +00:00,\"Meh, \"\"fine\"\"\"");
        assert_eq!(parse_row(&row).unwrap(), entry);
    }

    #[test]
    fn export_writes_one_line_per_entry() {
        let db = Database::open_memory().unwrap();
        for (id, mood) in [(2026101808, "Meh, \"fine\""), (2026101809, "Happy")] {
            let bucket = HourBucket::from_id(id).unwrap();
            db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T09:00:00+00:00"), mood))
                .unwrap();
        }
        let mut out = Vec::new();
        export_entries(&db, &mut out).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap().lines().count(), 3);

        let copy = Database::open_memory().unwrap();
        let summary = import_entries(&copy, out.as_slice()).unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(copy.all_entries().unwrap(), db.all_entries().unwrap());
    }

    #[test]
    fn import_skips_bad_rows() {
        let db = Database::open_memory().unwrap();
        let input = "hour,timestamp,mood\n\
                     2026101814,2026-10-18 14:23:05 +02:00,Happy\n\
                     2026023010,2026-02-30 10:00:00 +00:00,Sad\n\
                     2026101815,yesterday,Sad\n\
                     \n\
                     2026101816,2026-10-18 16:01:00 +02:00,\n\
                     2026101817,2026-10-18 17:01:00 +02:00,\"Tired\"\n";
        let summary = import_entries(&db, input.as_bytes()).unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 3);
        assert_eq!(
            summary.errors.iter().map(|e| e.line).collect::<Vec<_>>(),
            vec![3, 4, 6]
        );
        assert_eq!(db.entry_count().unwrap(), 2);
    }

    #[test]
    fn import_requires_header() {
        let db = Database::open_memory().unwrap();
        let err = import_entries(&db, "2026101814,x,Happy\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CoreError::Transfer(TransferError::BadHeader(_))));
        let err = import_entries(&db, "".as_bytes()).unwrap_err();
        assert!(matches!(err, CoreError::Transfer(TransferError::Empty)));
    }

    #[test]
    fn import_overwrites_existing_hours() {
        let db = Database::open_memory().unwrap();
        let bucket = HourBucket::from_id(2026101814).unwrap();
        db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T14:00:00+00:00"), "Sad"))
            .unwrap();
        let input = "hour,timestamp,mood\n2026101814,2026-10-18 14:30:00 +00:00,Happy\n";
        import_entries(&db, input.as_bytes()).unwrap();
        assert_eq!(db.entry(bucket).unwrap().unwrap().mood, "Happy");
    }
}
