//! Column renames between the SQLite and PostgreSQL schemas.

use futures::stream::{Stream, StreamExt};

use crate::core::Record;
use crate::error::Result;

/// `(sqlite name, postgres name)` pairs.
pub const MAP_DATA_FIELDS: &[(&str, &str)] = &[("created_at", "created"), ("updated_at", "modified")];

/// Rename SQLite columns to their PostgreSQL names. Other keys pass through.
pub fn map_sqlite_to_pg(record: Record) -> Record {
    rename(record, MAP_DATA_FIELDS.iter().map(|(from, to)| (*from, *to)))
}

/// Rename PostgreSQL columns back to their SQLite names.
pub fn map_pg_to_sqlite(record: Record) -> Record {
    rename(record, MAP_DATA_FIELDS.iter().map(|(from, to)| (*to, *from)))
}

/// Lazily apply [`map_sqlite_to_pg`] to every record of a stream.
pub fn map_sqlite_to_pg_stream<S>(records: S) -> impl Stream<Item = Result<Record>>
where
    S: Stream<Item = Result<Record>>,
{
    records.map(|record| record.map(map_sqlite_to_pg))
}

/// Lazily apply [`map_pg_to_sqlite`] to every record of a stream.
pub fn map_pg_to_sqlite_stream<S>(records: S) -> impl Stream<Item = Result<Record>>
where
    S: Stream<Item = Result<Record>>,
{
    records.map(|record| record.map(map_pg_to_sqlite))
}

fn rename<'a>(mut record: Record, pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Record {
    for (from, to) in pairs {
        if let Some(value) = record.remove(from) {
            record.insert(to.to_string(), value);
        }
    }
    record
}
