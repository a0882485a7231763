//! Entity definitions for the film catalog tables.
//!
//! Each entity knows its destination table, the ordered column list used
//! for inserts, and the tables it references. [`TableSpec`] erases the
//! entity type so the pipeline can walk the catalog as plain data.

mod entities;
mod fields;

pub use entities::{
    FilmWork, FilmWorkType, Gender, Genre, GenreFilmWork, Person, PersonFilmWork, Role,
    Timestamps,
};
pub use fields::{parse_date, parse_timestamp, RecordFields};

use std::fmt;

use crate::core::{Record, SqlValue};
use crate::error::{MigrateError, Result};

/// A row type of the destination schema.
pub trait Entity: Sized {
    /// Destination table name (unqualified).
    const TABLE: &'static str;

    /// Column names in insert order.
    const FIELDS: &'static [&'static str];

    /// Tables this one references through foreign keys.
    const DEPENDS_ON: &'static [&'static str] = &[];

    /// Build the entity from a source record whose keys are already mapped
    /// to destination names.
    fn from_record(record: Record) -> Result<Self>;

    /// Values in the same order as [`FIELDS`](Entity::FIELDS).
    fn into_values(self) -> Vec<SqlValue>;
}

/// Type-erased description of one catalog table.
#[derive(Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub depends_on: &'static [&'static str],
    build: fn(Record) -> Result<Vec<SqlValue>>,
}

impl TableSpec {
    /// Describe the table backing entity `E`.
    pub fn of<E: Entity>() -> Self {
        Self {
            name: E::TABLE,
            fields: E::FIELDS,
            depends_on: E::DEPENDS_ON,
            build: build_values::<E>,
        }
    }

    /// Build one insert row from a record.
    pub fn build_row(&self, record: Record) -> Result<Vec<SqlValue>> {
        let values = (self.build)(record)?;
        if values.len() != self.fields.len() {
            return Err(MigrateError::transfer(
                self.name,
                format!(
                    "entity produced {} values for {} columns",
                    values.len(),
                    self.fields.len()
                ),
            ));
        }
        Ok(values)
    }
}

impl fmt::Debug for TableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSpec")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

fn build_values<E: Entity>(record: Record) -> Result<Vec<SqlValue>> {
    E::from_record(record).map(E::into_values)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lopsided;

    impl Entity for Lopsided {
        const TABLE: &'static str = "lopsided";
        const FIELDS: &'static [&'static str] = &["id", "name"];

        fn from_record(_record: Record) -> Result<Self> {
            Ok(Lopsided)
        }

        fn into_values(self) -> Vec<SqlValue> {
            vec![SqlValue::Null]
        }
    }

    #[test]
    fn test_spec_mirrors_entity() {
        let spec = TableSpec::of::<GenreFilmWork>();
        assert_eq!(spec.name, "genre_film_work");
        assert_eq!(spec.fields, &["id", "genre_id", "film_work_id", "created"]);
        assert_eq!(spec.depends_on, &["genre", "film_work"]);
    }

    #[test]
    fn test_build_row_rejects_width_mismatch() {
        let spec = TableSpec::of::<Lopsided>();
        let err = spec.build_row(Record::new()).unwrap_err();
        assert!(err.to_string().contains("1 values for 2 columns"));
    }
}
