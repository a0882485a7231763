//! The film catalog's table list and load order.

use std::collections::HashSet;

use crate::error::{MigrateError, Result};
use crate::schema::{FilmWork, Genre, GenreFilmWork, Person, PersonFilmWork, TableSpec};

/// Every table the migration copies, in declaration order.
pub fn tables() -> Vec<TableSpec> {
    vec![
        TableSpec::of::<FilmWork>(),
        TableSpec::of::<Genre>(),
        TableSpec::of::<GenreFilmWork>(),
        TableSpec::of::<Person>(),
        TableSpec::of::<PersonFilmWork>(),
    ]
}

/// Column count of the widest table; bounds the rows per INSERT.
pub fn widest_table() -> usize {
    tables()
        .iter()
        .map(|spec| spec.fields.len())
        .max()
        .unwrap_or(1)
}

/// Order tables so every table follows the tables it references.
///
/// Ties keep declaration order. Self-references are ignored.
pub fn load_order(tables: &[TableSpec]) -> Result<Vec<TableSpec>> {
    let mut names = HashSet::new();
    for spec in tables {
        if !names.insert(spec.name) {
            return Err(MigrateError::Config(format!(
                "table {} is declared twice",
                spec.name
            )));
        }
    }
    for spec in tables {
        if let Some(unknown) = spec.depends_on.iter().find(|dep| !names.contains(*dep)) {
            return Err(MigrateError::Config(format!(
                "table {} depends on undeclared table {}",
                spec.name, unknown
            )));
        }
    }

    let mut remaining = tables.to_vec();
    let mut loaded: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(tables.len());

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|spec| {
            spec.depends_on
                .iter()
                .all(|dep| *dep == spec.name || loaded.contains(dep))
        });

        match ready {
            Some(idx) => {
                let spec = remaining.remove(idx);
                loaded.insert(spec.name);
                ordered.push(spec);
            }
            None => {
                let stuck: Vec<&str> = remaining.iter().map(|spec| spec.name).collect();
                return Err(MigrateError::Config(format!(
                    "dependency cycle among tables: {}",
                    stuck.join(", ")
                )));
            }
        }
    }

    Ok(ordered)
}
