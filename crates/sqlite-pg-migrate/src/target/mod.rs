//! Target database access.

mod postgres;
mod reader;
pub mod tls;

pub use postgres::{PgSaver, PgTarget};
pub use reader::PgExtractor;

use serde::Serialize;

/// PostgreSQL's limit on bind parameters in one statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Outcome of loading one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Rows inserted.
    pub rows: u64,
    /// INSERT statements issued.
    pub batches: usize,
}

/// Quote a PostgreSQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Qualify a table name with schema.
pub(crate) fn qualify_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Build a multi-row INSERT with numbered placeholders, row-major.
pub(crate) fn build_insert(schema: &str, table: &str, fields: &[&str], row_count: usize) -> String {
    let columns = fields
        .iter()
        .map(|f| quote_ident(f))
        .collect::<Vec<_>>()
        .join(", ");

    let width = fields.len();
    let tuples = (0..row_count)
        .map(|row| {
            let placeholders = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", placeholders)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualify_table(schema, table),
        columns,
        tuples
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("type"), "\"type\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_qualify_table() {
        assert_eq!(qualify_table("content", "film_work"), "\"content\".\"film_work\"");
    }

    #[test]
    fn test_build_insert_numbers_placeholders_row_major() {
        let sql = build_insert("content", "genre", &["id", "name"], 2);
        assert_eq!(
            sql,
            "INSERT INTO \"content\".\"genre\" (\"id\", \"name\") VALUES ($1, $2), ($3, $4)"
        );
    }
}
