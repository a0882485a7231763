//! SQL value types shared by the SQLite reader and the PostgreSQL writer.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// One source row: column name to value.
///
/// Column order is irrelevant to the pipeline because entities pick their
/// fields by name, so an ordered map keeps iteration deterministic.
pub type Record = BTreeMap<String, SqlValue>;

/// SQL value enum for type-safe row handling.
///
/// SQLite produces only `Null`, `Integer`, `Real`, `Text` and `Bytes`.
/// `Uuid`, `Date` and `Timestamp` come from entity construction and from
/// decoding PostgreSQL rows.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// 64-bit signed integer.
    Integer(i64),

    /// 64-bit floating point.
    Real(f64),

    /// Text data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID value.
    Uuid(Uuid),

    /// Date without time component.
    Date(NaiveDate),

    /// Timestamp normalized to UTC.
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Short type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Integer(_) => "integer",
            SqlValue::Real(_) => "real",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Date(_) => "date",
            SqlValue::Timestamp(_) => "timestamp",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::Integer(42).is_null());
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<String> = None;
        assert_eq!(SqlValue::from(none), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("Drama")),
            SqlValue::Text("Drama".to_string())
        );
    }

    #[test]
    fn test_type_names() {
        let names: Vec<&str> = [
            SqlValue::Null,
            SqlValue::Integer(1),
            SqlValue::Real(1.5),
            SqlValue::from("Drama"),
            SqlValue::Bytes(vec![0xCA]),
            SqlValue::Uuid(Uuid::nil()),
            SqlValue::Date(NaiveDate::from_ymd_opt(2021, 6, 16).unwrap()),
            SqlValue::Timestamp(DateTime::from_timestamp(0, 0).unwrap()),
        ]
        .iter()
        .map(SqlValue::type_name)
        .collect();
        assert_eq!(
            names,
            vec!["null", "integer", "real", "text", "bytes", "uuid", "date", "timestamp"]
        );
    }
}
