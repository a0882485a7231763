//! Field access and coercion over a source record.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::core::{Record, SqlValue};
use crate::error::{MigrateError, Result};

const TIMESTAMP_WITH_OFFSET: &str = "%Y-%m-%d %H:%M:%S%.f%#z";
const TIMESTAMP_NAIVE: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE: &str = "%Y-%m-%d";

const RATING_MIN: f64 = 0.0;
const RATING_MAX: f64 = 100.0;

/// Parse a source timestamp such as `2021-06-16 20:14:09.221838+00`.
///
/// The offset may be `+HH` or `+HH:MM`; without one the value is taken as
/// UTC. RFC 3339 text is accepted as well.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_str(raw, TIMESTAMP_WITH_OFFSET) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_NAIVE) {
        return Some(ts.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Parse a `YYYY-MM-DD` date, or the date part of a timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE)
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}

/// Consuming view over one record.
///
/// Every `take_*` call removes its key; [`finish`](RecordFields::finish)
/// fails if any key was never taken.
pub struct RecordFields {
    table: &'static str,
    record: Record,
}

impl RecordFields {
    pub fn new(table: &'static str, record: Record) -> Self {
        Self { table, record }
    }

    /// Remove a key that must be present. Its value may be NULL.
    fn take_present(&mut self, field: &str) -> Result<SqlValue> {
        self.record
            .remove(field)
            .ok_or_else(|| MigrateError::missing(self.table, field))
    }

    /// Remove a key that may be absent. Absent and NULL both give `None`.
    fn take_defaulted(&mut self, field: &str) -> Option<SqlValue> {
        self.record.remove(field).filter(|v| !v.is_null())
    }

    fn invalid(&self, field: &str, message: impl Into<String>) -> MigrateError {
        MigrateError::invalid(self.table, field, message)
    }

    fn not_null(&self, field: &str, value: SqlValue) -> Result<SqlValue> {
        if value.is_null() {
            Err(self.invalid(field, "must not be null"))
        } else {
            Ok(value)
        }
    }

    /// The `id` column; a fresh random UUID when absent or NULL.
    pub fn take_id(&mut self) -> Result<Uuid> {
        match self.take_defaulted("id") {
            Some(value) => self.to_uuid("id", value),
            None => Ok(Uuid::new_v4()),
        }
    }

    /// A required, non-null UUID column.
    pub fn take_uuid(&mut self, field: &str) -> Result<Uuid> {
        let value = self.take_present(field)?;
        let value = self.not_null(field, value)?;
        self.to_uuid(field, value)
    }

    /// A required, non-null text column.
    pub fn take_text(&mut self, field: &str) -> Result<String> {
        let value = self.take_present(field)?;
        let value = self.not_null(field, value)?;
        self.to_text(field, value)
    }

    /// A required text column that may hold NULL.
    pub fn take_nullable_text(&mut self, field: &str) -> Result<Option<String>> {
        match self.take_present(field)? {
            SqlValue::Null => Ok(None),
            value => self.to_text(field, value).map(Some),
        }
    }

    /// A text column that may be absent or NULL.
    pub fn take_optional_text(&mut self, field: &str) -> Result<Option<String>> {
        self.take_defaulted(field)
            .map(|value| self.to_text(field, value))
            .transpose()
    }

    /// A required, non-null timestamp column.
    pub fn take_timestamp(&mut self, field: &str) -> Result<DateTime<Utc>> {
        let value = self.take_present(field)?;
        match self.not_null(field, value)? {
            SqlValue::Timestamp(ts) => Ok(ts),
            SqlValue::Text(raw) => parse_timestamp(&raw)
                .ok_or_else(|| self.invalid(field, format!("'{}' is not a timestamp", raw))),
            other => Err(self.invalid(
                field,
                format!("expected timestamp, got {}", other.type_name()),
            )),
        }
    }

    /// A required date column that may hold NULL.
    pub fn take_nullable_date(&mut self, field: &str) -> Result<Option<NaiveDate>> {
        match self.take_present(field)? {
            SqlValue::Null => Ok(None),
            SqlValue::Date(date) => Ok(Some(date)),
            SqlValue::Timestamp(ts) => Ok(Some(ts.date_naive())),
            SqlValue::Text(raw) => parse_date(&raw)
                .map(Some)
                .ok_or_else(|| self.invalid(field, format!("'{}' is not a date", raw))),
            other => Err(self.invalid(field, format!("expected date, got {}", other.type_name()))),
        }
    }

    /// A rating in `[0, 100]`; 0.0 when absent or NULL.
    pub fn take_rating(&mut self, field: &str) -> Result<f64> {
        let rating = match self.take_defaulted(field) {
            None => return Ok(RATING_MIN),
            Some(SqlValue::Real(v)) => v,
            Some(SqlValue::Integer(v)) => v as f64,
            Some(SqlValue::Text(raw)) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| self.invalid(field, format!("'{}' is not a number", raw)))?,
            Some(other) => {
                return Err(self.invalid(
                    field,
                    format!("expected number, got {}", other.type_name()),
                ))
            }
        };

        if !(RATING_MIN..=RATING_MAX).contains(&rating) {
            return Err(self.invalid(
                field,
                format!("{} is outside [{}, {}]", rating, RATING_MIN, RATING_MAX),
            ));
        }
        Ok(rating)
    }

    /// A required enumerated column.
    pub fn take_choice<T>(&mut self, field: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let value = self.take_present(field)?;
        let value = self.not_null(field, value)?;
        self.to_choice(field, value)
    }

    /// A required enumerated column that may hold NULL.
    pub fn take_nullable_choice<T>(&mut self, field: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.take_present(field)? {
            SqlValue::Null => Ok(None),
            value => self.to_choice(field, value).map(Some),
        }
    }

    /// An enumerated column that may be absent or NULL.
    pub fn take_optional_choice<T>(&mut self, field: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.take_defaulted(field)
            .map(|value| self.to_choice(field, value))
            .transpose()
    }

    /// Fail on the first column no entity field consumed.
    pub fn finish(self) -> Result<()> {
        match self.record.into_keys().next() {
            Some(field) => Err(MigrateError::UnexpectedField {
                table: self.table.to_string(),
                field,
            }),
            None => Ok(()),
        }
    }

    fn to_uuid(&self, field: &str, value: SqlValue) -> Result<Uuid> {
        match value {
            SqlValue::Uuid(id) => Ok(id),
            SqlValue::Text(raw) => Uuid::parse_str(raw.trim())
                .map_err(|e| self.invalid(field, format!("'{}' is not a UUID: {}", raw, e))),
            SqlValue::Bytes(bytes) => Uuid::from_slice(&bytes)
                .map_err(|e| self.invalid(field, format!("not a UUID: {}", e))),
            other => Err(self.invalid(field, format!("expected UUID, got {}", other.type_name()))),
        }
    }

    fn to_text(&self, field: &str, value: SqlValue) -> Result<String> {
        match value {
            SqlValue::Text(text) => Ok(text),
            SqlValue::Integer(v) => Ok(v.to_string()),
            SqlValue::Real(v) => Ok(v.to_string()),
            other => Err(self.invalid(field, format!("expected text, got {}", other.type_name()))),
        }
    }

    fn to_choice<T>(&self, field: &str, value: SqlValue) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let label = self.to_text(field, value)?;
        label.parse::<T>().map_err(|e| self.invalid(field, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn fields(pairs: &[(&str, SqlValue)]) -> RecordFields {
        let record = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        RecordFields::new("film_work", record)
    }

    #[test]
    fn test_parse_timestamp_with_short_offset() {
        let ts = parse_timestamp("2021-06-16 20:14:09.221838+00").unwrap();
        assert_eq!(ts.year(), 2021);
        assert_eq!(ts.hour(), 20);
        assert_eq!(ts.nanosecond(), 221_838_000);
    }

    #[test]
    fn test_parse_timestamp_normalizes_offset() {
        let ts = parse_timestamp("2021-06-16 20:14:09+03:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 6, 16, 17, 14, 9).unwrap());
    }

    #[test]
    fn test_parse_timestamp_without_offset_is_utc() {
        let ts = parse_timestamp("2021-06-16 20:14:09").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 6, 16, 20, 14, 9).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_date_from_timestamp_text() {
        let date = parse_date("2021-06-16 20:14:09.221838+00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 6, 16).unwrap());
    }

    #[test]
    fn test_take_id_generates_when_null() {
        let mut f = fields(&[("id", SqlValue::Null)]);
        let id = f.take_id().unwrap();
        assert_eq!(id.get_version_num(), 4);
        f.finish().unwrap();
    }

    #[test]
    fn test_take_id_parses_text() {
        let id = "3d825f60-9fff-4dfe-b294-1a45fa1e115d";
        let mut f = fields(&[("id", SqlValue::from(id))]);
        assert_eq!(f.take_id().unwrap().to_string(), id);
    }

    #[test]
    fn test_take_text_missing_and_null() {
        let mut f = fields(&[]);
        assert!(matches!(
            f.take_text("title"),
            Err(MigrateError::MissingField { .. })
        ));

        let mut f = fields(&[("title", SqlValue::Null)]);
        assert!(matches!(
            f.take_text("title"),
            Err(MigrateError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_take_rating_defaults_and_bounds() {
        assert_eq!(fields(&[]).take_rating("rating").unwrap(), 0.0);
        assert_eq!(
            fields(&[("rating", SqlValue::Null)]).take_rating("rating").unwrap(),
            0.0
        );
        assert_eq!(
            fields(&[("rating", SqlValue::Integer(100))])
                .take_rating("rating")
                .unwrap(),
            100.0
        );
        assert_eq!(
            fields(&[("rating", SqlValue::from("8.5"))])
                .take_rating("rating")
                .unwrap(),
            8.5
        );
        let err = fields(&[("rating", SqlValue::Real(150.0))])
            .take_rating("rating")
            .unwrap_err();
        assert!(err.to_string().contains("outside [0, 100]"));
        assert!(fields(&[("rating", SqlValue::Real(-0.1))])
            .take_rating("rating")
            .is_err());
    }

    #[test]
    fn test_finish_reports_leftover_column() {
        let mut f = fields(&[("title", SqlValue::from("Alien")), ("budget", SqlValue::Integer(1))]);
        f.take_text("title").unwrap();
        match f.finish() {
            Err(MigrateError::UnexpectedField { table, field }) => {
                assert_eq!(table, "film_work");
                assert_eq!(field, "budget");
            }
            other => panic!("expected UnexpectedField, got {:?}", other),
        }
    }
}
