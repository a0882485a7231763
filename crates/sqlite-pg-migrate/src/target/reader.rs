//! Reading loaded tables back out of PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::future;
use futures::stream::{self, BoxStream, TryStreamExt};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use super::qualify_table;
use crate::core::{Record, SourceReader, SqlValue, Transactional};
use crate::error::{MigrateError, Result};
use crate::source::cursor_pages;

/// Pages rows out of the destination schema inside one read-only transaction.
pub struct PgExtractor<'a> {
    tx: Transaction<'a>,
    schema: String,
    page_size: usize,
    pages_fetched: usize,
}

impl<'a> PgExtractor<'a> {
    pub(super) fn new(tx: Transaction<'a>, schema: String, page_size: usize) -> Self {
        Self {
            tx,
            schema,
            page_size,
            pages_fetched: 0,
        }
    }

    /// Number of pages read so far, by either paging path.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn scan_query(&self, table: &str) -> String {
        format!(
            "SELECT * FROM {} ORDER BY id",
            qualify_table(&self.schema, table)
        )
    }
}

#[async_trait]
impl<'a> SourceReader for PgExtractor<'a> {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(&mut self, table: &str, offset: u64, limit: usize) -> Result<Vec<Record>> {
        let sql = format!("{} LIMIT $1 OFFSET $2", self.scan_query(table));
        let rows = self
            .tx
            .query(sql.as_str(), &[&(limit as i64), &(offset as i64)])
            .await?;
        self.pages_fetched += 1;

        rows.iter().map(decode_row).collect()
    }

    /// One server-side scan, regrouped into pages of `page_size`.
    fn extract_iteratively<'s>(&'s mut self, table: &'s str) -> BoxStream<'s, Result<Record>> {
        let sql = self.scan_query(table);
        let tx = &self.tx;
        let rows = stream::once(async move {
            tx.query_raw(sql.as_str(), std::iter::empty::<&(dyn ToSql + Sync)>())
                .await
        })
        .err_into::<MigrateError>()
        .map_ok(|rows| rows.err_into::<MigrateError>())
        .try_flatten()
        .and_then(|row| future::ready(decode_row(&row)));

        cursor_pages(rows, self.page_size, &mut self.pages_fetched)
    }

    async fn extract_all(&mut self, table: &str) -> Result<Vec<Record>> {
        let sql = self.scan_query(table);
        let rows = self.tx.query(sql.as_str(), &[]).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn row_count(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualify_table(&self.schema, table));
        let row = self.tx.query_one(sql.as_str(), &[]).await?;
        Ok(row.get::<_, i64>(0))
    }
}

#[async_trait]
impl<'a> Transactional for PgExtractor<'a> {
    fn label(&self) -> &'static str {
        "postgres (read)"
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Decode a row by each column's declared type.
///
/// Types the catalog never uses are read as text; a column that cannot be
/// read as text is an error.
fn decode_row(row: &Row) -> Result<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, idx, column.type_())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_value(row: &Row, idx: usize, ty: &Type) -> Result<SqlValue> {
    let value = if *ty == Type::UUID {
        row.try_get::<_, Option<Uuid>>(idx)?.map(SqlValue::Uuid)
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(SqlValue::Timestamp)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|ts| SqlValue::Timestamp(ts.and_utc()))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(idx)?.map(SqlValue::Date)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(SqlValue::Real)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?
            .map(|v| SqlValue::Real(f64::from(v)))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(SqlValue::Integer)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?
            .map(|v| SqlValue::Integer(i64::from(v)))
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?
            .map(|v| SqlValue::Integer(i64::from(v)))
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx)?.map(SqlValue::Bytes)
    } else {
        row.try_get::<_, Option<String>>(idx)?.map(SqlValue::Text)
    };
    Ok(value.unwrap_or(SqlValue::Null))
}
