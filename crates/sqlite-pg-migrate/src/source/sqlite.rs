//! SQLite source reader.

use async_trait::async_trait;
use futures::future;
use futures::stream::{BoxStream, TryStreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, Sqlite, Transaction, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::SourceConfig;
use super::cursor_pages;
use crate::core::{Record, SourceReader, SqlValue, Transactional};
use crate::error::{MigrateError, Result};

/// Read-only connection to the SQLite database file.
pub struct SqliteSource {
    conn: SqliteConnection,
}

impl SqliteSource {
    /// Open the database file read-only. A missing file is an error.
    pub async fn open(config: &SourceConfig) -> Result<Self> {
        let conn = SqliteConnectOptions::new()
            .filename(&config.path)
            .read_only(true)
            .create_if_missing(false)
            .disable_statement_logging()
            .connect()
            .await?;

        info!("Connected to SQLite source: {}", config.path.display());
        Ok(Self { conn })
    }

    /// Start a read transaction; every page of the run is read inside it.
    pub async fn begin(&mut self, page_size: usize) -> Result<SqliteExtractor<'_>> {
        let tx = self.conn.begin().await?;
        Ok(SqliteExtractor {
            tx,
            page_size,
            pages_fetched: 0,
            scan_sql: String::new(),
        })
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        debug!("SQLite source closed");
        Ok(())
    }
}

/// Pages rows out of SQLite inside one read transaction.
pub struct SqliteExtractor<'c> {
    tx: Transaction<'c, Sqlite>,
    page_size: usize,
    pages_fetched: usize,
    /// Query text of the open scan; the row stream borrows it.
    scan_sql: String,
}

impl SqliteExtractor<'_> {
    /// Number of pages read so far, by either paging path.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

#[async_trait]
impl<'c> SourceReader for SqliteExtractor<'c> {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(&mut self, table: &str, offset: u64, limit: usize) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY id LIMIT ? OFFSET ?",
            quote_ident(table)
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&mut *self.tx)
            .await?;
        self.pages_fetched += 1;

        rows.iter().map(decode_row).collect()
    }

    /// One `ORDER BY id` scan, regrouped into pages of `page_size`.
    fn extract_iteratively<'a>(&'a mut self, table: &'a str) -> BoxStream<'a, Result<Record>> {
        let Self {
            tx,
            page_size,
            pages_fetched,
            scan_sql,
        } = self;
        *scan_sql = scan_query(table);
        let sql: &'a String = scan_sql;

        let rows = sqlx::query(sql.as_str())
            .fetch(&mut **tx)
            .map_err(MigrateError::from)
            .and_then(|row| future::ready(decode_row(&row)));
        cursor_pages(rows, *page_size, pages_fetched)
    }

    async fn extract_all(&mut self, table: &str) -> Result<Vec<Record>> {
        let sql = scan_query(table);
        let rows = sqlx::query(&sql).fetch_all(&mut *self.tx).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn row_count(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let row = sqlx::query(&sql).fetch_one(&mut *self.tx).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }
}

#[async_trait]
impl<'c> Transactional for SqliteExtractor<'c> {
    fn label(&self) -> &'static str {
        "sqlite"
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

fn scan_query(table: &str) -> String {
    format!("SELECT * FROM {} ORDER BY id", quote_ident(table))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Decode a row by each value's storage class.
fn decode_row(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let storage = {
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_ascii_uppercase())
            }
        };

        let value = match storage.as_deref() {
            None => SqlValue::Null,
            Some("INTEGER") => SqlValue::Integer(row.try_get_unchecked::<i64, _>(idx)?),
            Some("REAL") => SqlValue::Real(row.try_get_unchecked::<f64, _>(idx)?),
            Some("BLOB") => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
            Some(_) => SqlValue::Text(row.try_get_unchecked::<String, _>(idx)?),
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}
