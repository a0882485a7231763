//! PostgreSQL target writer.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{Client, Config as PgConfig, Connection, NoTls, Transaction};
use tracing::{debug, error, info, warn};

use super::tls::SslMode;
use super::{build_insert, qualify_table, PgExtractor};
use crate::config::TargetConfig;
use crate::core::{SqlValue, TargetWriter, Transactional};
use crate::error::{MigrateError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Single connection to the destination database.
pub struct PgTarget {
    client: Client,
    driver: JoinHandle<()>,
    schema: String,
}

impl PgTarget {
    /// Connect using the configured TLS mode. No retries.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(&config.password)
            .application_name("sqlite-pg-migrate")
            .connect_timeout(CONNECT_TIMEOUT);

        let (client, driver) = match SslMode::parse(&config.ssl_mode)?.connector()? {
            Some(tls) => {
                let (client, connection) = pg_config.connect(tls).await?;
                (client, spawn_driver(connection))
            }
            None => {
                let (client, connection) = pg_config.connect(NoTls).await?;
                (client, spawn_driver(connection))
            }
        };

        info!("Connected to PostgreSQL target: {}", config.display_target());
        Ok(Self {
            client,
            driver,
            schema: config.schema.clone(),
        })
    }

    /// Open the transaction every table of the run is loaded in.
    pub async fn begin(&mut self, batch_size: usize) -> Result<PgSaver<'_>> {
        let tx = self.client.transaction().await?;
        Ok(PgSaver {
            tx,
            schema: self.schema.clone(),
            batch_size,
        })
    }

    /// Open a read-only transaction for reading loaded tables back.
    pub async fn reader(&mut self, page_size: usize) -> Result<PgExtractor<'_>> {
        let tx = self
            .client
            .build_transaction()
            .read_only(true)
            .start()
            .await?;
        Ok(PgExtractor::new(tx, self.schema.clone(), page_size))
    }

    /// Drop the client and wait for the connection task to finish.
    pub async fn close(self) {
        drop(self.client);
        if let Err(e) = self.driver.await {
            warn!("PostgreSQL connection task did not shut down cleanly: {}", e);
        }
        debug!("PostgreSQL target closed");
    }
}

fn spawn_driver<S, T>(connection: Connection<S, T>) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("PostgreSQL connection error: {}", e);
        }
    })
}

/// Writes batches into the destination inside one transaction.
pub struct PgSaver<'a> {
    tx: Transaction<'a>,
    schema: String,
    batch_size: usize,
}

#[async_trait]
impl<'a> TargetWriter for PgSaver<'a> {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn truncate_table(&mut self, table: &str) -> Result<()> {
        let sql = format!("TRUNCATE {} CASCADE", qualify_table(&self.schema, table));
        self.tx
            .batch_execute(&sql)
            .await
            .map_err(|e| MigrateError::transfer(table, describe(&e)))?;
        debug!("{}: truncated", table);
        Ok(())
    }

    async fn insert_batch(
        &mut self,
        table: &str,
        fields: &[&str],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        if let Some(row) = rows.iter().find(|row| row.len() != fields.len()) {
            return Err(MigrateError::transfer(
                table,
                format!("row has {} values for {} columns", row.len(), fields.len()),
            ));
        }

        let sql = build_insert(&self.schema, table, fields, rows.len());
        let params: Vec<&(dyn ToSql + Sync)> = rows
            .iter()
            .flatten()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect();

        self.tx
            .execute(sql.as_str(), &params)
            .await
            .map_err(|e| MigrateError::transfer(table, describe(&e)))
    }

    async fn row_count(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualify_table(&self.schema, table));
        let row = self.tx.query_one(sql.as_str(), &[]).await?;
        Ok(row.get::<_, i64>(0))
    }
}

#[async_trait]
impl<'a> Transactional for PgSaver<'a> {
    fn label(&self) -> &'static str {
        "postgres"
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

/// Server message and detail for database errors, the driver's text otherwise.
fn describe(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => match db.detail() {
            Some(detail) => format!("{} ({})", db.message(), detail),
            None => db.message().to_string(),
        },
        None => err.to_string(),
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Integer(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Real(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Text(v) => v.as_str().to_sql(ty, out),
            SqlValue::Bytes(v) => v.as_slice().to_sql(ty, out),
            SqlValue::Uuid(v) => {
                if *ty == Type::TEXT || *ty == Type::VARCHAR {
                    v.to_string().as_str().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Date(v) => v.to_sql(ty, out),
            SqlValue::Timestamp(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn encode(value: &SqlValue, ty: &Type) -> (IsNull, Vec<u8>) {
        let mut out = BytesMut::new();
        let is_null = value.to_sql(ty, &mut out).unwrap();
        (is_null, out.to_vec())
    }

    #[test]
    fn test_null_binds_as_sql_null() {
        let (is_null, bytes) = encode(&SqlValue::Null, &Type::UUID);
        assert!(matches!(is_null, IsNull::Yes));
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_integer_narrows_to_column_width() {
        let (_, bytes) = encode(&SqlValue::Integer(7), &Type::INT4);
        assert_eq!(bytes, 7i32.to_be_bytes());

        let mut out = BytesMut::new();
        assert!(SqlValue::Integer(i64::MAX).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn test_real_encodes_float8() {
        let (_, bytes) = encode(&SqlValue::Real(8.6), &Type::FLOAT8);
        assert_eq!(bytes, 8.6f64.to_be_bytes());
    }

    #[test]
    fn test_enum_label_binds_as_text() {
        let (_, bytes) = encode(&SqlValue::from("tv_show"), &Type::TEXT);
        assert_eq!(bytes, b"tv_show");
    }

    #[test]
    fn test_uuid_binds_binary() {
        let id = Uuid::parse_str("3d825f60-9fff-4dfe-b294-1a45fa1e115d").unwrap();
        let (_, bytes) = encode(&SqlValue::Uuid(id), &Type::UUID);
        assert_eq!(bytes, id.as_bytes());
    }

    #[test]
    fn test_temporal_values_encode() {
        let (_, date) = encode(
            &SqlValue::Date(NaiveDate::from_ymd_opt(2000, 1, 2).unwrap()),
            &Type::DATE,
        );
        assert_eq!(date, 1i32.to_be_bytes());

        let ts = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 1).unwrap();
        let (_, bytes) = encode(&SqlValue::Timestamp(ts), &Type::TIMESTAMPTZ);
        assert_eq!(bytes, 1_000_000i64.to_be_bytes());
    }
}
