//! Core traits for the extract-map-load pipeline.
//!
//! - [`SourceReader`]: pages rows out of the source database
//! - [`TargetWriter`]: resets tables and inserts batches into the target
//! - [`Transactional`]: commit/rollback of a connection scope
//!
//! The orchestrator is generic over the first two so the pipeline can run
//! against in-memory implementations in tests.

use async_trait::async_trait;
use futures::stream::{BoxStream, TryChunksError};
use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::Result;
use crate::schema::TableSpec;
use crate::source::paged_rows;
use crate::target::LoadStats;

use super::value::{Record, SqlValue};

/// Read rows from a source database.
#[async_trait]
pub trait SourceReader: Send {
    /// Maximum number of rows fetched per round trip.
    fn page_size(&self) -> usize;

    /// Fetch up to `limit` rows of `table`, ordered by `id`, skipping the
    /// first `offset` rows.
    async fn fetch_page(&mut self, table: &str, offset: u64, limit: usize)
        -> Result<Vec<Record>>;

    /// Fetch the whole table at once, ordered by `id`.
    ///
    /// Intended for verification; the pipeline uses
    /// [`extract_iteratively`](SourceReader::extract_iteratively).
    async fn extract_all(&mut self, table: &str) -> Result<Vec<Record>>;

    /// Count the rows in a table.
    async fn row_count(&mut self, table: &str) -> Result<i64>;

    /// Stream a table one row at a time, fetching one page at a time.
    ///
    /// The stream is finite and cannot be restarted; at most one page is
    /// held in memory. The default pages through
    /// [`fetch_page`](SourceReader::fetch_page); readers that can keep one
    /// cursor open override it with a single ordered scan.
    fn extract_iteratively<'a>(&'a mut self, table: &'a str) -> BoxStream<'a, Result<Record>> {
        paged_rows(self, table)
    }
}

/// Write rows to a target database.
#[async_trait]
pub trait TargetWriter: Send {
    /// Maximum number of rows per INSERT statement.
    fn batch_size(&self) -> usize;

    /// Remove every row of `table` and of the tables referencing it.
    async fn truncate_table(&mut self, table: &str) -> Result<()>;

    /// Insert rows whose values are ordered like `fields`.
    async fn insert_batch(
        &mut self,
        table: &str,
        fields: &[&str],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<u64>;

    /// Count the rows in a table.
    async fn row_count(&mut self, table: &str) -> Result<i64>;

    /// Consume a record stream in chunks of [`batch_size`](TargetWriter::batch_size),
    /// building one entity per record and issuing one insert per chunk.
    async fn save_data<'a>(
        &mut self,
        rows: BoxStream<'a, Result<Record>>,
        spec: &TableSpec,
    ) -> Result<LoadStats> {
        let mut chunks = rows.try_chunks(self.batch_size());
        let mut stats = LoadStats::default();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|TryChunksError(_, err)| err)?;
            let values = chunk
                .into_iter()
                .map(|record| spec.build_row(record))
                .collect::<Result<Vec<_>>>()?;

            let written = self.insert_batch(spec.name, spec.fields, values).await?;
            stats.batches += 1;
            stats.rows += written;
            debug!(
                "{}: batch {} inserted ({} rows so far)",
                spec.name, stats.batches, stats.rows
            );
        }

        Ok(stats)
    }
}

/// A connection scope that ends in either a commit or a rollback.
///
/// Dropping a scope without calling either rolls it back.
#[async_trait]
pub trait Transactional: Send + Sized {
    /// Name used in log lines.
    fn label(&self) -> &'static str;

    /// Make the scope's work permanent.
    async fn commit(self) -> Result<()>;

    /// Discard the scope's work.
    async fn rollback(self) -> Result<()>;
}
