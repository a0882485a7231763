//! Migration orchestrator - main workflow coordinator.

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog;
use crate::config::Config;
use crate::core::{Record, SourceReader, SqlValue, TargetWriter};
use crate::error::Result;
use crate::lifecycle;
use crate::mapper::{map_pg_to_sqlite_stream, map_sqlite_to_pg_stream};
use crate::schema::TableSpec;
use crate::source::SqliteSource;
use crate::target::PgTarget;

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    tables: Vec<TableSpec>,
}

/// Per-table outcome of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    /// Rows in the source table when loading started.
    pub source_rows: i64,
    /// Rows inserted.
    pub rows_loaded: u64,
    /// INSERT statements issued.
    pub batches: usize,
    /// Rows in the destination table after loading.
    pub target_rows: i64,
    pub duration_seconds: f64,
}

/// One table read back from both databases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCheck {
    pub table: String,
    pub source_rows: u64,
    pub target_rows: u64,
    /// Source rows whose `id` is not in the destination.
    pub missing_ids: u64,
    /// Source columns with no destination counterpart after renaming back.
    pub unmatched_columns: Vec<String>,
}

impl TableCheck {
    pub fn is_match(&self) -> bool {
        self.source_rows == self.target_rows
            && self.missing_ids == 0
            && self.unmatched_columns.is_empty()
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total tables processed.
    pub tables_total: usize,

    /// Total rows transferred.
    pub rows_transferred: u64,

    /// Average throughput (rows/second).
    pub rows_per_second: i64,

    /// Tables in load order.
    pub tables: Vec<TableReport>,

    /// Read-back comparison, when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Vec<TableCheck>>,
}

impl Orchestrator {
    /// Validate the configuration and resolve the load order.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let tables = catalog::load_order(&catalog::tables())?;
        Ok(Self { config, tables })
    }

    /// Tables in the order they will be loaded.
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Run the migration.
    pub async fn run(&self) -> Result<MigrationResult> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start_time = Instant::now();
        info!("Starting migration run: {}", run_id);

        let mut source = SqliteSource::open(&self.config.source).await?;
        let mut target = match PgTarget::connect(&self.config.target).await {
            Ok(target) => target,
            Err(e) => {
                close_source(source).await;
                return Err(e);
            }
        };

        let outcome = self.transfer(&mut source, &mut target).await;
        let checked = match &outcome {
            Ok(_) if self.config.migration.verify => {
                Some(self.verify(&mut source, &mut target).await)
            }
            _ => None,
        };
        target.close().await;
        close_source(source).await;
        let reports = outcome?;
        let verification = checked.transpose()?;

        let duration = start_time.elapsed().as_secs_f64();
        let rows_transferred: u64 = reports.iter().map(|r| r.rows_loaded).sum();
        let rows_per_second = if duration > 0.0 {
            (rows_transferred as f64 / duration) as i64
        } else {
            0
        };

        let mismatched = verification
            .iter()
            .flatten()
            .filter(|check| !check.is_match())
            .count();
        let status = if mismatched == 0 {
            "completed"
        } else {
            warn!("Verification found {} mismatched tables", mismatched);
            "completed_with_mismatches"
        };

        let result = MigrationResult {
            run_id,
            status: status.to_string(),
            duration_seconds: duration,
            started_at,
            completed_at: Utc::now(),
            tables_total: reports.len(),
            rows_transferred,
            rows_per_second,
            tables: reports,
            verification,
        };

        info!(
            "Migration {}: {} tables, {} rows in {:.1}s ({} rows/s)",
            result.status,
            result.tables_total,
            result.rows_transferred,
            result.duration_seconds,
            result.rows_per_second
        );

        Ok(result)
    }

    async fn transfer(
        &self,
        source: &mut SqliteSource,
        target: &mut PgTarget,
    ) -> Result<Vec<TableReport>> {
        let migration = &self.config.migration;
        let mut extractor = source.begin(migration.extract_chunk_size).await?;
        let mut saver = match target.begin(migration.load_chunk_size).await {
            Ok(saver) => saver,
            Err(e) => return lifecycle::complete(extractor, Err(e)).await,
        };

        let outcome = load_tables(&mut extractor, &mut saver, &self.tables).await;
        let outcome = lifecycle::complete(saver, outcome).await;
        lifecycle::complete(extractor, outcome).await
    }

    async fn verify(
        &self,
        source: &mut SqliteSource,
        target: &mut PgTarget,
    ) -> Result<Vec<TableCheck>> {
        let page_size = self.config.migration.extract_chunk_size;
        let mut extractor = source.begin(page_size).await?;
        let mut reader = match target.reader(page_size).await {
            Ok(reader) => reader,
            Err(e) => return lifecycle::complete(extractor, Err(e)).await,
        };

        let outcome = verify_tables(&mut extractor, &mut reader, &self.tables).await;
        let outcome = lifecycle::complete(reader, outcome).await;
        lifecycle::complete(extractor, outcome).await
    }
}

async fn close_source(source: SqliteSource) {
    if let Err(e) = source.close().await {
        warn!("Failed to close SQLite source: {}", e);
    }
}

/// Reset and reload each table in order: truncate, then stream
/// extract, rename and save.
pub async fn load_tables<R, W>(
    reader: &mut R,
    writer: &mut W,
    tables: &[TableSpec],
) -> Result<Vec<TableReport>>
where
    R: SourceReader + ?Sized,
    W: TargetWriter + ?Sized,
{
    let mut reports = Vec::with_capacity(tables.len());

    for spec in tables {
        let started = Instant::now();

        info!("Clean table {}", spec.name);
        writer.truncate_table(spec.name).await?;

        info!("Extract and load table {}", spec.name);
        let source_rows = reader.row_count(spec.name).await?;
        let rows = map_sqlite_to_pg_stream(reader.extract_iteratively(spec.name)).boxed();
        let stats = writer.save_data(rows, spec).await?;
        let target_rows = writer.row_count(spec.name).await?;

        if target_rows != source_rows {
            warn!(
                "{}: source={} target={} (MISMATCH)",
                spec.name, source_rows, target_rows
            );
        }
        info!(
            "Done for table {}: {} rows in {} batches",
            spec.name, stats.rows, stats.batches
        );

        reports.push(TableReport {
            table: spec.name.to_string(),
            source_rows,
            rows_loaded: stats.rows,
            batches: stats.batches,
            target_rows,
            duration_seconds: started.elapsed().as_secs_f64(),
        });
    }

    Ok(reports)
}

/// Read each table back from the destination and compare it with the source.
///
/// Destination rows are renamed back to source column names. Destination
/// ids are held in memory for the table being compared.
pub async fn verify_tables<R, T>(
    source: &mut R,
    target: &mut T,
    tables: &[TableSpec],
) -> Result<Vec<TableCheck>>
where
    R: SourceReader + ?Sized,
    T: SourceReader + ?Sized,
{
    let mut checks = Vec::with_capacity(tables.len());

    for spec in tables {
        let mut check = TableCheck {
            table: spec.name.to_string(),
            ..Default::default()
        };

        let mut target_ids = HashSet::new();
        let mut target_columns = BTreeSet::new();
        let mut rows = map_pg_to_sqlite_stream(target.extract_iteratively(spec.name));
        while let Some(record) = rows.try_next().await? {
            check.target_rows += 1;
            if target_columns.is_empty() {
                target_columns.extend(record.keys().cloned());
            }
            if let Some(id) = record_id(&record) {
                target_ids.insert(id);
            }
        }
        drop(rows);

        let mut unmatched = BTreeSet::new();
        let mut rows = source.extract_iteratively(spec.name);
        while let Some(record) = rows.try_next().await? {
            check.source_rows += 1;
            if record_id(&record).is_some_and(|id| !target_ids.contains(&id)) {
                check.missing_ids += 1;
            }
            if check.target_rows > 0 {
                unmatched.extend(
                    record
                        .keys()
                        .filter(|key| !target_columns.contains(*key))
                        .cloned(),
                );
            }
        }
        check.unmatched_columns = unmatched.into_iter().collect();

        if check.is_match() {
            info!("Verified table {}: {} rows", spec.name, check.target_rows);
        } else {
            warn!(
                "{}: source={} target={} missing_ids={} unmatched_columns={:?} (MISMATCH)",
                spec.name,
                check.source_rows,
                check.target_rows,
                check.missing_ids,
                check.unmatched_columns
            );
        }
        checks.push(check);
    }

    Ok(checks)
}

fn record_id(record: &Record) -> Option<Uuid> {
    match record.get("id")? {
        SqlValue::Uuid(id) => Some(*id),
        SqlValue::Text(raw) => Uuid::parse_str(raw.trim()).ok(),
        SqlValue::Bytes(bytes) => Uuid::from_slice(bytes).ok(),
        _ => None,
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
