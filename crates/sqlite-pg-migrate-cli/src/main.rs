//! sqlite-pg-migrate CLI - film catalog migration from SQLite to PostgreSQL.
//!
//! Takes no arguments. Configuration comes from the environment (a `.env`
//! file is loaded when present), or from the YAML file named by
//! `MIGRATE_CONFIG`.

use sqlite_pg_migrate::{Config, MigrateError, MigrationResult, Orchestrator};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

const CONFIG_FILE_VAR: &str = "MIGRATE_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    dotenv::dotenv().ok();

    let config = match std::env::var(CONFIG_FILE_VAR) {
        Ok(path) if !path.trim().is_empty() => Config::load(path.trim())?,
        _ => Config::from_env()?,
    };

    setup_logging(&config.logging.level, &config.logging.format);
    info!("Source: {}", config.source.path.display());
    info!("Target: {}", config.target.display_target());

    let json_output = config.logging.format.eq_ignore_ascii_case("json");
    let result = Orchestrator::new(config)?.run().await?;

    if json_output {
        println!("{}", result.to_json()?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &MigrationResult) {
    println!(
        "Migration {} ({}): {} tables, {} rows in {:.1}s",
        result.status,
        result.run_id,
        result.tables_total,
        result.rows_transferred,
        result.duration_seconds
    );
    for table in &result.tables {
        println!(
            "  {:<18} {:>8} rows  {:>5} batches",
            table.table, table.rows_loaded, table.batches
        );
    }
    for check in result.verification.iter().flatten() {
        println!(
            "  verify {:<11} {}  source={} target={} missing_ids={}",
            check.table,
            if check.is_match() { "ok      " } else { "MISMATCH" },
            check.source_rows,
            check.target_rows,
            check.missing_ids
        );
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format.eq_ignore_ascii_case("json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
