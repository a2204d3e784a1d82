//! Command implementations. Human summaries go to stderr, structured JSON
//! (with `--json`) to stdout, matching the exit-code contract in
//! `exit_codes`.

use std::collections::BTreeMap;
use std::path::Path;

use medallion_pipeline::report::{RunMeta, RunReport};
use medallion_pipeline::{ingest, reconcile, rollup, PipelineConfig, ReconcileInput};
use medallion_store::Store;

use crate::{CliError, Layer};

fn read_config(path: &Path) -> Result<PipelineConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read config {}: {e}", path.display())))?;
    Ok(PipelineConfig::from_toml(&text)?)
}

fn open_store(config: &PipelineConfig, db_override: Option<&Path>) -> Result<Store, CliError> {
    let path = db_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.storage.db_path.clone().into());
    Ok(Store::open(&path)?)
}

fn run_meta(config: &PipelineConfig) -> RunMeta {
    RunMeta {
        config_name: config.name.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn emit_json(report: &RunReport) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report).map_err(|e| CliError {
        code: crate::exit_codes::EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;
    println!("{json}");
    Ok(())
}

/// Read every configured source's bronze table. A missing table is treated
/// as an empty source (ingestion may not have run yet), with a warning.
fn load_bronze(config: &PipelineConfig, store: &Store) -> Result<ReconcileInput, CliError> {
    let mut records = BTreeMap::new();
    for source in &config.precedence {
        let table = &config.sources[source].table;
        if !store.table_exists(table)? {
            eprintln!("warning: bronze table '{table}' does not exist, treating '{source}' as empty");
            records.insert(source.clone(), Vec::new());
            continue;
        }
        records.insert(source.clone(), store.read_bronze(table, source)?);
    }
    Ok(ReconcileInput { records })
}

pub fn cmd_reconcile(
    config_path: &Path,
    db: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    let config = read_config(config_path)?;
    let mut store = open_store(&config, db)?;

    let input = load_bronze(&config, &store)?;
    let output = reconcile::run(&config, &input)?;
    store.replace_silver(&config.storage.silver_table, &output.bookings)?;

    let r = &output.report;
    eprintln!(
        "reconciled {} groups into {} silver rows ({} without status, {} without booking_id)",
        r.groups_total,
        r.rows_written,
        r.skipped_no_status,
        r.sources.values().map(|s| s.missing_booking_id).sum::<usize>(),
    );

    if json {
        emit_json(&RunReport {
            meta: run_meta(&config),
            reconcile: Some(output.report),
            rollup: None,
        })?;
    }
    Ok(())
}

pub fn cmd_aggregate(
    config_path: &Path,
    db: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    let config = read_config(config_path)?;
    let mut store = open_store(&config, db)?;

    let silver_table = &config.storage.silver_table;
    if !store.table_exists(silver_table)? {
        return Err(CliError::usage(format!("silver table '{silver_table}' does not exist"))
            .with_hint("run `medallion reconcile` first"));
    }
    let bookings = store.read_silver(silver_table)?;
    let output = rollup::build(&bookings, config.revenue.policy);
    store.replace_gold(&config.storage.gold_table, &output.rows)?;

    let r = &output.report;
    eprintln!(
        "rolled up {} silver rows into {} (date, city) KPI rows ({} missing date/city)",
        r.rows_in, r.groups_out, r.skipped_missing_key,
    );

    if json {
        emit_json(&RunReport {
            meta: run_meta(&config),
            reconcile: None,
            rollup: Some(output.report),
        })?;
    }
    Ok(())
}

pub fn cmd_run(config_path: &Path, db: Option<&Path>, json: bool) -> Result<(), CliError> {
    let config = read_config(config_path)?;
    let mut store = open_store(&config, db)?;

    let input = load_bronze(&config, &store)?;
    let reconciled = reconcile::run(&config, &input)?;
    store.replace_silver(&config.storage.silver_table, &reconciled.bookings)?;

    // The aggregation engine reads silver, never bronze — re-read what was
    // just committed rather than reusing in-memory rows.
    let bookings = store.read_silver(&config.storage.silver_table)?;
    let rolled = rollup::build(&bookings, config.revenue.policy);
    store.replace_gold(&config.storage.gold_table, &rolled.rows)?;

    eprintln!(
        "pipeline '{}': {} bronze groups → {} silver rows → {} gold rows",
        config.name,
        reconciled.report.groups_total,
        reconciled.report.rows_written,
        rolled.report.groups_out,
    );

    if json {
        emit_json(&RunReport {
            meta: run_meta(&config),
            reconcile: Some(reconciled.report),
            rollup: Some(rolled.report),
        })?;
    }
    Ok(())
}

pub fn cmd_validate(config_path: &Path) -> Result<(), CliError> {
    let config = read_config(config_path)?;
    eprintln!(
        "valid: '{}' with {} source(s), precedence: {}",
        config.name,
        config.sources.len(),
        config.precedence.join(" > "),
    );
    Ok(())
}

pub fn cmd_load(
    config_path: &Path,
    source: &str,
    file: &Path,
    db: Option<&Path>,
) -> Result<(), CliError> {
    let config = read_config(config_path)?;
    let Some(source_config) = config.sources.get(source) else {
        return Err(CliError::usage(format!("unknown source '{source}'")).with_hint(format!(
            "configured sources: {}",
            config.precedence.join(", ")
        )));
    };

    let csv_data = std::fs::read_to_string(file)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", file.display())))?;
    let records = ingest::load_bronze_csv(source, &csv_data)?;

    let mut store = open_store(&config, db)?;
    store.ensure_bronze(&source_config.table)?;
    store.append_bronze(&source_config.table, &records)?;

    eprintln!("loaded {} records into '{}'", records.len(), source_config.table);
    Ok(())
}

pub fn cmd_inspect(config_path: &Path, layer: Layer, db: Option<&Path>) -> Result<(), CliError> {
    let config = read_config(config_path)?;
    let store = open_store(&config, db)?;

    match layer {
        Layer::Bronze => inspect_bronze(&config, &store),
        Layer::Silver => inspect_silver(&config, &store),
        Layer::Gold => inspect_gold(&config, &store),
    }
}

fn inspect_bronze(config: &PipelineConfig, store: &Store) -> Result<(), CliError> {
    for source in &config.precedence {
        let table = &config.sources[source].table;
        println!("== {table} (source '{source}')");

        if !store.table_exists(table)? {
            println!("   table does not exist");
            continue;
        }

        println!("   columns:");
        for (name, decl_type) in store.table_columns(table)? {
            println!("   - {name} ({decl_type})");
        }

        println!("   sample rows:");
        for (i, row) in store.sample_rows(table, 3)?.iter().enumerate() {
            println!("   {}: {}", i + 1, row.join(" | "));
        }
    }
    Ok(())
}

fn inspect_silver(config: &PipelineConfig, store: &Store) -> Result<(), CliError> {
    let table = &config.storage.silver_table;

    let check = store.dedup_check(table)?;
    println!("== dedup check");
    println!("   total rows: {}", check.total_rows);
    println!("   unique booking_ids: {}", check.distinct_booking_ids);
    if check.total_rows != check.distinct_booking_ids {
        println!("   UNIQUENESS VIOLATED");
    }

    println!("== source of truth distribution");
    for (source, count) in store.count_by(table, "source_of_truth")? {
        println!("   {source}: {count}");
    }

    println!("== status distribution");
    for (status, count) in store.count_by(table, "status")? {
        println!("   {status}: {count}");
    }

    println!("== sample rows");
    for row in store.sample_rows(table, 10)? {
        println!("   {}", row.join(" | "));
    }
    Ok(())
}

fn inspect_gold(config: &PipelineConfig, store: &Store) -> Result<(), CliError> {
    let rows = store.read_gold(&config.storage.gold_table)?;
    println!("booking_date | city | total | confirmed | cancelled | cancel_rate_pct | total_revenue | avg_booking_price");
    for row in rows {
        // Presentation-side rounding only; stored values keep full precision
        println!(
            "{} | {} | {} | {} | {} | {:.1} | {} | {:.0}",
            row.booking_date,
            row.city,
            row.total_bookings,
            row.confirmed_bookings,
            row.cancelled_bookings,
            row.cancellation_rate * 100.0,
            row.total_revenue_cents,
            row.avg_booking_price_cents,
        );
    }
    Ok(())
}
