//! Artifact export: Parquet price table, CSV failure log, JSON run metadata.
//!
//! Every artifact is rendered to memory first and then written atomically
//! (write `{file}.tmp`, rename into place), so a failed run never leaves a
//! half-written file behind.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use closefetch_core::data::{BatchResult, PriceTable};
use closefetch_core::symbol::DATE_COLUMN;
use closefetch_core::{DataError, FetchConfig};
use polars::prelude::*;

use crate::meta::RunMeta;

// ─── Parquet export ─────────────────────────────────────────────────

/// Convert a price table to a DataFrame: a `date` column followed by one
/// nullable Float64 column per symbol.
pub fn table_to_dataframe(table: &PriceTable) -> Result<DataFrame> {
    // NaiveDate::default() is the Unix epoch.
    let epoch = NaiveDate::default();
    let days: Vec<i32> = table
        .dates()
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(table.column_count() + 1);
    columns.push(
        Column::new(DATE_COLUMN.into(), days)
            .cast(&DataType::Date)
            .context("failed to cast date column")?,
    );
    for (symbol, values) in table.columns() {
        columns.push(Column::new(symbol.into(), values.to_vec()));
    }

    DataFrame::new(columns).context("failed to build price DataFrame")
}

/// Serialize the price table as Parquet bytes.
pub fn export_prices_parquet(table: &PriceTable) -> Result<Vec<u8>> {
    let mut df = table_to_dataframe(table)?;
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df)
        .map_err(|e| DataError::ParquetError(e.to_string()))?;
    Ok(buf)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the failure log as CSV with `symbol,error` columns.
pub fn export_failures_csv(failures: &BTreeMap<String, String>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["symbol", "error"])?;
    for (symbol, error) in failures {
        wtr.write_record([symbol, error])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_meta_json(meta: &RunMeta) -> Result<String> {
    serde_json::to_string_pretty(meta).context("failed to serialize run metadata")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Where a run's artifacts were written.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub prices: PathBuf,
    /// `None` when every ticker succeeded.
    pub failures: Option<PathBuf>,
    pub meta: PathBuf,
}

/// Save the full artifact set for a finished batch.
///
/// Writes, under `config.output.dir`:
/// - the price table (Parquet)
/// - the failure log (CSV), only if any ticker failed
/// - the run metadata (JSON)
pub fn save_artifacts(
    config: &FetchConfig,
    batch: &BatchResult,
    meta: &RunMeta,
) -> Result<ArtifactPaths> {
    let dir = &config.output.dir;
    fs::create_dir_all(dir)
        .map_err(|e| DataError::Io(format!("create output dir {}: {e}", dir.display())))?;

    let prices = config.prices_path();
    write_atomic(&prices, &export_prices_parquet(&batch.table)?)?;

    let failures = if batch.failures.is_empty() {
        None
    } else {
        let path = config.failures_path();
        write_atomic(&path, export_failures_csv(&batch.failures)?.as_bytes())?;
        Some(path)
    };

    let meta_path = config.meta_path();
    write_atomic(&meta_path, export_meta_json(meta)?.as_bytes())?;

    Ok(ArtifactPaths {
        prices,
        failures,
        meta: meta_path,
    })
}

/// Write `bytes` to `{path}.tmp`, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, bytes)
        .map_err(|e| DataError::Io(format!("write {}: {e}", tmp_path.display())))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Io(format!("rename into {}: {e}", path.display()))
    })?;
    Ok(())
}
