//! Download orchestrator. Drives the provider over a ticker list with pacing
//! and progress reporting, then merges the successes into one table.

use super::align::{merge_series, PriceTable};
use super::provider::{BatchProgress, DataError, DataProvider};
use crate::config::FetchConfig;
use crate::symbol::{canonical_symbol, dedupe_stable, is_reserved};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::time::Duration;

/// Request pacing between tickers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    /// Sleep `pause` after every `pause_every` tickers (0 disables).
    pub pause_every: usize,
    pub pause: Duration,
    /// Report progress and sleep `checkpoint_pause` every `checkpoint_every`
    /// tickers (0 disables).
    pub checkpoint_every: usize,
    pub checkpoint_pause: Duration,
}

impl Pacing {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            pause_every: config.pause_every,
            pause: config.pause(),
            checkpoint_every: config.checkpoint_every,
            checkpoint_pause: config.checkpoint_pause(),
        }
    }

    /// No pauses and no checkpoints.
    pub fn none() -> Self {
        Self {
            pause_every: 0,
            pause: Duration::ZERO,
            checkpoint_every: 0,
            checkpoint_pause: Duration::ZERO,
        }
    }
}

/// Outcome of a batch in which at least one ticker succeeded.
#[derive(Debug)]
pub struct BatchResult {
    /// Number of distinct tickers attempted.
    pub requested: usize,
    pub table: PriceTable,
    /// Ticker → terminal error message, for every ticker that failed.
    pub failures: BTreeMap<String, String>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.table.column_count()
    }

    pub fn failed_symbols(&self) -> Vec<&str> {
        self.failures.keys().map(String::as_str).collect()
    }
}

/// Fetch every ticker in order, one at a time, and merge the results.
///
/// Tickers are canonicalised before de-duplication, so `BRK.B` and `BRK-B`
/// are one request and one key in the table or the failure map. A failed
/// ticker is recorded and skipped. The batch itself fails only when no ticker
/// succeeded.
pub fn download_closes(
    provider: &dyn DataProvider,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    pacing: &Pacing,
    progress: &dyn BatchProgress,
) -> Result<BatchResult, DataError> {
    let symbols = dedupe_stable(
        symbols
            .iter()
            .map(|s| canonical_symbol(s))
            .filter(|s| !s.is_empty() && !is_reserved(s)),
    );
    let total = symbols.len();
    let mut collected = Vec::new();
    let mut failures = BTreeMap::new();

    tracing::debug!(provider = provider.name(), total, %start, %end, "starting batch");

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        match provider.fetch_closes(symbol, start, end) {
            Ok(series) => {
                progress.on_complete(symbol, i, total, Ok(()));
                collected.push(series);
            }
            Err(e) => {
                progress.on_complete(symbol, i, total, Err(&e));
                failures.insert(symbol.clone(), e.to_string());
            }
        }

        let done = i + 1;
        if pacing.checkpoint_every > 0 && done % pacing.checkpoint_every == 0 {
            progress.on_checkpoint(done, total);
            sleep(pacing.checkpoint_pause);
        }
        if pacing.pause_every > 0 && done % pacing.pause_every == 0 {
            sleep(pacing.pause);
        }
    }

    let table = merge_series(&collected);
    progress.on_batch_complete(table.column_count(), failures.len(), total);

    if table.is_empty() {
        return Err(DataError::NoSymbolsSucceeded {
            requested: total,
            failed: failures.len(),
        });
    }

    Ok(BatchResult {
        requested: total,
        table,
        failures,
    })
}

fn sleep(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}
