//! Data provider trait, the close-price series type and structured errors.
//!
//! The DataProvider trait abstracts over price sources so the batch
//! orchestrator can be driven by Stooq in production and by fakes in tests.

use chrono::NaiveDate;
use thiserror::Error;

/// Structured error types for data operations.
///
/// `Transient` and `NoData` describe a single attempt. `FetchFailed` is the
/// terminal per-symbol error the batch records and moves past.
/// `NoSymbolsSucceeded` and `SourceUnavailable` abort the run.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{0}")]
    Transient(String),

    #[error("no data")]
    NoData,

    #[error("{symbol}: {cause}")]
    FetchFailed {
        symbol: String,
        attempts: u32,
        cause: Box<DataError>,
    },

    #[error("no data downloaded: all {requested} tickers failed ({failed} recorded failures)")]
    NoSymbolsSucceeded { requested: usize, failed: usize },

    #[error("ticker source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl DataError {
    /// Whether another attempt at the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::Transient(_))
    }

    /// The upstream asserted it has no history for the symbol.
    pub fn is_permanent(&self) -> bool {
        match self {
            DataError::NoData => true,
            DataError::FetchFailed { cause, .. } => cause.is_permanent(),
            _ => false,
        }
    }
}

/// Daily closes for one symbol: dates strictly increasing, every price finite.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    /// Build a series from unordered points.
    ///
    /// Points are sorted by date (stable, so the first row for a date wins),
    /// duplicate dates are dropped and non-finite prices are discarded.
    pub fn from_points(symbol: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.retain(|(_, close)| close.is_finite());
        points.sort_by_key(|(date, _)| *date);
        points.dedup_by_key(|(date, _)| *date);
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }
}

/// A source of daily close prices.
///
/// Implementations own their retry policy; a returned error is terminal for
/// that symbol.
pub trait DataProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily closes for `symbol` over `[start, end]`, labeled with the
    /// symbol's canonical form.
    fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError>;
}

/// Progress callback for the batch download.
pub trait BatchProgress {
    /// Called before a symbol is fetched. `index` is zero-based.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called once a symbol has succeeded or exhausted its retries.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: Result<(), &DataError>);

    /// Called every `checkpoint_every` symbols with the number done so far.
    fn on_checkpoint(&self, done: usize, total: usize);

    /// Called when every symbol has been attempted.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl BatchProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::debug!(symbol, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, result: Result<(), &DataError>) {
        match result {
            Ok(()) => tracing::debug!(symbol, "ok"),
            Err(e) => tracing::warn!(symbol, error = %e, "ticker failed"),
        }
    }

    fn on_checkpoint(&self, done: usize, total: usize) {
        tracing::info!("[stooq] done {done}/{total}");
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!("download complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
