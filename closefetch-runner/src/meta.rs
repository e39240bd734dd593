//! Run metadata written next to the price table.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use closefetch_core::data::BatchResult;
use serde::{Deserialize, Serialize};

/// Requested date range for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RunWindow {
    /// From January 1st `lookback_years` before `today`'s year through `today`.
    pub fn ending(today: NaiveDate, lookback_years: u32) -> Option<Self> {
        let year = today.year().checked_sub(i32::try_from(lookback_years).ok()?)?;
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        Some(Self { start, end: today })
    }
}

/// Summary of one run, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    /// RFC 3339 timestamp in the configured time zone.
    pub generated_at: String,
    pub lookback_years: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tickers_requested: usize,
    pub tickers_ok: usize,
    pub failures: usize,
    pub max_date: Option<NaiveDate>,
}

impl RunMeta {
    pub fn from_batch<Tz>(
        generated_at: &DateTime<Tz>,
        lookback_years: u32,
        window: &RunWindow,
        batch: &BatchResult,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            generated_at: generated_at.to_rfc3339(),
            lookback_years,
            start: window.start,
            end: window.end,
            tickers_requested: batch.requested,
            tickers_ok: batch.table.column_count(),
            failures: batch.failures.len(),
            max_date: batch.table.max_date(),
        }
    }
}
