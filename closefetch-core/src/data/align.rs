//! Multi-symbol time alignment.
//!
//! Given close series for multiple symbols, align them to a common date axis
//! (outer join). Missing closes stay `None`; nothing is forward-filled.

use super::provider::PriceSeries;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Close prices for many symbols on one date axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceTable {
    /// The common date axis, ascending.
    dates: Vec<NaiveDate>,
    /// Column labels in insertion order.
    symbols: Vec<String>,
    /// One column per symbol, each as long as `dates`.
    columns: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Iterate `(symbol, column)` pairs in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.symbols
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    pub fn column(&self, symbol: &str) -> Option<&[Option<f64>]> {
        let idx = self.symbols.iter().position(|s| s == symbol)?;
        Some(&self.columns[idx])
    }

    /// Close for `symbol` on `date`, if both exist and the cell is filled.
    pub fn get(&self, date: NaiveDate, symbol: &str) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.column(symbol)?[row]
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn column_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Latest date on the axis.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// Merge series into one table.
///
/// The date axis is the sorted union of every series' dates. Each series
/// becomes one column, looked up by date; a later series whose symbol is
/// already present is dropped.
pub fn merge_series(series: &[PriceSeries]) -> PriceTable {
    let mut seen = HashSet::new();
    let mut kept: Vec<&PriceSeries> = Vec::with_capacity(series.len());
    for s in series {
        if seen.insert(s.symbol()) {
            kept.push(s);
        }
    }

    let all_dates: BTreeSet<NaiveDate> = kept
        .iter()
        .flat_map(|s| s.points().iter().map(|(date, _)| *date))
        .collect();
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let mut symbols = Vec::with_capacity(kept.len());
    let mut columns = Vec::with_capacity(kept.len());
    for s in kept {
        let by_date: HashMap<NaiveDate, f64> = s.points().iter().copied().collect();
        columns.push(dates.iter().map(|d| by_date.get(d).copied()).collect());
        symbols.push(s.symbol().to_string());
    }

    PriceTable {
        dates,
        symbols,
        columns,
    }
}
