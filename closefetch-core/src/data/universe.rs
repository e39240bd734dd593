//! Universe construction: the ordered ticker list for a run.
//!
//! The default universe is the S&P 500 constituents list (a remote CSV with
//! a `Symbol` column) followed by a fixed set of ETFs. Tickers are
//! canonicalised and de-duplicated keeping the first occurrence.

use super::http::HttpTransport;
use super::provider::DataError;
use crate::config::FetchConfig;
use crate::symbol::{canonical_symbol, dedupe_stable, is_reserved};

/// The ordered, de-duplicated list of canonical tickers to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    tickers: Vec<String>,
}

impl Universe {
    /// Build a universe from an explicit list: canonicalise, drop empties and
    /// the reserved `date` name, de-duplicate.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical = symbols
            .into_iter()
            .map(|s| canonical_symbol(s.as_ref()))
            .filter(|s| {
                if is_reserved(s) {
                    tracing::warn!(symbol = %s, "ticker collides with the date column, skipped");
                    return false;
                }
                !s.is_empty()
            });
        Self {
            tickers: dedupe_stable(canonical),
        }
    }

    /// Download the constituents list and append the configured extras.
    pub fn from_source(session: &dyn HttpTransport, config: &FetchConfig) -> Result<Self, DataError> {
        let constituents = fetch_constituents(session, &config.constituents_url)?;
        tracing::debug!(count = constituents.len(), "constituents loaded");
        Ok(Self::from_symbols(constituents).with_extras(&config.extra_tickers))
    }

    /// Append `extras` and de-duplicate again.
    pub fn with_extras(self, extras: &[String]) -> Self {
        Self::from_symbols(self.tickers.into_iter().chain(extras.iter().cloned()))
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// GET the constituents CSV. Any failure to read it is fatal for the run.
pub fn fetch_constituents(session: &dyn HttpTransport, url: &str) -> Result<Vec<String>, DataError> {
    let resp = session
        .get_text(url)
        .map_err(|e| DataError::SourceUnavailable(format!("{url}: {e}")))?;

    if !(200..300).contains(&resp.status) {
        return Err(DataError::SourceUnavailable(format!(
            "{url}: HTTP {}",
            resp.status
        )));
    }

    parse_constituents(&resp.body)
}

/// Read the `Symbol` column of a constituents CSV, trimmed and canonicalised.
pub fn parse_constituents(body: &str) -> Result<Vec<String>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let symbol_idx = reader
        .headers()
        .map_err(|e| DataError::SourceUnavailable(format!("constituents CSV: {e}")))?
        .iter()
        .position(|h| h.trim() == "Symbol")
        .ok_or_else(|| {
            DataError::SourceUnavailable("constituents CSV has no 'Symbol' column".into())
        })?;

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| DataError::SourceUnavailable(format!("constituents CSV: {e}")))?;
        if let Some(raw) = record.get(symbol_idx) {
            let symbol = canonical_symbol(raw);
            if !symbol.is_empty() {
                symbols.push(symbol);
            }
        }
    }

    Ok(dedupe_stable(symbols))
}
