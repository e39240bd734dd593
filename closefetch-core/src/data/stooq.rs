//! Stooq daily CSV provider.
//!
//! Fetches one symbol's daily closes from Stooq's bounded-range CSV endpoint.
//! Handles response classification, CSV parsing and retries with exponential
//! backoff.
//!
//! Stooq answers throttled or blocked clients with HTML or an empty-ish body
//! and a 200 status, so every response is inspected before it is parsed.

use super::http::{HttpResponse, HttpTransport};
use super::provider::{DataError, DataProvider, PriceSeries};
use crate::config::FetchConfig;
use crate::symbol::{canonical_symbol, encode_symbol};
use chrono::NaiveDate;
use std::time::Duration;

/// Statuses that indicate throttling or an upstream hiccup.
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// How much of the body is inspected when classifying a response.
const HEAD_CHARS: usize = 200;

/// Date formats accepted in the `Date` column.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

/// Stooq data provider.
pub struct StooqProvider<'s> {
    session: &'s dyn HttpTransport,
    url_base: String,
    market_suffix: String,
    max_retries: u32,
    sleep_base: Duration,
    backoff_cap: Duration,
    retry_no_data: bool,
}

impl<'s> StooqProvider<'s> {
    pub fn new(session: &'s dyn HttpTransport, config: &FetchConfig) -> Self {
        Self {
            session,
            url_base: config.price_url_base.clone(),
            market_suffix: config.market_suffix.clone(),
            max_retries: config.per_ticker_retries.max(1),
            sleep_base: config.sleep_base(),
            backoff_cap: config.backoff_cap(),
            retry_no_data: config.retry_no_data,
        }
    }

    /// Build the daily CSV URL for a symbol and date range.
    pub fn daily_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}?s={}&i=d&d1={}&d2={}",
            self.url_base,
            encode_symbol(symbol, &self.market_suffix),
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        )
    }

    /// One request, classified and parsed.
    fn attempt(&self, url: &str, label: &str) -> Result<PriceSeries, DataError> {
        let resp = self.session.get_text(url)?;
        classify_response(&resp)?;
        parse_close_csv(label, &resp.body)
    }

    fn should_retry(&self, err: &DataError) -> bool {
        err.is_retryable() || (self.retry_no_data && err.is_permanent())
    }

    /// Execute the request with retry and backoff.
    fn fetch_with_retry(
        &self,
        label: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let url = self.daily_url(label, start, end);
        let mut attempt = 1;

        loop {
            let err = match self.attempt(&url, label) {
                Ok(series) => {
                    tracing::debug!(symbol = label, attempt, rows = series.len(), "fetched");
                    return Ok(series);
                }
                Err(e) => e,
            };
            tracing::debug!(symbol = label, attempt, error = %err, "attempt failed");

            if attempt >= self.max_retries || !self.should_retry(&err) {
                return Err(DataError::FetchFailed {
                    symbol: label.to_string(),
                    attempts: attempt,
                    cause: Box::new(err),
                });
            }

            std::thread::sleep(backoff_delay(self.sleep_base, attempt, self.backoff_cap));
            attempt += 1;
        }
    }
}

impl DataProvider for StooqProvider<'_> {
    fn name(&self) -> &str {
        "stooq"
    }

    fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        self.fetch_with_retry(&canonical_symbol(symbol), start, end)
    }
}

/// Sleep after failed attempt `attempt` (1-based): `min(cap, base * 2^attempt)`.
pub fn backoff_delay(base: Duration, attempt: u32, cap: Duration) -> Duration {
    1u32.checked_shl(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(cap, |delay| delay.min(cap))
}

/// Decide whether a response body looks like price CSV.
///
/// "no data" is permanent. HTML, throttling text, a retryable status or
/// anything without a CSV header is transient.
pub fn classify_response(resp: &HttpResponse) -> Result<(), DataError> {
    let head: String = resp.body.chars().take(HEAD_CHARS).collect();
    let head = head.trim().to_lowercase();

    if head.starts_with("no data") {
        return Err(DataError::NoData);
    }

    let is_htmlish = head.starts_with("<!doctype")
        || head.starts_with("<html")
        || head.contains("too many requests");
    let is_not_csv = !head.starts_with("date,") && !head.contains("date,open,high,low,close");

    if TRANSIENT_STATUSES.contains(&resp.status) || is_htmlish || is_not_csv {
        let snippet: String = head.chars().take(80).collect();
        return Err(DataError::Transient(format!(
            "transient non-csv response (status={}, ct={}, head={snippet})",
            resp.status, resp.content_type
        )));
    }

    Ok(())
}

/// Parse a `Date,...,Close,...` CSV body into a series labeled `label`.
///
/// Rows with an unparseable date or close are dropped.
pub fn parse_close_csv(label: &str, body: &str) -> Result<PriceSeries, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::Transient(format!("csv parse error: {e}")))?
        .clone();
    let date_idx = headers.iter().position(|h| h == "Date");
    let close_idx = headers.iter().position(|h| h == "Close");
    let (Some(date_idx), Some(close_idx)) = (date_idx, close_idx) else {
        return Err(DataError::Transient("empty or missing columns".into()));
    };

    let mut rows = 0usize;
    let mut points = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataError::Transient(format!("csv parse error: {e}")))?;
        rows += 1;

        let date = record.get(date_idx).and_then(parse_date);
        let close = record
            .get(close_idx)
            .and_then(|v| v.parse::<f64>().ok());
        if let (Some(date), Some(close)) = (date, close) {
            points.push((date, close));
        }
    }

    if rows == 0 {
        return Err(DataError::Transient("empty or missing columns".into()));
    }

    let series = PriceSeries::from_points(label, points);
    if series.is_empty() {
        return Err(DataError::Transient("no close data".into()));
    }
    Ok(series)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
