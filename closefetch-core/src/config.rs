//! Run configuration.
//!
//! Every tunable that drives a run lives here and is passed explicitly to the
//! fetcher, the batch orchestrator and the runner. Loaded from TOML; any
//! field left out of the file takes its default.

use crate::data::provider::DataError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SP500_CONSTITUENTS_URL: &str =
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/main/data/constituents.csv";

pub const STOOQ_DAILY_URL: &str = "https://stooq.com/q/d/l/";

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// ETFs fetched alongside the index constituents.
pub const DEFAULT_EXTRA_TICKERS: [&str; 18] = [
    "SPY", "XOP", "XLE", "USO", "DBC", "GLD", "JETS", "PEJ", "VNQ", "IYR", "HYG", "JNK", "ANGL",
    "DVY", "VYM", "SDIV", "EMB", "HYEM",
];

/// Configuration for one fetch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    /// CSV with a `Symbol` column listing the index members.
    pub constituents_url: String,
    /// Base of the per-symbol daily CSV endpoint.
    pub price_url_base: String,
    /// Appended to the lower-cased ticker to form the source symbol.
    pub market_suffix: String,
    /// Appended to the constituents list before de-duplication.
    pub extra_tickers: Vec<String>,
    /// Start date is January 1st of `end.year - lookback_years`.
    pub lookback_years: u32,
    /// IANA zone used for "today" and the `generated_at` stamp.
    pub timezone: String,
    pub user_agent: String,
    pub req_timeout_secs: u64,
    /// Attempts per ticker, including the first.
    pub per_ticker_retries: u32,
    /// Backoff after attempt `n` is `min(backoff_cap_secs, sleep_base_secs * 2^n)`.
    pub sleep_base_secs: f64,
    pub backoff_cap_secs: f64,
    /// Sleep `pause_secs` after every `pause_every` tickers (0 disables).
    pub pause_every: usize,
    pub pause_secs: f64,
    /// Report progress and sleep `checkpoint_pause_secs` after every
    /// `checkpoint_every` tickers (0 disables).
    pub checkpoint_every: usize,
    pub checkpoint_pause_secs: f64,
    /// Keep retrying a ticker after the source answers "no data".
    pub retry_no_data: bool,
    pub output: OutputConfig,
}

/// Where the run artifacts land.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub prices_file: String,
    pub failures_file: String,
    pub meta_file: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            constituents_url: SP500_CONSTITUENTS_URL.to_string(),
            price_url_base: STOOQ_DAILY_URL.to_string(),
            market_suffix: crate::symbol::DEFAULT_MARKET_SUFFIX.to_string(),
            extra_tickers: DEFAULT_EXTRA_TICKERS.iter().map(|s| s.to_string()).collect(),
            lookback_years: 4,
            timezone: "America/New_York".to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            req_timeout_secs: 20,
            per_ticker_retries: 3,
            sleep_base_secs: 0.25,
            backoff_cap_secs: 5.0,
            pause_every: 1,
            pause_secs: 0.25,
            checkpoint_every: 25,
            checkpoint_pause_secs: 2.0,
            retry_no_data: false,
            output: OutputConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            prices_file: "sp500_etf.parquet".to_string(),
            failures_file: "sp500_etf_failures.csv".to_string(),
            meta_file: "sp500_etf_meta.json".to_string(),
        }
    }
}

impl FetchConfig {
    /// Load a config from a TOML file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::InvalidConfig(format!("read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DataError::InvalidConfig(format!("parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.per_ticker_retries == 0 {
            return Err(DataError::InvalidConfig(
                "per_ticker_retries must be at least 1".into(),
            ));
        }
        for (name, secs) in [
            ("sleep_base_secs", self.sleep_base_secs),
            ("backoff_cap_secs", self.backoff_cap_secs),
            ("pause_secs", self.pause_secs),
            ("checkpoint_pause_secs", self.checkpoint_pause_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(DataError::InvalidConfig(format!(
                    "{name} must be a non-negative number of seconds, got {secs}"
                )));
            }
        }
        if self.price_url_base.trim().is_empty() {
            return Err(DataError::InvalidConfig("price_url_base is empty".into()));
        }
        if self.constituents_url.trim().is_empty() {
            return Err(DataError::InvalidConfig("constituents_url is empty".into()));
        }
        self.tz()?;
        Ok(())
    }

    /// The configured time zone.
    pub fn tz(&self) -> Result<chrono_tz::Tz, DataError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| DataError::InvalidConfig(format!("timezone '{}': {e}", self.timezone)))
    }

    pub fn req_timeout(&self) -> Duration {
        Duration::from_secs(self.req_timeout_secs)
    }

    pub fn sleep_base(&self) -> Duration {
        Duration::from_secs_f64(self.sleep_base_secs)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_cap_secs)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs_f64(self.pause_secs)
    }

    pub fn checkpoint_pause(&self) -> Duration {
        Duration::from_secs_f64(self.checkpoint_pause_secs)
    }

    /// Zero every sleep. Used by tests and dry runs against local servers.
    pub fn without_delays(mut self) -> Self {
        self.sleep_base_secs = 0.0;
        self.backoff_cap_secs = 0.0;
        self.pause_secs = 0.0;
        self.checkpoint_pause_secs = 0.0;
        self
    }

    pub fn prices_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.prices_file)
    }

    pub fn failures_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.failures_file)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.meta_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stooq_pacing() {
        let c = FetchConfig::default();
        assert_eq!(c.per_ticker_retries, 3);
        assert_eq!(c.req_timeout(), Duration::from_secs(20));
        assert_eq!(c.sleep_base(), Duration::from_millis(250));
        assert_eq!(c.checkpoint_every, 25);
        assert_eq!(c.extra_tickers.len(), 18);
        assert!(!c.retry_no_data);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = FetchConfig::from_toml(
            r#"
lookback_years = 2
extra_tickers = ["SPY"]

[output]
dir = "out"
"#,
        )
        .unwrap();
        assert_eq!(c.lookback_years, 2);
        assert_eq!(c.extra_tickers, vec!["SPY".to_string()]);
        assert_eq!(c.per_ticker_retries, 3);
        assert_eq!(c.prices_path(), PathBuf::from("out/sp500_etf.parquet"));
    }

    #[test]
    fn zero_retries_rejected() {
        let err = FetchConfig::from_toml("per_ticker_retries = 0").unwrap_err();
        assert!(matches!(err, DataError::InvalidConfig(_)));
    }

    #[test]
    fn negative_pause_rejected() {
        let err = FetchConfig::from_toml("pause_secs = -1.0").unwrap_err();
        assert!(err.to_string().contains("pause_secs"));
    }

    #[test]
    fn unknown_timezone_rejected() {
        let err = FetchConfig::from_toml(r#"timezone = "Mars/Olympus""#).unwrap_err();
        assert!(matches!(err, DataError::InvalidConfig(_)));
    }

    #[test]
    fn without_delays_zeroes_all_sleeps() {
        let c = FetchConfig::default().without_delays();
        assert_eq!(c.sleep_base(), Duration::ZERO);
        assert_eq!(c.pause(), Duration::ZERO);
        assert_eq!(c.checkpoint_pause(), Duration::ZERO);
    }

    #[test]
    fn toml_roundtrip() {
        let c = FetchConfig::default();
        let s = toml::to_string_pretty(&c).unwrap();
        assert_eq!(FetchConfig::from_toml(&s).unwrap(), c);
    }
}
