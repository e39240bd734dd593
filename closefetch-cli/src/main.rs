//! closefetch CLI: download the S&P 500 + ETF daily close table from Stooq.
//!
//! Writes the price table (Parquet), a failure log (CSV, only when some
//! tickers failed) and run metadata (JSON) into the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use closefetch_core::FetchConfig;
use closefetch_runner::{fetch_and_save, RunSummary, TickerSource};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(
    name = "closefetch",
    about = "Fetch daily closes for the S&P 500 plus a set of ETFs from Stooq"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the artifacts are written to.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Years of history before the current year.
    #[arg(long)]
    lookback_years: Option<u32>,

    /// Explicit tickers (e.g. AAPL BRK.B). Skips the constituents download.
    #[arg(long, num_args = 1..)]
    symbols: Vec<String>,

    /// Do not append the configured extra ETFs.
    #[arg(long, default_value_t = false)]
    no_extras: bool,

    /// Keep retrying tickers that answer "no data".
    #[arg(long, default_value_t = false)]
    retry_no_data: bool,

    /// Log level for closefetch crates (RUST_LOG takes precedence).
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Load the config file (or defaults) and apply flag overrides.
    fn resolve_config(&self) -> Result<FetchConfig> {
        let mut config = match &self.config {
            Some(path) => FetchConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => FetchConfig::default(),
        };

        if let Some(dir) = &self.out_dir {
            config.output.dir = dir.clone();
        }
        if let Some(years) = self.lookback_years {
            config.lookback_years = years;
        }
        if self.no_extras {
            config.extra_tickers.clear();
        }
        if self.retry_no_data {
            config.retry_no_data = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Short description of where the tickers come from, for the start log.
    fn source_label(&self) -> String {
        if self.symbols.is_empty() {
            "constituents".to_string()
        } else {
            format!("explicit ({} symbols)", self.symbols.len())
        }
    }

    fn ticker_source(&self) -> TickerSource {
        if self.symbols.is_empty() {
            TickerSource::Constituents
        } else {
            TickerSource::Explicit(self.symbols.clone())
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("closefetch={level},closefetch_core={level},closefetch_runner={level}")
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn summary_line(summary: &RunSummary) -> String {
    let max_date = summary
        .meta
        .max_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".into());
    format!(
        "Saved: {} | cols={} | max_date={} | failures={}",
        summary.paths.prices.display(),
        summary.meta.tickers_ok,
        max_date,
        summary.meta.failures
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    tracing::info!(source = %cli.source_label(), "closefetch starting");

    let config = cli.resolve_config()?;
    tracing::debug!(
        out_dir = %config.output.dir.display(),
        lookback_years = config.lookback_years,
        extras = config.extra_tickers.len(),
        retry_no_data = config.retry_no_data,
        "config resolved"
    );
    let summary = fetch_and_save(&config, &cli.ticker_source())?;

    println!("{}", summary_line(&summary));
    if let Some(path) = &summary.paths.failures {
        println!("Failures logged to: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("closefetch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_use_constituents_and_extras() {
        let cli = parse(&[]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(cli.ticker_source(), TickerSource::Constituents);
        assert_eq!(cli.source_label(), "constituents");
        assert_eq!(config, FetchConfig::default());
        assert!(!config.extra_tickers.is_empty());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--out-dir",
            "/tmp/closes",
            "--lookback-years",
            "2",
            "--no-extras",
            "--retry-no-data",
            "--symbols",
            "AAPL",
            "BRK.B",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.output.dir, PathBuf::from("/tmp/closes"));
        assert_eq!(config.lookback_years, 2);
        assert!(config.extra_tickers.is_empty());
        assert!(config.retry_no_data);
        assert_eq!(
            cli.ticker_source(),
            TickerSource::Explicit(vec!["AAPL".into(), "BRK.B".into()])
        );
        assert_eq!(cli.source_label(), "explicit (2 symbols)");
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "lookback_years = 7\nper_ticker_retries = 5").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let from_file = parse(&["--config", &path]).resolve_config().unwrap();
        assert_eq!(from_file.lookback_years, 7);
        assert_eq!(from_file.per_ticker_retries, 5);

        let overridden = parse(&["--config", &path, "--lookback-years", "1"])
            .resolve_config()
            .unwrap();
        assert_eq!(overridden.lookback_years, 1);
        assert_eq!(overridden.per_ticker_retries, 5);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = parse(&["--config", "/nonexistent/closefetch.toml"]);
        assert!(cli.resolve_config().is_err());
    }
}
