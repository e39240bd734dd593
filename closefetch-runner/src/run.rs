//! End-to-end run: build the universe, download every ticker, write artifacts.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use closefetch_core::data::{
    download_closes, BatchResult, HttpSession, HttpTransport, LogProgress, Pacing, StooqProvider,
    Universe,
};
use closefetch_core::FetchConfig;

use crate::export::{save_artifacts, ArtifactPaths};
use crate::meta::{RunMeta, RunWindow};

/// Where the ticker list comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerSource {
    /// The remote constituents CSV plus the configured extras.
    Constituents,
    /// An explicit list plus the configured extras.
    Explicit(Vec<String>),
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub meta: RunMeta,
    pub paths: ArtifactPaths,
    pub batch: BatchResult,
}

/// Run the whole pipeline with a fresh HTTP session.
///
/// The session lives for the duration of the call and is dropped on every
/// exit path. Nothing is written unless at least one ticker succeeded.
pub fn fetch_and_save(config: &FetchConfig, source: &TickerSource) -> Result<RunSummary> {
    config.validate()?;
    let tz = config.tz()?;
    let session = HttpSession::new(config)?;
    let clock = move || Utc::now().with_timezone(&tz);
    run_with_session(config, &session, source, &clock)
}

/// Run the pipeline against an existing transport.
///
/// `clock` returns the current time in the configured zone. It is read once
/// at the start for the date window and once after the batch for the
/// `generated_at` stamp.
pub fn run_with_session(
    config: &FetchConfig,
    session: &dyn HttpTransport,
    source: &TickerSource,
    clock: &dyn Fn() -> DateTime<chrono_tz::Tz>,
) -> Result<RunSummary> {
    let now = clock();
    let window = RunWindow::ending(now.date_naive(), config.lookback_years).ok_or_else(|| {
        anyhow!(
            "lookback of {} years from {} is out of range",
            config.lookback_years,
            now.date_naive()
        )
    })?;

    let universe = match source {
        TickerSource::Constituents => Universe::from_source(session, config)?,
        TickerSource::Explicit(symbols) => {
            Universe::from_symbols(symbols).with_extras(&config.extra_tickers)
        }
    };

    tracing::info!(
        "Tickers: {} | start={} end={}",
        universe.len(),
        window.start,
        window.end
    );

    let provider = StooqProvider::new(session, config);
    let batch = download_closes(
        &provider,
        universe.tickers(),
        window.start,
        window.end,
        &Pacing::from_config(config),
        &LogProgress,
    )?;

    let generated_at = clock();
    let meta = RunMeta::from_batch(&generated_at, config.lookback_years, &window, &batch);
    let paths = save_artifacts(config, &batch, &meta)?;

    tracing::info!(
        prices = %paths.prices.display(),
        cols = meta.tickers_ok,
        failures = meta.failures,
        "artifacts saved"
    );

    Ok(RunSummary { meta, paths, batch })
}
