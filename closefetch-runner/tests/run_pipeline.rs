//! Integration tests for the full run against a local mock of the ticker
//! and price sources.

use chrono::{NaiveDate, TimeZone};
use closefetch_core::data::HttpSession;
use closefetch_core::{DataError, FetchConfig};
use closefetch_runner::{run_with_session, TickerSource};
use mockito::{Matcher, ServerGuard};
use polars::prelude::*;
use std::path::Path;

const X_CSV: &str = "Date,Open,High,Low,Close,Volume\n\
                     2024-01-02,10,11,9,10.5,1000\n\
                     2024-01-03,10.5,12,10,11.25,1200\n";

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn now_ny() -> chrono::DateTime<chrono_tz::Tz> {
    chrono_tz::America::New_York
        .with_ymd_and_hms(2024, 1, 4, 12, 0, 0)
        .unwrap()
}

fn config_for(server: &ServerGuard, out_dir: &Path) -> FetchConfig {
    let mut config = FetchConfig::default().without_delays();
    config.price_url_base = format!("{}/q/d/l/", server.url());
    config.constituents_url = format!("{}/constituents.csv", server.url());
    config.extra_tickers = Vec::new();
    config.output.dir = out_dir.to_path_buf();
    config
}

fn price_mock(
    server: &mut ServerGuard,
    encoded: &str,
    status: usize,
    body: &str,
    hits: usize,
) -> mockito::Mock {
    server
        .mock("GET", "/q/d/l/")
        .match_query(Matcher::UrlEncoded("s".into(), encoded.into()))
        .with_status(status)
        .with_body(body)
        .expect(hits)
        .create()
}

fn explicit(symbols: &[&str]) -> TickerSource {
    TickerSource::Explicit(symbols.iter().map(|s| s.to_string()).collect())
}

#[test]
fn partial_success_writes_all_artifacts() {
    let mut server = mockito::Server::new();
    let x = price_mock(&mut server, "x.us", 200, X_CSV, 1);
    let y = price_mock(&mut server, "y.us", 429, "Too Many Requests", 3);

    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(&server, tmp.path());
    let session = HttpSession::new(&config).unwrap();

    let summary = run_with_session(&config, &session, &explicit(&["X", "Y"]), &now_ny).unwrap();

    x.assert();
    y.assert();

    assert_eq!(summary.meta.tickers_requested, 2);
    assert_eq!(summary.meta.tickers_ok, 1);
    assert_eq!(summary.meta.failures, 1);
    assert_eq!(summary.meta.max_date, Some(d("2024-01-03")));
    assert_eq!(summary.meta.start, d("2020-01-01"));
    assert_eq!(summary.meta.end, d("2024-01-04"));
    assert_eq!(summary.meta.generated_at, "2024-01-04T12:00:00-05:00");

    // Price table: date + X, two rows
    let file = std::fs::File::open(&summary.paths.prices).unwrap();
    let df = ParquetReader::new(file).finish().unwrap();
    assert_eq!(df.width(), 2);
    assert_eq!(df.height(), 2);
    let closes = df.column("X").unwrap().f64().unwrap();
    assert_eq!(closes.get(1), Some(11.25));
    assert!(df.column("Y").is_err());

    // Failure log lists Y only
    let failures_path = summary.paths.failures.clone().unwrap();
    let failures = std::fs::read_to_string(failures_path).unwrap();
    let mut lines = failures.lines();
    assert_eq!(lines.next(), Some("symbol,error"));
    assert!(lines.next().unwrap().starts_with("Y,"));
    assert_eq!(lines.next(), None);

    // Meta JSON
    let meta: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.paths.meta).unwrap()).unwrap();
    assert_eq!(meta["tickers_requested"], 2);
    assert_eq!(meta["tickers_ok"], 1);
    assert_eq!(meta["failures"], 1);
    assert_eq!(meta["max_date"], "2024-01-03");
    assert_eq!(meta["lookback_years"], 4);
    assert_eq!(meta["generated_at"], "2024-01-04T12:00:00-05:00");
}

#[test]
fn no_failures_means_no_failure_log() {
    let mut server = mockito::Server::new();
    let _x = price_mock(&mut server, "x.us", 200, X_CSV, 1);

    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(&server, tmp.path());
    let session = HttpSession::new(&config).unwrap();

    let summary = run_with_session(&config, &session, &explicit(&["X"]), &now_ny).unwrap();

    assert!(summary.paths.failures.is_none());
    assert!(!config.failures_path().exists());
    assert!(config.prices_path().exists());
    assert!(config.meta_path().exists());
}

#[test]
fn all_no_data_is_fatal_and_writes_nothing() {
    let mut server = mockito::Server::new();
    let a = price_mock(&mut server, "a.us", 200, "No data", 1);
    let b = price_mock(&mut server, "b.us", 200, "No data", 1);

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let config = config_for(&server, &out);
    let session = HttpSession::new(&config).unwrap();

    let err = run_with_session(&config, &session, &explicit(&["A", "B"]), &now_ny).unwrap_err();

    a.assert();
    b.assert();
    assert!(matches!(
        err.downcast_ref::<DataError>(),
        Some(DataError::NoSymbolsSucceeded {
            requested: 2,
            failed: 2
        })
    ));
    assert!(!out.exists());
}

#[test]
fn unreachable_ticker_source_aborts_before_any_price_request() {
    let mut server = mockito::Server::new();
    let _constituents = server
        .mock("GET", "/constituents.csv")
        .with_status(503)
        .create();
    let prices = server
        .mock("GET", "/q/d/l/")
        .match_query(Matcher::Any)
        .expect(0)
        .create();

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let config = config_for(&server, &out);
    let session = HttpSession::new(&config).unwrap();

    let err = run_with_session(&config, &session, &TickerSource::Constituents, &now_ny).unwrap_err();

    prices.assert();
    assert!(matches!(
        err.downcast_ref::<DataError>(),
        Some(DataError::SourceUnavailable(_))
    ));
    assert!(!out.exists());
}

#[test]
fn constituents_and_extras_are_deduplicated() {
    let mut server = mockito::Server::new();
    let _constituents = server
        .mock("GET", "/constituents.csv")
        .with_status(200)
        .with_body("Symbol,Security\nX,Ex\nX,Ex again\nBRK.B,Berkshire\n")
        .create();
    let x = price_mock(&mut server, "x.us", 200, X_CSV, 1);
    let brk = price_mock(&mut server, "brk-b.us", 200, X_CSV, 1);
    let spy = price_mock(&mut server, "spy.us", 200, "No data", 1);

    let tmp = tempfile::tempdir().unwrap();
    let mut config = config_for(&server, tmp.path());
    config.extra_tickers = vec!["SPY".into(), "X".into()];
    let session = HttpSession::new(&config).unwrap();

    let summary =
        run_with_session(&config, &session, &TickerSource::Constituents, &now_ny).unwrap();

    x.assert();
    brk.assert();
    spy.assert();
    assert_eq!(summary.meta.tickers_requested, 3);
    assert_eq!(summary.batch.table.symbols(), &["X", "BRK-B"]);
    assert_eq!(summary.batch.failed_symbols(), vec!["SPY"]);
}
