//! closefetch core: symbols, configuration and the data layer.
//!
//! This crate contains everything that talks to the price source:
//! - Ticker normalization (canonical and Stooq-encoded forms)
//! - Run configuration loaded from TOML
//! - Shared blocking HTTP session behind a transport trait
//! - Stooq provider with response classification and retry/backoff
//! - Universe construction from the constituents list plus extra ETFs
//! - Outer-join merge of close series into one table
//! - Sequential, paced batch download

pub mod config;
pub mod data;
pub mod symbol;

pub use config::{FetchConfig, OutputConfig};
pub use data::DataError;
