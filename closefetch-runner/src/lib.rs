//! closefetch runner: end-to-end runs, run metadata and artifact export.
//!
//! This crate builds on `closefetch-core` to provide:
//! - The full fetch pipeline with a scoped HTTP session
//! - Run window and run metadata
//! - Atomic Parquet / CSV / JSON artifact writing

pub mod export;
pub mod meta;
pub mod run;

pub use export::{save_artifacts, ArtifactPaths};
pub use meta::{RunMeta, RunWindow};
pub use run::{fetch_and_save, run_with_session, RunSummary, TickerSource};
