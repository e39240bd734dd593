//! Data acquisition: HTTP session, Stooq provider, universe, merge, batch download.

pub mod align;
pub mod download;
pub mod http;
pub mod provider;
pub mod stooq;
pub mod universe;

pub use align::{merge_series, PriceTable};
pub use download::{download_closes, BatchResult, Pacing};
pub use http::{HttpResponse, HttpSession, HttpTransport};
pub use provider::{BatchProgress, DataError, DataProvider, LogProgress, PriceSeries};
pub use stooq::StooqProvider;
pub use universe::Universe;
