//! HTTP session shared by every request in a run.
//!
//! `HttpTransport` is the seam between the fetch logic and the network: the
//! Stooq provider and the ticker source only see text responses, so tests
//! can script them without a server.

use super::provider::DataError;
use crate::config::FetchConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

/// Accept header sent with every request. Stooq serves CSV as text/plain.
const ACCEPT_CSV: &str = "text/csv,text/plain;q=0.9,*/*;q=0.1";

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Issues GET requests and returns the body as text.
///
/// A returned error means no response was read at all (connect failure,
/// timeout, broken body); non-2xx statuses come back as `Ok`.
pub trait HttpTransport {
    fn get_text(&self, url: &str) -> Result<HttpResponse, DataError>;
}

/// Blocking reqwest client configured with the run's timeout and a browser
/// User-Agent. Dropped at the end of the run, closing pooled connections.
pub struct HttpSession {
    client: reqwest::blocking::Client,
}

impl HttpSession {
    pub fn new(config: &FetchConfig) -> Result<Self, DataError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_CSV));

        let client = reqwest::blocking::Client::builder()
            .timeout(config.req_timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| DataError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl HttpTransport for HttpSession {
    fn get_text(&self, url: &str) -> Result<HttpResponse, DataError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::Transient(format!("request failed: {e}")))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp
            .text()
            .map_err(|e| DataError::Transient(format!("reading body failed: {e}")))?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

