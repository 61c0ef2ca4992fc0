//! Blocking HTTP client used by the registry fetcher.

mod client;

pub use client::{HttpClient, HttpClientConfig, HttpError};
