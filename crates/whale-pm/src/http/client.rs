//! HTTP client for registry downloads.
//!
//! A thin wrapper around `reqwest::blocking` that:
//! - sends a custom User-Agent
//! - treats any non-2xx status as an error
//! - streams response bodies to disk with an optional progress callback
//!
//! There is no retry logic and, unless configured, no timeout: a failed
//! request ends that attempt and the caller decides what to do next.
//!
//! ```no_run
//! use whale_pm::http::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::with_config(
//!     HttpClientConfig::new().with_timeout(Duration::from_secs(60)),
//! )?;
//!
//! client.download(
//!     "https://www.nuget.org/api/v2/package/Newtonsoft.Json",
//!     "/tmp/Newtonsoft.Json.nupkg".as_ref(),
//!     Some(|downloaded, total| println!("{}/{} bytes", downloaded, total)),
//! )?;
//! # Ok(())
//! # }
//! ```

use reqwest::blocking::{Client, Response};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = concat!("whale-puup/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpError {
    /// Status code of a non-2xx response, if that is what failed
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        // reqwest's blocking client defaults to a 30s timeout; None disables it
        let client = Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent,
        })
    }

    /// Perform a GET request; non-2xx responses become `HttpError::HttpStatus`
    pub fn get(&self, url: &str) -> Result<Response, HttpError> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    /// Download file with progress callback, returning the number of bytes written
    pub fn download<F>(&self, url: &str, dest: &Path, progress: Option<F>) -> Result<u64, HttpError>
    where
        F: Fn(u64, u64),
    {
        let response = self.get(url)?;

        // Get total size from Content-Length header
        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = BufWriter::new(File::create(dest)?);
        let mut reader = ProgressReader {
            inner: response,
            downloaded: 0,
            total: total_size,
            callback: progress,
        };

        let written = io::copy(&mut reader, &mut file)?;
        file.flush()?;

        log::trace!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }

    /// Get the configured user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

struct ProgressReader<R, F> {
    inner: R,
    downloaded: u64,
    total: u64,
    callback: Option<F>,
}

impl<R: Read, F: Fn(u64, u64)> Read for ProgressReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.downloaded += n as u64;
        if let Some(ref callback) = self.callback {
            callback(self.downloaded, self.total);
        }
        Ok(n)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}
