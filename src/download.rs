//! Sequential downloader for numbered remote images.
//!
//! Image hosts often serve a book's illustrations as `…/185077.jpg`,
//! `…/185078.jpg`, … The downloader walks that sequence one request at a
//! time and saves hits as `1.jpg`, `2.jpg`, … regardless of gaps in the
//! remote numbering. A run of consecutive failures ends the walk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use url::Url;

use crate::error::{Error, Result};
use crate::images::media_type_for;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                      (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://www.wenku8.net/";

/// Tuning for a download run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Stop after this many failures in a row.
    pub max_failures: u32,
    /// Pause after each saved image.
    pub delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Bodies shorter than this count as failures.
    pub min_bytes: usize,
    pub user_agent: String,
    pub referer: Option<String>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            max_failures: 3,
            delay: Duration::from_millis(300),
            timeout: Duration::from_secs(10),
            min_bytes: 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: Some(DEFAULT_REFERER.to_string()),
        }
    }
}

/// A numbered remote image sequence: `{prefix}{n}.{extension}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSeries {
    pub prefix: String,
    pub start: u64,
    pub extension: String,
}

impl ImageSeries {
    pub fn new(prefix: impl Into<String>, start: u64, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            start,
            extension: extension.into(),
        }
    }

    /// Split the URL of the first image into prefix, number and extension.
    ///
    /// The number is the first digit run of the file stem. Unknown
    /// extensions fall back to `jpg`.
    ///
    /// ```
    /// use txtbook::download::ImageSeries;
    ///
    /// let series = ImageSeries::parse("https://pic.example.com/3/3453/150446/185077.JPG").unwrap();
    /// assert_eq!(series.prefix, "https://pic.example.com/3/3453/150446/");
    /// assert_eq!(series.start, 185077);
    /// assert_eq!(series.extension, "jpg");
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let mut url =
            Url::parse(input).map_err(|e| Error::invalid_url(input, e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_url(input, "only http and https are supported"));
        }
        url.set_query(None);
        url.set_fragment(None);

        let full = url.as_str();
        let Some(slash) = full.rfind('/') else {
            return Err(Error::invalid_url(input, "missing path"));
        };
        let (prefix, filename) = full.split_at(slash + 1);

        let Some((stem, extension)) = filename.rsplit_once('.') else {
            return Err(Error::invalid_url(input, "file name has no extension"));
        };

        let digits: String = stem
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect();
        let start = digits
            .parse::<u64>()
            .map_err(|_| Error::invalid_url(input, "no image number in file name"))?;

        let mut extension = extension.to_ascii_lowercase();
        if media_type_for(&extension).is_none() {
            tracing::warn!(%extension, "unsupported image extension, using jpg");
            extension = "jpg".to_string();
        }

        Ok(Self {
            prefix: prefix.to_string(),
            start,
            extension,
        })
    }

    /// URL of remote image `number`.
    pub fn url(&self, number: u64) -> String {
        format!("{}{}.{}", self.prefix, number, self.extension)
    }
}

/// Why a single request produced no image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Connection error or timeout.
    Transport(String),
    /// Any status other than 200.
    Status(u16),
    /// Body shorter than the configured minimum.
    TooSmall(usize),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "transport error: {reason}"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::TooSmall(len) => write!(f, "body too small ({len} bytes)"),
        }
    }
}

/// One blocking GET.
pub trait Fetch {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure>;
}

/// [`Fetch`] over a blocking reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(options: &DownloadOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&options.user_agent)
            .map_err(|e| Error::Download(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);
        if let Some(ref referer) = options.referer {
            let referer = HeaderValue::from_str(referer)
                .map_err(|e| Error::Download(format!("invalid referer: {e}")))?;
            headers.insert(REFERER, referer);
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Download(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| FetchFailure::Transport(e.to_string()))
    }
}

/// Outcome of a download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct DownloadReport {
    /// Images written, numbered `1..=saved`.
    pub saved: usize,
    /// Requests made, including failures.
    pub attempted: usize,
    /// First remote number that was not tried.
    pub next_number: u64,
}

/// Walks an [`ImageSeries`] and writes hits into a directory.
pub struct Downloader<F: Fetch> {
    fetcher: F,
    options: DownloadOptions,
}

impl Downloader<HttpFetcher> {
    /// Downloader backed by HTTP.
    pub fn http(options: DownloadOptions) -> Result<Self> {
        Ok(Self::new(HttpFetcher::new(&options)?, options))
    }
}

impl<F: Fetch> Downloader<F> {
    pub fn new(fetcher: F, options: DownloadOptions) -> Self {
        Self { fetcher, options }
    }

    /// Download until `max_failures` requests in a row fail.
    ///
    /// Failures are never retried; every attempt moves on to the next number.
    pub fn run(&self, series: &ImageSeries, out_dir: &Path) -> Result<DownloadReport> {
        std::fs::create_dir_all(out_dir).map_err(|e| {
            Error::Download(format!("cannot create {}: {e}", out_dir.display()))
        })?;

        let mut report = DownloadReport {
            next_number: series.start,
            ..Default::default()
        };
        let mut failures = 0u32;

        loop {
            let url = series.url(report.next_number);
            report.attempted += 1;
            report.next_number += 1;

            match self.fetch_checked(&url) {
                Ok(body) => {
                    let path = self.target_path(out_dir, series, report.saved + 1);
                    std::fs::write(&path, &body)?;
                    report.saved += 1;
                    failures = 0;
                    tracing::info!(%url, path = %path.display(), "saved image");
                    if !self.options.delay.is_zero() {
                        std::thread::sleep(self.options.delay);
                    }
                }
                Err(failure) => {
                    failures += 1;
                    tracing::warn!(%url, %failure, failures, "download failed");
                    if failures >= self.options.max_failures {
                        break;
                    }
                }
            }
        }

        tracing::info!(saved = report.saved, attempted = report.attempted, "download finished");
        Ok(report)
    }

    fn fetch_checked(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let body = self.fetcher.fetch(url)?;
        if body.len() < self.options.min_bytes {
            return Err(FetchFailure::TooSmall(body.len()));
        }
        Ok(body)
    }

    fn target_path(&self, out_dir: &Path, series: &ImageSeries, index: usize) -> PathBuf {
        out_dir.join(format!("{index}.{}", series.extension))
    }
}
