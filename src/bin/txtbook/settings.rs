//! Layered settings: `txtbook.toml`, `--config-file`, `TXTBOOK__*`, then flags.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use txtbook::download::{DEFAULT_REFERER, DEFAULT_USER_AGENT, DownloadOptions};
use txtbook::pipeline::{DEFAULT_AUTHOR, DEFAULT_IMAGES_DIR, DEFAULT_LANGUAGE};

use crate::args::Cli;

const LOCAL_CONFIG_BASENAME: &str = "txtbook";
const ENV_PREFIX: &str = "TXTBOOK";
const DEFAULT_MAX_FAILURES: u32 = 3;
const DEFAULT_DELAY_MS: u64 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MIN_BYTES: usize = 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub book: BookSettings,
    pub images_dir: PathBuf,
    pub download: DownloadOptions,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct BookSettings {
    pub language: String,
    pub author: String,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &Cli) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(cli);
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    book: RawBookSettings,
    images: RawImageSettings,
    download: RawDownloadSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBookSettings {
    language: Option<String>,
    author: Option<String>,
    identifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawImageSettings {
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDownloadSettings {
    max_failures: Option<u32>,
    delay_ms: Option<u64>,
    timeout_secs: Option<u64>,
    min_bytes: Option<usize>,
    user_agent: Option<String>,
    referer: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if cli.log_json {
            self.logging.json = Some(true);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            book,
            images,
            download,
            logging,
        } = raw;

        Ok(Self {
            book: build_book_settings(book),
            images_dir: images
                .dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGES_DIR)),
            download: build_download_options(download)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_book_settings(book: RawBookSettings) -> BookSettings {
    BookSettings {
        language: book
            .language
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        author: book.author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        identifier: book.identifier.filter(|s| !s.trim().is_empty()),
    }
}

fn build_download_options(download: RawDownloadSettings) -> Result<DownloadOptions, LoadError> {
    let max_failures = download.max_failures.unwrap_or(DEFAULT_MAX_FAILURES);
    if max_failures == 0 {
        return Err(LoadError::invalid(
            "download.max_failures",
            "must be greater than zero",
        ));
    }

    let timeout_secs = download.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "download.timeout_secs",
            "must be greater than zero",
        ));
    }

    // An empty referer disables the header.
    let referer = match download.referer {
        Some(referer) if referer.trim().is_empty() => None,
        Some(referer) => Some(referer),
        None => Some(DEFAULT_REFERER.to_string()),
    };

    Ok(DownloadOptions {
        max_failures,
        delay: Duration::from_millis(download.delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
        timeout: Duration::from_secs(timeout_secs),
        min_bytes: download.min_bytes.unwrap_or(DEFAULT_MIN_BYTES),
        user_agent: download
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        referer,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}
