//! PageScope: a background single-page crawl engine
//!
//! This crate fetches queued target URLs, summarizes their structure (title,
//! heading counts, declared HTML version, login-form presence), classifies their
//! outbound links and probes a bounded sample of them for reachability, while a
//! scheduler keeps promoting queued jobs to running ones under concurrency limits.

pub mod config;
pub mod crawler;
pub mod output;
pub mod service;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for PageScope operations
#[derive(Debug, Error)]
pub enum PageScopeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl job not found: {0}")]
    JobNotFound(i64),

    #[error("Crawl job {0} already has an attempt in progress")]
    AlreadyRunning(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Submission errors, raised before any job is created
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("URL must use http or https scheme, got '{0}'")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL is empty")]
    Empty,
}

/// Result type alias for PageScope operations
pub type Result<T> = std::result::Result<T, PageScopeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use service::CrawlService;
pub use state::JobStatus;
pub use self::url::{classify_link, validate_target_url, LinkClass};
