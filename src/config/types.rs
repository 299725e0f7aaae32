use serde::Deserialize;

/// Main configuration structure for PageScope
///
/// Every section falls back to its defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub prober: ProberConfig,
    pub scheduler: SchedulerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Page fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Overall request timeout in seconds (also used for probes)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Redirect hops to follow before accepting the last redirect response
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_redirects: 10,
        }
    }
}

/// Reachability probing behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProberConfig {
    /// Number of links, in document order, that get probed per attempt
    #[serde(rename = "sample-cap")]
    pub sample_cap: usize,

    /// Maximum number of probes in flight at once
    pub concurrency: usize,

    /// Wall-clock budget for the whole probing phase, in seconds
    #[serde(rename = "budget-secs")]
    pub budget_secs: u64,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            sample_cap: 50,
            concurrency: 10,
            budget_secs: 300,
        }
    }
}

/// Background job scheduling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between polls for queued jobs
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Maximum number of queued jobs picked up per poll
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Maximum number of attempts running at once across all polls
    #[serde(rename = "max-in-flight")]
    pub max_in_flight: usize,

    /// Seconds after its claim at which a `running` job counts as abandoned
    ///
    /// Must outlast a full attempt (fetch timeout plus probe budget).
    #[serde(rename = "stale-after-secs")]
    pub stale_after_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            batch_size: 10,
            max_in_flight: 20,
            stale_after_secs: 900,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "PageScope".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/pagescope".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "pagescope.db".to_string(),
        }
    }
}
