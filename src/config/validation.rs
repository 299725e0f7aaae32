use crate::config::types::{
    Config, FetcherConfig, ProberConfig, SchedulerConfig, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_prober_config(&config.prober)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;

    let attempt_secs = config.fetcher.timeout_secs + config.prober.budget_secs;
    if config.scheduler.stale_after_secs <= attempt_secs {
        return Err(ConfigError::Validation(format!(
            "stale_after_secs must exceed timeout_secs + budget_secs ({}), got {}",
            attempt_secs, config.scheduler.stale_after_secs
        )));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_redirects < 1 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be >= 1, got {}",
            config.max_redirects
        )));
    }

    Ok(())
}

fn validate_prober_config(config: &ProberConfig) -> Result<(), ConfigError> {
    if config.sample_cap < 1 || config.sample_cap > 10_000 {
        return Err(ConfigError::Validation(format!(
            "sample_cap must be between 1 and 10000, got {}",
            config.sample_cap
        )));
    }

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.budget_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "budget_secs must be >= 1, got {}",
            config.budget_secs
        )));
    }

    Ok(())
}

fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.poll_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_secs must be >= 1, got {}",
            config.poll_interval_secs
        )));
    }

    if config.max_in_flight < 1 {
        return Err(ConfigError::Validation(format!(
            "max_in_flight must be >= 1, got {}",
            config.max_in_flight
        )));
    }

    if config.batch_size < 1 || config.batch_size > config.max_in_flight {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and max_in_flight ({}), got {}",
            config.max_in_flight, config.batch_size
        )));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
