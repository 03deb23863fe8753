use crate::config::types::{
    Config, CrawlConfig, DatabaseConfig, HttpConfig, UserAgentConfig, WorkersConfig,
};
use crate::state::MAX_CRAWL_DELAY;
use crate::storage::MAX_URL_LEN;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_database_config(&config.database)?;
    validate_http_config(&config.http)?;
    validate_crawl_config(&config.crawl)?;
    validate_workers_config(&config.workers)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // The name doubles as the robots.txt product token: alphanumeric + hyphens only
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

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }
    if config.retries > 10 {
        return Err(ConfigError::Validation(format!(
            "retries must be <= 10, got {}",
            config.retries
        )));
    }
    Ok(())
}

/// Validates crawl limits
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_crawl_delay > MAX_CRAWL_DELAY {
        return Err(ConfigError::Validation(format!(
            "max_crawl_delay must be <= {}, got {}",
            MAX_CRAWL_DELAY, config.max_crawl_delay
        )));
    }

    if config.default_crawl_delay > config.max_crawl_delay {
        return Err(ConfigError::Validation(format!(
            "default_crawl_delay ({}) cannot exceed max_crawl_delay ({})",
            config.default_crawl_delay, config.max_crawl_delay
        )));
    }

    if config.max_content_chars < 1 {
        return Err(ConfigError::Validation(
            "max_content_chars must be >= 1".to_string(),
        ));
    }

    if !(16..=MAX_URL_LEN).contains(&config.max_url_length) {
        return Err(ConfigError::Validation(format!(
            "max_url_length must be between 16 and {}, got {}",
            MAX_URL_LEN, config.max_url_length
        )));
    }

    if config.robots_cache_capacity < 1 {
        return Err(ConfigError::Validation(
            "robots_cache_capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates pool sizes; every stage needs at least one consumer
fn validate_workers_config(config: &WorkersConfig) -> Result<(), ConfigError> {
    let pools = [
        ("domains", config.domains),
        ("sitemaps", config.sitemaps),
        ("links", config.links),
        ("prioritizers", config.prioritizers),
        ("routers", config.routers),
        ("selector_pools", config.selector_pools),
        ("selectors_per_pool", config.selectors_per_pool),
    ];

    for (name, size) in pools {
        if !(1..=100).contains(&size) {
            return Err(ConfigError::Validation(format!(
                "workers.{} must be between 1 and 100, got {}",
                name, size
            )));
        }
    }

    Ok(())
}

/// Validates seed domain URLs
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use the http or https scheme",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
