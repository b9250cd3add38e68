use crate::config::types::{Config, CrawlerConfig, DatabaseConfig, OutletEntry, UserAgentConfig};
use crate::url::normalize_url;
use crate::crawler::parse_selector;
use crate::ConfigError;

/// Maximum number of workers per round
const MAX_THREADS: usize = 64;

/// Deepest link level a crawl may follow
const MAX_DEPTH: u32 = 32;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_database_config(&config.database)?;
    validate_outlets(&config.outlets)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.threads < 1 || config.threads > MAX_THREADS {
        return Err(ConfigError::Validation(format!(
            "threads must be between 1 and {}, got {}",
            MAX_THREADS, config.threads
        )));
    }

    if config.max_depth > MAX_DEPTH {
        return Err(ConfigError::Validation(format!(
            "max-depth must be at most {}, got {}",
            MAX_DEPTH, config.max_depth
        )));
    }

    parse_selector(&config.link_selector)?;

    if config.request_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    validate_email(&config.from)?;

    Ok(())
}

/// Validates database configuration
fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed outlets
fn validate_outlets(outlets: &[OutletEntry]) -> Result<(), ConfigError> {
    for outlet in outlets {
        if outlet.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Outlet '{}' must have a name",
                outlet.url
            )));
        }

        if outlet.country.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Outlet '{}' must have a country",
                outlet.name
            )));
        }

        normalize_url(&outlet.url, None).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid outlet URL '{}': {}", outlet.url, e))
        })?;
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation("from cannot be empty".to_string()));
    }

    // Basic email format check: must contain @ and have text on both sides
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

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

/// Normalizes a country name for storage
///
/// The first letter is capitalized; countries outside the study region
/// (Denmark, Norway, Sweden) are prefixed with `Other: `.
pub fn sanitize_country(country: &str) -> String {
    let country = country.trim();
    let mut chars = country.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };

    match capitalized.as_str() {
        "Denmark" | "Norway" | "Sweden" => capitalized,
        _ => format!("Other: {}", capitalized),
    }
}
