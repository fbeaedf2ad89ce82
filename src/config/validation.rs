use super::{ClientConfig, ConfigError};

const VALID_LOG_LEVELS: &[&str] = &["DISABLED", "DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];
const VALID_PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Validate a client config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    validate_base_url(config)?;
    validate_timeouts(config)?;
    validate_proxy_url(config.proxy.as_deref())?;
    validate_log_level(&config.logging.log_level)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_base_url(config: &ClientConfig) -> Result<(), ConfigError> {
    let base_url = config.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(validation_err(
            "base_url must start with http:// or https://",
        ));
    }
    url::Url::parse(base_url)
        .map_err(|e| validation_err(format!("base_url is not a valid URL: {e}")))?;
    Ok(())
}

fn validate_timeouts(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.timeout == 0 {
        return Err(validation_err("timeout must be greater than 0"));
    }
    if config.connect_timeout == 0 {
        return Err(validation_err("connect_timeout must be greater than 0"));
    }
    if config.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_proxy_url(proxy: Option<&str>) -> Result<(), ConfigError> {
    let Some(proxy) = proxy else {
        return Ok(());
    };
    let parsed =
        url::Url::parse(proxy).map_err(|e| validation_err(format!("proxy is invalid: {e}")))?;
    if !VALID_PROXY_SCHEMES.contains(&parsed.scheme()) {
        return Err(validation_err(format!(
            "proxy scheme '{}' is not supported. Must be one of: {}",
            parsed.scheme(),
            VALID_PROXY_SCHEMES.join(", ")
        )));
    }
    Ok(())
}

fn validate_log_level(level: &str) -> Result<(), ConfigError> {
    let upper = level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&upper.as_str()) {
        return Err(validation_err(format!(
            "log_level '{level}' is not valid. Must be one of: {}",
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}
