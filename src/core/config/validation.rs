//! Contains validation logic for the final Config struct.

use super::{Config, Result};
use crate::core::error::AppError;
use url::Url;

fn check_service_url(label: &str, value: &Option<String>) -> Result<()> {
    if let Some(ref raw) = value {
        let url = Url::parse(raw)
            .map_err(|e| AppError::Config(format!("Invalid {} URL '{}': {}", label, raw, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AppError::Config(format!(
                "{} URL must use http or https: {}",
                label, raw
            )));
        }
    }
    Ok(())
}

/// Validates the configuration settings after loading and potential overrides.
/// Mutates the config to clamp values where applicable.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    let (min_sleep, max_sleep) = config.sleep_between_requests;
    if !min_sleep.is_finite() || !max_sleep.is_finite() {
        return Err(AppError::Config(format!(
            "Sleep durations must be finite numbers (got min={}, max={}).",
            min_sleep, max_sleep
        )));
    }
    if config.sleep_between_requests.0 < 0.0 || config.sleep_between_requests.1 < 0.0 {
        return Err(AppError::Config(
            "Sleep durations cannot be negative.".to_string(),
        ));
    }
    if config.sleep_between_requests.0 > config.sleep_between_requests.1 {
        tracing::warn!(target: "config",
            "Min sleep ({:.2}s) > Max sleep ({:.2}s). Setting max sleep = min sleep.",
            config.sleep_between_requests.0,
            config.sleep_between_requests.1
        );
        config.sleep_between_requests.1 = config.sleep_between_requests.0;
    }
    if config.dns_servers.is_empty() {
        tracing::warn!(target: "config", "DNS servers list is empty. Resolver will use system defaults.");
    }
    if config.dns_timeout.is_zero() {
        return Err(AppError::Config("DNS timeout must be positive.".to_string()));
    }
    if config.request_timeout.is_zero() {
        return Err(AppError::Config(
            "Request timeout must be positive.".to_string(),
        ));
    }
    if config.checkpoint_interval == 0 {
        tracing::warn!(target: "config", "Checkpoint interval was set to 0. Setting to 1.");
        config.checkpoint_interval = 1;
    }
    check_service_url("deliverability", &config.deliverability_url)?;
    check_service_url("discovery", &config.discovery_url)?;
    if config.deliverability_url.is_none() {
        tracing::warn!(target: "config",
            "No deliverability provider configured. Every address will be reported as unconfirmed."
        );
    }
    if config.deliverability_url.is_none() && config.deliverability_api_key.is_some() {
        tracing::warn!(target: "config", "A deliverability API key was provided without a URL. It will be ignored.");
    }
    for (wrong, right) in &config.domain_typos {
        if wrong == right {
            return Err(AppError::Config(format!(
                "Domain typo entry maps '{}' to itself.",
                wrong
            )));
        }
    }
    Ok(())
}
