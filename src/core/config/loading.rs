//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loads configuration settings from a TOML file.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!(target: "config", "Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config_file_content: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!(target: "config", "Successfully parsed configuration file: {}", file_path);
    Ok(config_file_content)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Applies settings from a parsed `ConfigFile` onto a mutable `Config` instance.
/// Used for both file contents and builder overrides.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // Network
    if let Some(timeout) = file_config.network.request_timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }
    if let Some(min_sleep) = file_config.network.min_sleep {
        config.sleep_between_requests.0 = min_sleep;
    }
    if let Some(max_sleep) = file_config.network.max_sleep {
        config.sleep_between_requests.1 = max_sleep;
    }
    if let Some(ref user_agent) = file_config.network.user_agent {
        config.user_agent = user_agent.clone();
    }

    // DNS
    if let Some(timeout) = file_config.dns.dns_timeout {
        config.dns_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref servers) = file_config.dns.dns_servers {
        if !servers.is_empty() {
            config.dns_servers = servers.clone();
        }
    }

    // Tables
    let tables = &file_config.tables;
    if let Some(ref domains) = tables.disposable_domains {
        config
            .disposable_domains
            .extend(domains.iter().map(|d| d.trim().to_lowercase()));
    }
    if let Some(ref prefixes) = tables.role_prefixes {
        for prefix in prefixes.iter().map(|p| p.trim().to_lowercase()) {
            if !prefix.is_empty() && !config.role_prefixes.contains(&prefix) {
                config.role_prefixes.push(prefix);
            }
        }
    }
    if let Some(ref domains) = tables.personal_domains {
        config
            .personal_domains
            .extend(domains.iter().map(|d| d.trim().to_lowercase()));
    }
    if let Some(ref typos) = tables.domain_typos {
        for (wrong, right) in typos {
            config
                .domain_typos
                .insert(wrong.trim().to_lowercase(), right.trim().to_lowercase());
        }
    }
    if let Some(ref typos) = tables.tld_typos {
        for (wrong, right) in typos {
            config
                .tld_typos
                .insert(wrong.trim().to_lowercase(), right.trim().to_lowercase());
        }
    }

    // Remote services
    if let Some(ref url) = file_config.deliverability.url {
        config.deliverability_url = non_blank(url);
    }
    if let Some(ref key) = file_config.deliverability.api_key {
        config.deliverability_api_key = non_blank(key);
    }
    if let Some(ref url) = file_config.discovery.url {
        config.discovery_url = non_blank(url);
    }
    if let Some(ref key) = file_config.discovery.api_key {
        config.discovery_api_key = non_blank(key);
    }

    // Batch
    if let Some(interval) = file_config.batch.checkpoint_interval {
        config.checkpoint_interval = interval;
    }

    // History
    if let Some(ref dir) = file_config.history.root_dir {
        if let Some(dir) = non_blank(dir) {
            config.history_dir = dir;
        }
    }
}
