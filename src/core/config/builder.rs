//! Provides the `ConfigBuilder` for fluent configuration construction.

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, Result};
use crate::AppError;
use std::path::Path;
use std::time::Duration;

/// Builder pattern for creating `Config` instances fluently.
///
/// Handles loading from files, applying overrides, and validation.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    skip_default_files: bool,
    overrides: ConfigFile,
    request_timeout: Option<Duration>,
    dns_timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    /// Do not probe the default config locations when no file was given.
    pub fn without_default_files(mut self) -> Self {
        self.skip_default_files = true;
        self
    }

    pub fn sleep_between_requests(mut self, min: f32, max: f32) -> Self {
        self.overrides.network.min_sleep = Some(min);
        self.overrides.network.max_sleep = Some(max);
        self
    }
    /// Overrides the provider/discovery deadline. Unlike the file setting,
    /// sub-second values are kept.
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.overrides.network.user_agent = Some(value.into());
        self
    }
    pub fn dns_timeout(mut self, duration: Duration) -> Self {
        self.dns_timeout = Some(duration);
        self
    }
    pub fn dns_servers(mut self, servers: Vec<String>) -> Self {
        self.overrides.dns.dns_servers = Some(servers);
        self
    }
    pub fn disposable_domains(mut self, domains: Vec<String>) -> Self {
        self.overrides.tables.disposable_domains = Some(domains);
        self
    }
    pub fn role_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.overrides.tables.role_prefixes = Some(prefixes);
        self
    }
    pub fn deliverability_url(mut self, url: Option<impl Into<String>>) -> Self {
        self.overrides.deliverability.url = url.map(|s| s.into());
        self
    }
    pub fn deliverability_api_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.overrides.deliverability.api_key = key.map(|s| s.into());
        self
    }
    pub fn discovery_url(mut self, url: Option<impl Into<String>>) -> Self {
        self.overrides.discovery.url = url.map(|s| s.into());
        self
    }
    pub fn discovery_api_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.overrides.discovery.api_key = key.map(|s| s.into());
        self
    }
    pub fn checkpoint_interval(mut self, value: usize) -> Self {
        self.overrides.batch.checkpoint_interval = Some(value);
        self
    }
    pub fn history_dir(mut self, dir: impl Into<String>) -> Self {
        self.overrides.history.root_dir = Some(dir.into());
        self
    }

    /// Builds the final `Config` object, applying defaults, file settings, overrides, and validation.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!(target: "config", "Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!(target: "config", "Failed to load specified config file '{}': {}", path, e);
                    return Err(AppError::Config(format!(
                        "Failed to load specified configuration file '{}': {}",
                        path, e
                    )));
                }
            }
        } else if !self.skip_default_files {
            for path_str in ["./email-verifier.toml", "./config.toml"] {
                if Path::new(path_str).exists() {
                    match load_config_file(path_str) {
                        Ok(file_config) => {
                            apply_file_config(&mut self.config, &file_config);
                            loaded_path = Some(path_str.to_string());
                            tracing::info!(target: "config",
                                "Loaded base configuration from default location: {}",
                                path_str
                            );
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(target: "config",
                                "Failed to load or parse default config '{}': {}",
                                path_str,
                                e
                            );
                        }
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::debug!(target: "config", "No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        if let Some(timeout) = self.request_timeout {
            self.config.request_timeout = timeout;
        }
        if let Some(timeout) = self.dns_timeout {
            self.config.dns_timeout = timeout;
        }
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!(target: "config", "Final configuration built successfully.");
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn overrides_win_over_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[batch]\ncheckpoint_interval = 7\n[network]\nrequest_timeout = 30").unwrap();

        let config = ConfigBuilder::new()
            .config_file(tmp.path().to_str().unwrap())
            .checkpoint_interval(3)
            .build()
            .unwrap();

        assert_eq!(config.checkpoint_interval, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.loaded_config_path.is_some());
    }

    #[test]
    fn sub_second_timeouts_survive() {
        let config = ConfigBuilder::new()
            .without_default_files()
            .request_timeout(Duration::from_millis(750))
            .dns_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        assert_eq!(config.request_timeout, Duration::from_millis(750));
        assert_eq!(config.dns_timeout, Duration::from_millis(200));
    }

    #[test]
    fn table_overrides_extend_defaults() {
        let config = ConfigBuilder::new()
            .without_default_files()
            .user_agent("verifier-test/1.0")
            .disposable_domains(vec![" Throwaway.IO ".to_string()])
            .role_prefixes(vec!["Recruiting".to_string()])
            .build()
            .unwrap();
        assert_eq!(config.user_agent, "verifier-test/1.0");
        assert!(config.disposable_domains.contains("throwaway.io"));
        assert!(config.disposable_domains.contains("mailinator.com"));
        assert!(config.role_prefixes.iter().any(|p| p == "recruiting"));
        assert!(config.role_prefixes.iter().any(|p| p == "admin"));
    }

    #[test]
    fn missing_explicit_file_is_config_error() {
        let err = ConfigBuilder::new()
            .config_file("/no/such/email-verifier.toml")
            .build()
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn service_overrides_apply() {
        let config = ConfigBuilder::new()
            .without_default_files()
            .deliverability_url(Some("https://verify.example.net/check"))
            .discovery_url(None::<String>)
            .build()
            .unwrap();
        assert_eq!(
            config.deliverability_url.as_deref(),
            Some("https://verify.example.net/check")
        );
        assert!(config.discovery_url.is_none());
    }
}
