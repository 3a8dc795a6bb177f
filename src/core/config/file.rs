//! Defines the structure mirroring the TOML configuration file format.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub(crate) network: NetworkConfig,
    #[serde(default)]
    pub(crate) dns: DnsConfig,
    #[serde(default)]
    pub(crate) tables: TablesConfig,
    #[serde(default)]
    pub(crate) deliverability: ServiceConfig,
    #[serde(default)]
    pub(crate) discovery: ServiceConfig,
    #[serde(default)]
    pub(crate) batch: BatchConfig,
    #[serde(default)]
    pub(crate) history: HistoryConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct NetworkConfig {
    /// Whole seconds.
    pub(crate) request_timeout: Option<u64>,
    pub(crate) min_sleep: Option<f32>,
    pub(crate) max_sleep: Option<f32>,
    pub(crate) user_agent: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct DnsConfig {
    /// Whole seconds.
    pub(crate) dns_timeout: Option<u64>,
    pub(crate) dns_servers: Option<Vec<String>>,
}

/// Lookup tables. Lists extend the built-in defaults; typo maps override per key.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct TablesConfig {
    pub(crate) disposable_domains: Option<Vec<String>>,
    pub(crate) role_prefixes: Option<Vec<String>>,
    pub(crate) personal_domains: Option<Vec<String>>,
    pub(crate) domain_typos: Option<HashMap<String, String>>,
    pub(crate) tld_typos: Option<HashMap<String, String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServiceConfig {
    pub(crate) url: Option<String>,
    pub(crate) api_key: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct BatchConfig {
    pub(crate) checkpoint_interval: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct HistoryConfig {
    pub(crate) root_dir: Option<String>,
}
