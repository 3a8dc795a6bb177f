//! Defines the core runtime `Config` struct, its defaults, and related utilities.
//! Submodules handle loading, building, and validation.

pub(crate) mod builder;
pub(crate) mod file;
pub(crate) mod loading;
pub(crate) mod validation;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::core::error::Result;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Runtime configuration settings used by the email-verifier core logic.
#[derive(Clone)]
pub struct Config {
    pub request_timeout: Duration,
    pub sleep_between_requests: (f32, f32),
    pub user_agent: String,

    pub dns_timeout: Duration,
    pub dns_servers: Vec<String>,

    pub email_regex: Regex,
    pub disposable_domains: HashSet<String>,
    pub role_prefixes: Vec<String>,
    pub personal_domains: HashSet<String>,
    pub domain_typos: HashMap<String, String>,
    pub tld_typos: HashMap<String, String>,

    pub deliverability_url: Option<String>,
    pub deliverability_api_key: Option<String>,
    pub discovery_url: Option<String>,
    pub discovery_api_key: Option<String>,

    pub checkpoint_interval: usize,
    pub history_dir: String,

    pub loaded_config_path: Option<String>,
}

const DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "10minutemail.net",
    "20minutemail.com",
    "tempmail.org",
    "temp-mail.org",
    "tempmail.com",
    "tempail.com",
    "tempr.email",
    "guerrillamail.com",
    "guerrillamail.net",
    "guerrillamail.org",
    "sharklasers.com",
    "mailinator.com",
    "mailinator.net",
    "throwaway.email",
    "yopmail.com",
    "yopmail.net",
    "trashmail.com",
    "getnada.com",
    "maildrop.cc",
    "dispostable.com",
    "fakeinbox.com",
    "mintemail.com",
    "mailnesia.com",
    "emailondeck.com",
    "mohmal.com",
    "discard.email",
    "spamgourmet.com",
    "mytemp.email",
    "burnermail.io",
];

const ROLE_PREFIXES: &[&str] = &[
    "admin",
    "administrator",
    "webmaster",
    "postmaster",
    "hostmaster",
    "support",
    "help",
    "contact",
    "info",
    "sales",
    "marketing",
    "abuse",
    "security",
    "privacy",
    "legal",
    "billing",
    "hr",
    "jobs",
    "careers",
    "feedback",
    "media",
    "press",
    "noreply",
    "no-reply",
    "dev",
    "test",
    "demo",
    "office",
    "team",
    "hello",
    "mail",
];

const PERSONAL_DOMAINS: &[&str] = &["gmail.com", "outlook.com", "hotmail.com", "yahoo.com"];

const DOMAIN_TYPOS: &[(&str, &str)] = &[
    ("gamil.com", "gmail.com"),
    ("gmial.com", "gmail.com"),
    ("gmai.com", "gmail.com"),
    ("gmal.com", "gmail.com"),
    ("gmil.com", "gmail.com"),
    ("gnail.com", "gmail.com"),
    ("gmaill.com", "gmail.com"),
    ("gmail.co", "gmail.com"),
    ("yahooo.com", "yahoo.com"),
    ("yaho.com", "yahoo.com"),
    ("yhoo.com", "yahoo.com"),
    ("yahho.com", "yahoo.com"),
    ("hotmial.com", "hotmail.com"),
    ("hotmal.com", "hotmail.com"),
    ("hotmai.com", "hotmail.com"),
    ("hotnail.com", "hotmail.com"),
    ("homail.com", "hotmail.com"),
    ("outlok.com", "outlook.com"),
    ("outloo.com", "outlook.com"),
    ("outlookk.com", "outlook.com"),
    ("oulook.com", "outlook.com"),
    ("iclod.com", "icloud.com"),
    ("icoud.com", "icloud.com"),
];

const TLD_TYPOS: &[(&str, &str)] = &[
    ("con", "com"),
    ("cmo", "com"),
    ("ocm", "com"),
    ("comm", "com"),
    ("om", "com"),
    ("cm", "com"),
    ("vom", "com"),
    ("xom", "com"),
    ("nte", "net"),
    ("ent", "net"),
    ("nett", "net"),
    ("ogr", "org"),
    ("rog", "org"),
    ("orgg", "org"),
    ("edi", "edu"),
];

impl Config {
    fn build_default() -> Self {
        let email_regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .expect("Default email regex pattern failed to compile. This is a bug.");
        let dns_servers = vec![
            "8.8.8.8".to_string(),
            "8.8.4.4".to_string(),
            "1.1.1.1".to_string(),
            "1.0.0.1".to_string(),
        ];
        let to_map = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        Config {
            request_timeout: Duration::from_secs(10),
            sleep_between_requests: (0.1, 0.5),
            user_agent: format!("email-verifier-core/{}", env!("CARGO_PKG_VERSION")),
            dns_timeout: Duration::from_secs(5),
            dns_servers,
            email_regex,
            disposable_domains: DISPOSABLE_DOMAINS.iter().map(|s| s.to_string()).collect(),
            role_prefixes: ROLE_PREFIXES.iter().map(|s| s.to_string()).collect(),
            personal_domains: PERSONAL_DOMAINS.iter().map(|s| s.to_string()).collect(),
            domain_typos: to_map(DOMAIN_TYPOS),
            tld_typos: to_map(TLD_TYPOS),
            deliverability_url: None,
            deliverability_api_key: None,
            discovery_url: None,
            discovery_api_key: None,
            checkpoint_interval: 5,
            history_dir: "./history".to_string(),
            loaded_config_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::build_default()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("request_timeout", &self.request_timeout)
            .field("sleep_between_requests", &self.sleep_between_requests)
            .field("user_agent", &self.user_agent)
            .field("dns_timeout", &self.dns_timeout)
            .field("dns_servers_count", &self.dns_servers.len())
            .field("email_regex", &self.email_regex.as_str())
            .field("disposable_domains_count", &self.disposable_domains.len())
            .field("role_prefixes_count", &self.role_prefixes.len())
            .field("personal_domains", &self.personal_domains)
            .field("domain_typos_count", &self.domain_typos.len())
            .field("tld_typos_count", &self.tld_typos.len())
            .field("deliverability_url", &self.deliverability_url)
            .field(
                "deliverability_api_key",
                &self.deliverability_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("discovery_url", &self.discovery_url)
            .field(
                "discovery_api_key",
                &self.discovery_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("checkpoint_interval", &self.checkpoint_interval)
            .field("history_dir", &self.history_dir)
            .field("loaded_config_path", &self.loaded_config_path)
            .finish()
    }
}

/// Utility function to get a random sleep duration based on [`Config`].
///
/// Uses the `sleep_between_requests` setting from the provided configuration.
pub fn get_random_sleep_duration(config: &Config) -> Duration {
    use rand::Rng;
    let (min, max) = config.sleep_between_requests;
    if !min.is_finite() || !max.is_finite() {
        return Duration::ZERO;
    }
    if min >= max {
        return Duration::from_secs_f32(min.max(0.0));
    }
    let duration_secs = rand::thread_rng().gen_range(min..max);
    Duration::from_secs_f32(duration_secs)
}
