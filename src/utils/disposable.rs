//! Disposable-domain reputation check.

use crate::core::config::Config;

/// Case-insensitive exact match against the configured disposable domains.
/// Subdomains of a listed domain are not matched.
pub(crate) fn is_disposable_domain(config: &Config, domain: &str) -> bool {
    let normalized = domain.trim().to_lowercase();
    config.disposable_domains.contains(&normalized)
}
