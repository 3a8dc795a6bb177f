//! Personal vs business classification of a mail domain.

use crate::core::config::Config;
use crate::core::models::EmailQuality;

pub(crate) fn classify_domain(config: &Config, domain: &str) -> EmailQuality {
    if config.personal_domains.contains(&domain.trim().to_lowercase()) {
        EmailQuality::Personal
    } else {
        EmailQuality::Business
    }
}
