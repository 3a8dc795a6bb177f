//! Table-driven correction of common domain and TLD misspellings.

use crate::core::config::Config;

/// Suggests a corrected address, or `None` when no table entry applies.
///
/// A whole-domain correction wins over a TLD correction, and at most one
/// correction is applied. Works on any string containing `@`, so malformed
/// input still gets a suggestion.
pub(crate) fn suggest_correction(config: &Config, address: &str) -> Option<String> {
    let (local_part, domain) = address.trim().rsplit_once('@')?;
    let domain = domain.to_lowercase();
    if local_part.is_empty() || domain.is_empty() {
        return None;
    }

    if let Some(corrected) = config.domain_typos.get(&domain) {
        tracing::debug!(target: "verify_task", "Domain typo '{}' -> '{}'", domain, corrected);
        return Some(format!("{}@{}", local_part, corrected));
    }

    let (registrable, tld) = domain.rsplit_once('.')?;
    if registrable.is_empty() {
        return None;
    }
    config.tld_typos.get(tld).map(|corrected_tld| {
        tracing::debug!(target: "verify_task", "TLD typo '.{}' -> '.{}' for {}", tld, corrected_tld, domain);
        format!("{}@{}.{}", local_part, registrable, corrected_tld)
    })
}
