//! Role-account heuristic for the local part.

use crate::core::config::Config;

/// True when the lower-cased local part starts with any configured role prefix.
/// This is a prefix match, so `infodesk` and `admin2` count as role accounts.
pub(crate) fn is_role_account(config: &Config, local_part: &str) -> bool {
    let local = local_part.to_lowercase();
    config
        .role_prefixes
        .iter()
        .any(|prefix| local.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_role_prefixes() {
        let config = Config::default();
        for local in ["admin", "Support", "info", "no-reply", "noreply", "HR", "salesteam"] {
            assert!(is_role_account(&config, local), "{} should be a role", local);
        }
    }

    #[test]
    fn prefix_not_token_match() {
        let config = Config::default();
        // "hr" is a prefix of "hrishikesh"; the heuristic accepts the false positive.
        assert!(is_role_account(&config, "hrishikesh"));
        assert!(!is_role_account(&config, "jane.doe"));
        assert!(!is_role_account(&config, "the.admin"));
    }
}
