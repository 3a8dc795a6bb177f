//! Address well-formedness check.

use crate::core::config::Config;

/// True when `address` has the shape `local@domain.tld`: exactly one `@`,
/// a dot in the domain, and no whitespace. No network access.
pub(crate) fn is_valid_syntax(config: &Config, address: &str) -> bool {
    config.email_regex.is_match(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_shapes() {
        let config = Config::default();
        for ok in [
            "jane@example.com",
            "jane.doe+tag@mail.example.co.uk",
            "J_D@Example.IO",
            "x@y.z",
        ] {
            assert!(is_valid_syntax(&config, ok), "{} should be valid", ok);
        }
    }

    #[test]
    fn rejects_malformed() {
        let config = Config::default();
        for bad in [
            "",
            "jane",
            "jane@",
            "@example.com",
            "jane@example",
            "jane doe@example.com",
            "jane@exa mple.com",
            "jane@@example.com",
            "jane@ex@ample.com",
            "jane@example.com\n",
        ] {
            assert!(!is_valid_syntax(&config, bad), "{:?} should be invalid", bad);
        }
    }
}
