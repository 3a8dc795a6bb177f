//! Combines individual check outcomes into a verdict.
//!
//! The table is fixed:
//! - `valid = is_verified && !disposable`
//! - confidence is `high` when verified, `medium` when only MX passed, `low` otherwise
//! - the message follows `valid`, then `disposable`, then "may not exist".
//!
//! New signals must extend this table rather than replace it.

use crate::core::models::Confidence;

pub(crate) const MSG_VALID: &str = "valid and deliverable";
pub(crate) const MSG_DISPOSABLE: &str = "disposable domain";
pub(crate) const MSG_UNVERIFIED: &str = "verification failed, may not exist";
pub(crate) const MSG_NO_MX: &str = "domain has no valid mail servers";
pub(crate) const MSG_MALFORMED: &str = "invalid email format";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub valid: bool,
    pub confidence: Confidence,
    pub message: &'static str,
}

pub(crate) fn is_valid(is_verified: bool, disposable: bool) -> bool {
    is_verified && !disposable
}

pub(crate) fn confidence_for(is_verified: bool, mx_records: bool) -> Confidence {
    if is_verified {
        Confidence::High
    } else if mx_records {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

pub(crate) fn aggregate(is_verified: bool, disposable: bool, mx_records: bool) -> Verdict {
    let valid = is_valid(is_verified, disposable);
    let message = if valid {
        MSG_VALID
    } else if disposable {
        MSG_DISPOSABLE
    } else {
        MSG_UNVERIFIED
    };
    Verdict {
        valid,
        confidence: confidence_for(is_verified, mx_records),
        message,
    }
}
