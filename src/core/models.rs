//! Data structures shared by the verification pipeline and the batch orchestrator.

use crate::core::config::Config;
use crate::utils::syntax::is_valid_syntax;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A syntactically valid address split into its parts.
///
/// The domain is lower-cased once here; every later check sees the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCandidate {
    address: String,
    local_part: String,
    domain: String,
}

impl EmailCandidate {
    /// Returns `None` when the input is not of the shape `local@domain.tld`.
    pub fn parse(config: &Config, raw: &str) -> Option<Self> {
        let address = raw.trim();
        if !is_valid_syntax(config, address) {
            return None;
        }
        let (local_part, domain) = address.split_once('@')?;
        Some(Self {
            address: address.to_string(),
            local_part: local_part.to_string(),
            domain: domain.to_lowercase(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Three-level summary of how strongly the pipeline believes an address is deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Mailbox category derived from the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailQuality {
    Personal,
    Business,
}

/// Individual check outcomes for one verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDetails {
    pub format: bool,
    /// True once the original domain passed the MX check.
    #[serde(rename = "domain")]
    pub domain_present: bool,
    pub disposable: bool,
    pub mx_records: bool,
    pub role_based: bool,
}

/// Outcome of verifying one address. A new value is produced for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub valid: bool,
    pub message: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_quality: Option<EmailQuality>,
    pub suggestion: Option<String>,
    pub details: VerificationDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

/// Whether a batch record's address has been checked, and with what outcome.
///
/// Serialized as the optional boolean `isVerified`: absent or `null` for
/// `Unchecked`, `true` for `Verified`, `false` for `Rejected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum VerificationState {
    #[default]
    Unchecked,
    Verified,
    Rejected,
}

impl VerificationState {
    pub fn is_unchecked(&self) -> bool {
        matches!(self, VerificationState::Unchecked)
    }
}

impl From<Option<bool>> for VerificationState {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => VerificationState::Unchecked,
            Some(true) => VerificationState::Verified,
            Some(false) => VerificationState::Rejected,
        }
    }
}

impl From<VerificationState> for Option<bool> {
    fn from(value: VerificationState) -> Self {
        match value {
            VerificationState::Unchecked => None,
            VerificationState::Verified => Some(true),
            VerificationState::Rejected => Some(false),
        }
    }
}

/// Identity fields handed to the discovery service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

impl Identity {
    pub fn label(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let company = self.company_name.as_deref().unwrap_or("N/A");
        if name.is_empty() {
            format!("N/A / {}", company)
        } else {
            format!("{} / {}", name, company)
        }
    }
}

/// One row of a batch job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(default)]
    pub found_email: Option<String>,
    #[serde(default)]
    pub personal_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "VerificationState::is_unchecked")]
    pub is_verified: VerificationState,
    #[serde(default)]
    pub email_quality: Option<EmailQuality>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retry: Option<DateTime<Utc>>,
}

impl BatchRecord {
    /// A record is picked up by `verify_all` only while it has an address and no verdict.
    pub fn needs_verification(&self) -> bool {
        self.found_email.is_some() && self.is_verified.is_unchecked()
    }
}

/// A named set of records, as uploaded and as persisted to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    #[serde(default)]
    pub search_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub record_count: usize,
    #[serde(default)]
    pub success_count: usize,
    #[serde(rename = "results", default)]
    pub records: Vec<BatchRecord>,
}

impl BatchJob {
    pub fn new(file_name: impl Into<String>, records: Vec<BatchRecord>) -> Self {
        let mut job = Self {
            search_id: Utc::now().timestamp_millis().to_string(),
            file_name: file_name.into(),
            record_count: 0,
            success_count: 0,
            records,
        };
        job.refresh_counts();
        job
    }

    /// Returns a copy of this job carrying `records`, with counts recomputed.
    pub fn with_records(&self, records: Vec<BatchRecord>) -> Self {
        let mut job = Self {
            search_id: self.search_id.clone(),
            file_name: self.file_name.clone(),
            record_count: 0,
            success_count: 0,
            records,
        };
        job.refresh_counts();
        job
    }

    pub(crate) fn refresh_counts(&mut self) {
        self.record_count = self.records.len();
        self.success_count = self
            .records
            .iter()
            .filter(|r| r.found_email.is_some())
            .count();
    }
}

/// Accepted shapes for a batch input file: a bare record array or a full job.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchInput {
    Records(Vec<BatchRecord>),
    Job(BatchJob),
}

impl BatchInput {
    pub fn into_job(self, file_name: &str) -> BatchJob {
        match self {
            BatchInput::Records(records) => BatchJob::new(file_name, records),
            BatchInput::Job(mut job) => {
                if job.search_id.is_empty() {
                    job.search_id = Utc::now().timestamp_millis().to_string();
                }
                if job.file_name.is_empty() {
                    job.file_name = file_name.to_string();
                }
                job.refresh_counts();
                job
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidate_lowercases_domain_only() {
        let config = Config::default();
        let candidate = EmailCandidate::parse(&config, "  Jane.Doe@Example.COM ").unwrap();
        assert_eq!(candidate.address(), "Jane.Doe@Example.COM");
        assert_eq!(candidate.local_part(), "Jane.Doe");
        assert_eq!(candidate.domain(), "example.com");

        assert!(EmailCandidate::parse(&config, "jane.doe").is_none());
        assert!(EmailCandidate::parse(&config, "jane@localhost").is_none());
    }

    #[test]
    fn verification_state_tri_state_serde() {
        let unchecked: BatchRecord =
            serde_json::from_value(json!({ "foundEmail": "a@b.co" })).unwrap();
        assert_eq!(unchecked.is_verified, VerificationState::Unchecked);

        let null: BatchRecord =
            serde_json::from_value(json!({ "foundEmail": "a@b.co", "isVerified": null })).unwrap();
        assert_eq!(null.is_verified, VerificationState::Unchecked);

        let rejected: BatchRecord =
            serde_json::from_value(json!({ "foundEmail": "a@b.co", "isVerified": false }))
                .unwrap();
        assert_eq!(rejected.is_verified, VerificationState::Rejected);
        assert!(!rejected.needs_verification());

        let value = serde_json::to_value(&unchecked).unwrap();
        assert!(value.get("isVerified").is_none());
        let value = serde_json::to_value(&rejected).unwrap();
        assert_eq!(value["isVerified"], json!(false));
    }

    #[test]
    fn record_wire_shape() {
        let record: BatchRecord = serde_json::from_value(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "companyName": "Analytical Engines",
            "foundEmail": "ada@engines.io",
            "personalEmails": ["ada@gmail.com"],
            "emailQuality": "business",
            "retryCount": 2
        }))
        .unwrap();
        assert_eq!(record.identity.first_name.as_deref(), Some("Ada"));
        assert_eq!(record.personal_emails, vec!["ada@gmail.com".to_string()]);
        assert_eq!(record.email_quality, Some(EmailQuality::Business));
        assert_eq!(record.retry_count, 2);
        assert_eq!(record.identity.label(), "Ada Lovelace / Analytical Engines");
    }

    #[test]
    fn batch_input_accepts_both_shapes() {
        let bare: BatchInput = serde_json::from_value(json!([
            { "firstName": "A", "foundEmail": "a@x.io" },
            { "firstName": "B" }
        ]))
        .unwrap();
        let job = bare.into_job("leads.json");
        assert_eq!(job.file_name, "leads.json");
        assert_eq!(job.record_count, 2);
        assert_eq!(job.success_count, 1);
        assert!(!job.search_id.is_empty());

        let full: BatchInput = serde_json::from_value(json!({
            "searchId": "42",
            "fileName": "q3.csv",
            "results": [{ "foundEmail": "a@x.io" }]
        }))
        .unwrap();
        let job = full.into_job("ignored.json");
        assert_eq!(job.search_id, "42");
        assert_eq!(job.file_name, "q3.csv");
        assert_eq!(job.success_count, 1);
    }
}
