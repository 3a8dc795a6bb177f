use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{EmailCandidate, VerificationDetails, VerificationResult};
use crate::utils::disposable::is_disposable_domain;
use crate::utils::dns::{DnsMxResolver, MxResolver};
use crate::utils::quality::classify_domain;
use crate::utils::role::is_role_account;
use crate::utils::typo::suggest_correction;
use crate::verification::api::{
    build_http_client, DeliverabilityProvider, HttpDeliverabilityProvider,
};
use crate::verification::confidence::{self, MSG_MALFORMED, MSG_NO_MX};
use crate::verification::deliverability::DeliverabilityVerifier;

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Runs the single-address verification pipeline.
///
/// Syntax is checked first and short-circuits without network calls. The pure
/// checks (disposable, role, typo, quality) follow, then the MX lookup, then
/// the deliverability provider when MX passed and the domain is not disposable.
#[derive(Clone)]
pub struct EmailVerifier {
    config: Arc<Config>,
    mx_resolver: Arc<dyn MxResolver>,
    deliverability: DeliverabilityVerifier,
}

impl EmailVerifier {
    /// Creates a verifier backed by DNS and the configured HTTP provider.
    pub(crate) async fn new(config: &Config) -> Result<Self> {
        tracing::debug!(target: "verify_task", "Initializing EmailVerifier components...");
        let http_client = build_http_client(config)?;
        let provider = HttpDeliverabilityProvider::new(config, http_client)?;
        tracing::debug!(target: "verify_task", "Deliverability provider initialized.");
        let mx_resolver = DnsMxResolver::new(config)?;
        tracing::debug!(target: "verify_task", "DNS resolver initialized.");

        tracing::info!(target: "verify_task", "EmailVerifier initialized successfully.");
        Ok(Self::with_components(
            Arc::new(config.clone()),
            Arc::new(mx_resolver),
            Arc::new(provider),
        ))
    }

    /// Assembles a verifier from explicit components.
    pub fn with_components(
        config: Arc<Config>,
        mx_resolver: Arc<dyn MxResolver>,
        provider: Arc<dyn DeliverabilityProvider>,
    ) -> Self {
        let deliverability = DeliverabilityVerifier::new(provider, config.request_timeout);
        Self {
            config,
            mx_resolver,
            deliverability,
        }
    }

    /// Verifies one address. Fails only on empty input; every network problem
    /// is folded into the returned result.
    pub async fn verify(&self, email: &str) -> Result<VerificationResult> {
        let raw = email.trim();
        if raw.is_empty() {
            return Err(AppError::InvalidInput(
                "an email address is required".to_string(),
            ));
        }
        let task_label = format!("[Verify: {}]", raw);
        let start_time = Instant::now();
        let config = &*self.config;

        let suggestion = suggest_correction(config, raw);

        let Some(candidate) = EmailCandidate::parse(config, raw) else {
            tracing::info!(target: "verify_task", "{} Malformed address, skipping network checks.", task_label);
            return Ok(VerificationResult {
                valid: false,
                message: MSG_MALFORMED.to_string(),
                email: raw.to_string(),
                is_verified: None,
                email_quality: None,
                suggestion,
                details: VerificationDetails::default(),
                verified_at: None,
                confidence: None,
            });
        };

        let disposable = is_disposable_domain(config, candidate.domain());
        let role_based = is_role_account(config, candidate.local_part());
        let email_quality = classify_domain(config, candidate.domain());
        tracing::debug!(target: "verify_task",
            "{} disposable={} role_based={} quality={:?} suggestion={:?}",
            task_label, disposable, role_based, email_quality, suggestion);

        let mx_records = self.mx_resolver.has_mx_records(candidate.domain()).await;
        let details = VerificationDetails {
            format: true,
            domain_present: mx_records,
            disposable,
            mx_records,
            role_based,
        };

        if !mx_records {
            tracing::info!(target: "verify_task", "{} No mail servers for {}.", task_label, candidate.domain());
            return Ok(VerificationResult {
                valid: false,
                message: MSG_NO_MX.to_string(),
                email: candidate.address().to_string(),
                is_verified: Some(false),
                email_quality: Some(email_quality),
                suggestion,
                details,
                verified_at: Some(Utc::now()),
                confidence: Some(confidence::confidence_for(false, false)),
            });
        }

        let is_verified = if disposable {
            tracing::debug!(target: "verify_task", "{} Disposable domain, provider not consulted.", task_label);
            false
        } else {
            self.deliverability
                .is_deliverable(candidate.address())
                .await
        };

        let verdict = confidence::aggregate(is_verified, disposable, mx_records);
        tracing::info!(target: "verify_task",
            "{} Finished in {:.2?}: valid={} confidence={:?} ({})",
            task_label, start_time.elapsed(), verdict.valid, verdict.confidence, verdict.message);

        Ok(VerificationResult {
            valid: verdict.valid,
            message: verdict.message.to_string(),
            email: candidate.address().to_string(),
            is_verified: Some(is_verified),
            email_quality: Some(email_quality),
            suggestion,
            details,
            verified_at: Some(Utc::now()),
            confidence: Some(verdict.confidence),
        })
    }
}
