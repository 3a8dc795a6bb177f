//! # Email Verifier Core Library
//!
//! This crate verifies email addresses one at a time and in batches. A single
//! verification runs syntax, disposable-domain, role-account, typo and quality
//! checks, then an MX lookup, then asks a remote deliverability provider.
//! Batches of discovered contacts are verified sequentially with periodic
//! checkpoints, and individual records can be re-discovered.
//!
//! It is designed to be used either directly as a library or via the
//! `email-verifier` command-line tool (which uses this library).

mod core;
mod services;
mod utils;
mod verification;

pub use crate::core::batch::{
    AddressVerifier, BatchCheckpoint, BatchOrchestrator, BatchRun, BatchSummary, CancelFlag,
    ChannelSink, CheckpointSink, RecordOutcome,
};
pub use crate::core::config::{get_random_sleep_duration, Config, ConfigBuilder, ConfigFile};
pub use crate::core::error::{AppError, ErrorEnvelope, Result, UpstreamKind};
pub use crate::core::models::{
    BatchInput, BatchJob, BatchRecord, Confidence, EmailCandidate, EmailQuality, Identity,
    VerificationDetails, VerificationResult, VerificationState,
};
pub use crate::core::verifier::EmailVerifier;
pub use crate::services::discovery::{DiscoveredEmails, DiscoveryService, HttpDiscoveryService};
pub use crate::services::history::{FsHistoryStore, HistoryEntry, HistoryStore, DEFAULT_KIND};
pub use crate::utils::dns::{DnsMxResolver, MxResolver};
pub use crate::verification::api::{DeliverabilityProvider, HttpDeliverabilityProvider};

use crate::verification::api::build_http_client;
use std::sync::Arc;

/// Initializes the HTTP provider client and DNS resolver.
/// Essential for creating an `EmailVerifier` instance.
pub async fn initialize_verifier(config: &Config) -> Result<EmailVerifier> {
    EmailVerifier::new(config).await
}

/// Builds a batch orchestrator around `verifier`, backed by the configured
/// discovery service.
pub fn initialize_orchestrator(
    config: Arc<Config>,
    verifier: Arc<dyn AddressVerifier>,
) -> Result<BatchOrchestrator> {
    let http_client = build_http_client(&config)?;
    let discovery = HttpDiscoveryService::new(&config, http_client)?;
    if config.discovery_url.is_none() {
        tracing::warn!(target: "discovery", "No discovery URL configured; retries will fail.");
    }
    Ok(BatchOrchestrator::new(
        config,
        verifier,
        Arc::new(discovery),
    ))
}

/// Verifies one address and logs the outcome under the `verify_task` target.
///
/// # Arguments
/// * `verifier` - An initialized `EmailVerifier`.
/// * `email` - The raw address, trimmed before checking.
///
/// # Returns
/// * The `VerificationResult`, or `AppError::InvalidInput` for blank input.
pub async fn verify_single_email(
    verifier: &EmailVerifier,
    email: &str,
) -> Result<VerificationResult> {
    tracing::info!(target: "verify_task", "[Verify: {}] Starting verification.", email.trim());
    let result = verifier.verify(email).await;
    match &result {
        Ok(r) if r.valid => {
            tracing::info!(target: "verify_task", "[Verify: {}] ✓ {}", r.email, r.message)
        }
        Ok(r) => tracing::info!(target: "verify_task", "[Verify: {}] ✗ {}", r.email, r.message),
        Err(e) => tracing::warn!(target: "verify_task", "[Verify: {}] Rejected: {}", email.trim(), e),
    }
    result
}
