//! Best-effort mailbox confirmation that never fails its caller.

use super::api::DeliverabilityProvider;
use std::sync::Arc;
use std::time::Duration;

/// Wraps a [`DeliverabilityProvider`] with a deadline and folds every
/// failure, including provider refusals of role accounts, into "unconfirmed".
#[derive(Clone)]
pub struct DeliverabilityVerifier {
    provider: Arc<dyn DeliverabilityProvider>,
    deadline: Duration,
}

impl DeliverabilityVerifier {
    pub fn new(provider: Arc<dyn DeliverabilityProvider>, deadline: Duration) -> Self {
        Self { provider, deadline }
    }

    pub async fn is_deliverable(&self, email: &str) -> bool {
        match tokio::time::timeout(self.deadline, self.provider.confirm(email)).await {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                tracing::warn!(target: "verification_api",
                    "Deliverability check for <{}> failed, reporting unconfirmed: {}", email, e);
                false
            }
            Err(_) => {
                tracing::warn!(target: "verification_api",
                    "Deliverability check for <{}> timed out after {:?}, reporting unconfirmed.",
                    email, self.deadline);
                false
            }
        }
    }
}
