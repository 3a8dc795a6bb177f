//! Client for the external deliverability-verification provider.

use crate::core::config::Config;
use crate::core::error::{AppError, Result, UpstreamKind};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub(crate) const SERVICE_NAME: &str = "deliverability";

/// Shared HTTP client for the provider and discovery calls.
pub(crate) fn build_http_client(config: &Config) -> Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| AppError::Initialization(format!("Failed to build HTTP client: {}", e)))
}

/// A remote service that can confirm a mailbox exists.
///
/// Errors are returned classified; callers decide whether to fold them.
pub trait DeliverabilityProvider: Send + Sync {
    fn confirm<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<bool>>;
}

#[derive(Serialize)]
struct ProviderRequest<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct ProviderResponse {
    #[serde(alias = "verified", alias = "isVerified", alias = "valid")]
    deliverable: bool,
}

/// JSON-over-HTTP provider: `POST {url}` with `{"email": ...}`, answering
/// `{"deliverable": bool}`.
pub struct HttpDeliverabilityProvider {
    http_client: Client,
    endpoint: Option<Url>,
    api_key: Option<String>,
}

impl HttpDeliverabilityProvider {
    pub fn new(config: &Config, http_client: Client) -> Result<Self> {
        let endpoint = config
            .deliverability_url
            .as_deref()
            .map(Url::parse)
            .transpose()?;
        Ok(Self {
            http_client,
            endpoint,
            api_key: config.deliverability_api_key.clone(),
        })
    }

    async fn request(&self, email: &str) -> Result<bool> {
        let task_label = format!("[Deliverability: {}]", email);
        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            AppError::upstream(
                UpstreamKind::Configuration,
                SERVICE_NAME,
                "no provider endpoint configured",
            )
        })?;

        tracing::debug!(target: "verification_api", "{} Sending request to {}", task_label, endpoint);
        let mut request = self
            .http_client
            .post(endpoint.clone())
            .json(&ProviderRequest { email });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::from_request(SERVICE_NAME, e))?;
        let status = response.status();
        tracing::debug!(target: "verification_api", "{} Received status: {}", task_label, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                UpstreamKind::from_status(status),
                SERVICE_NAME,
                format!("status {}: {}", status, body.trim()),
            ));
        }

        let parsed: ProviderResponse = response
            .json()
            .await
            .map_err(|e| AppError::from_request(SERVICE_NAME, e))?;
        tracing::info!(target: "verification_api", "{} Provider answered deliverable={}", task_label, parsed.deliverable);
        Ok(parsed.deliverable)
    }
}

impl DeliverabilityProvider for HttpDeliverabilityProvider {
    fn confirm<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(self.request(email))
    }
}
