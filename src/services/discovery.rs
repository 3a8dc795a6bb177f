//! Client for the address-discovery service that turns an identity into candidate strings.

use crate::core::config::Config;
use crate::core::error::{AppError, Result, UpstreamKind};
use crate::core::models::Identity;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub(crate) const SERVICE_NAME: &str = "discovery";

/// Candidates returned by the discovery service for one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredEmails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub personal_emails: Vec<String>,
}

pub trait DiscoveryService: Send + Sync {
    fn discover<'a>(&'a self, identity: &'a Identity) -> BoxFuture<'a, Result<DiscoveredEmails>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveryRequest<'a> {
    first_name: &'a str,
    last_name: &'a str,
    linkedin: &'a str,
    company_name: &'a str,
}

impl<'a> From<&'a Identity> for DiscoveryRequest<'a> {
    fn from(identity: &'a Identity) -> Self {
        Self {
            first_name: identity.first_name.as_deref().unwrap_or(""),
            last_name: identity.last_name.as_deref().unwrap_or(""),
            linkedin: identity.linkedin.as_deref().unwrap_or(""),
            company_name: identity.company_name.as_deref().unwrap_or(""),
        }
    }
}

/// JSON-over-HTTP discovery client.
pub struct HttpDiscoveryService {
    http_client: Client,
    endpoint: Option<Url>,
    api_key: Option<String>,
    deadline: Duration,
}

impl HttpDiscoveryService {
    pub fn new(config: &Config, http_client: Client) -> Result<Self> {
        let endpoint = config.discovery_url.as_deref().map(Url::parse).transpose()?;
        Ok(Self {
            http_client,
            endpoint,
            api_key: config.discovery_api_key.clone(),
            deadline: config.request_timeout,
        })
    }

    async fn request(&self, identity: &Identity) -> Result<DiscoveredEmails> {
        let task_label = format!("[Discovery: {}]", identity.label());
        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            AppError::upstream(
                UpstreamKind::Configuration,
                SERVICE_NAME,
                "no discovery endpoint configured",
            )
        })?;

        let mut request = self
            .http_client
            .post(endpoint.clone())
            .json(&DiscoveryRequest::from(identity));
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(target: "discovery", "{} Sending request to {}", task_label, endpoint);
        let response = request
            .send()
            .await
            .map_err(|e| AppError::from_request(SERVICE_NAME, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(target: "discovery", "{} Service answered {}: {}", task_label, status, body.trim());
            return Err(AppError::upstream(
                UpstreamKind::from_status(status),
                SERVICE_NAME,
                format!("status {}", status),
            ));
        }

        let found: DiscoveredEmails = response
            .json()
            .await
            .map_err(|e| AppError::from_request(SERVICE_NAME, e))?;
        tracing::info!(target: "discovery", "{} Found {:?} (+{} personal)",
            task_label, found.email, found.personal_emails.len());
        Ok(found)
    }
}

impl DiscoveryService for HttpDiscoveryService {
    fn discover<'a>(&'a self, identity: &'a Identity) -> BoxFuture<'a, Result<DiscoveredEmails>> {
        Box::pin(async move {
            match tokio::time::timeout(self.deadline, self.request(identity)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::upstream(
                    UpstreamKind::Network,
                    SERVICE_NAME,
                    format!("timed out after {:?}", self.deadline),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let identity = Identity {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            linkedin: None,
            company_name: Some("Engines".into()),
        };
        let value = serde_json::to_value(DiscoveryRequest::from(&identity)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "linkedin": "",
                "companyName": "Engines"
            })
        );
    }

    #[test]
    fn response_tolerates_nulls() {
        let parsed: DiscoveredEmails =
            serde_json::from_str(r#"{"email": null, "personalEmails": []}"#).unwrap();
        assert_eq!(parsed, DiscoveredEmails::default());
        let parsed: DiscoveredEmails = serde_json::from_str(r#"{"email": "a@b.io"}"#).unwrap();
        assert_eq!(parsed.email.as_deref(), Some("a@b.io"));
    }

    #[tokio::test]
    async fn unconfigured_service_is_configuration_error() {
        let service = HttpDiscoveryService::new(&Config::default(), Client::new()).unwrap();
        let err = service.discover(&Identity::default()).await.unwrap_err();
        assert_eq!(err.error_type(), "upstream_configuration");
    }
}
