//! Defines the custom error types for the email-verifier application.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use thiserror::Error;
use url::ParseError as UrlParseError;

/// Classification of a failure reported by an upstream service
/// (DNS, deliverability provider, discovery service).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamKind {
    Credentials,
    Permissions,
    ResourceNotFound,
    Configuration,
    Network,
    Throttling,
    Unknown,
}

impl UpstreamKind {
    /// Classifies an HTTP status returned by an upstream service.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 => UpstreamKind::Credentials,
            403 => UpstreamKind::Permissions,
            404 | 410 => UpstreamKind::ResourceNotFound,
            429 => UpstreamKind::Throttling,
            502..=504 => UpstreamKind::Network,
            _ => UpstreamKind::Unknown,
        }
    }

    /// Classifies a transport-level reqwest failure.
    pub fn from_request_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            UpstreamKind::Network
        } else if err.is_builder() {
            UpstreamKind::Configuration
        } else if let Some(status) = err.status() {
            UpstreamKind::from_status(status)
        } else {
            UpstreamKind::Unknown
        }
    }
}

impl std::fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UpstreamKind::Credentials => "credentials",
            UpstreamKind::Permissions => "permissions",
            UpstreamKind::ResourceNotFound => "resource not found",
            UpstreamKind::Configuration => "configuration",
            UpstreamKind::Network => "network",
            UpstreamKind::Throttling => "throttling",
            UpstreamKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// The primary error type for the verification process.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error occurring during configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error initializing necessary components (e.g., clients, resolvers).
    #[error("Initialization Error: {0}")]
    Initialization(String),

    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Error during JSON serialization or deserialization.
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error parsing a URL.
    #[error("URL Parsing Error: {0}")]
    UrlParse(#[from] UrlParseError),

    /// Error during DNS resolver setup.
    #[error("DNS Resolution Error: {0}")]
    Dns(#[from] trust_dns_resolver::error::ResolveError),

    /// Missing or malformed caller input. Recoverable by supplying a better value.
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    /// A remote service failed in a way the caller cannot fix by changing input.
    #[error("Upstream Error ({service}, {kind}): {message}")]
    Upstream {
        kind: UpstreamKind,
        service: String,
        message: String,
    },

    /// One or more records of a batch failed while the rest completed.
    #[error("Partial Batch Failure: {failed} of {attempted} records failed")]
    PartialBatchFailure { failed: usize, attempted: usize },

    /// A stored history blob could not be read and was downgraded to metadata.
    #[error("History entry '{key}' degraded: {reason}")]
    PersistenceDegradation { key: String, reason: String },

    /// An underlying error that doesn't fit other categories, using anyhow.
    #[error("Generic Error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl AppError {
    pub(crate) fn upstream(
        kind: UpstreamKind,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        AppError::Upstream {
            kind,
            service: service.into(),
            message: message.into(),
        }
    }

    /// Wraps a reqwest failure, classifying it by transport or status.
    pub(crate) fn from_request(service: &str, err: reqwest::Error) -> Self {
        let kind = UpstreamKind::from_request_error(&err);
        AppError::upstream(kind, service, err.to_string())
    }

    /// Short machine-readable name of the failure class.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Upstream { kind, .. } => match kind {
                UpstreamKind::Credentials => "upstream_credentials",
                UpstreamKind::Permissions => "upstream_permissions",
                UpstreamKind::ResourceNotFound => "upstream_resource_not_found",
                UpstreamKind::Configuration => "upstream_configuration",
                UpstreamKind::Network => "upstream_network",
                UpstreamKind::Throttling => "upstream_throttling",
                UpstreamKind::Unknown => "upstream_unknown",
            },
            AppError::PartialBatchFailure { .. } => "partial_batch_failure",
            AppError::PersistenceDegradation { .. } => "persistence_degradation",
            AppError::Dns(_) => "dns",
            AppError::Config(_) => "configuration",
            AppError::Initialization(_) => "initialization",
            AppError::Io(_) => "io",
            AppError::Json(_) => "json",
            AppError::UrlParse(_) => "url_parse",
            AppError::Generic(_) => "internal",
        }
    }

    /// HTTP-style status class: 4xx for caller input, 5xx for service failures.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) => 400,
            AppError::Json(_) | AppError::UrlParse(_) => 400,
            AppError::Dns(_) => 502,
            AppError::Upstream { kind, .. } => match kind {
                UpstreamKind::Throttling => 503,
                UpstreamKind::Network => 504,
                _ => 502,
            },
            _ => 500,
        }
    }

    /// Message safe to show to a caller. Upstream internals are reduced to their class.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Upstream { kind, service, .. } => {
                format!("{} service failed ({})", service, kind)
            }
            AppError::Generic(_) | AppError::Io(_) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Builds the error envelope returned at the outer boundary.
    pub fn envelope(&self) -> ErrorEnvelope {
        let service = match self {
            AppError::Upstream { service, .. } => Some(service.clone()),
            _ => None,
        };
        ErrorEnvelope {
            error_type: self.error_type(),
            message: self.public_message(),
            service,
            status: self.status_code(),
            timestamp: Utc::now(),
        }
    }
}

/// Error response body for callers of the verification boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error_type: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub status: u16,
    pub timestamp: DateTime<Utc>,
}

pub type Result<T> = std::result::Result<T, AppError>;
