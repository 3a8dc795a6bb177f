//! Fakes for the network-facing seams, shared by unit tests.

use crate::core::config::{Config, ConfigBuilder};
use crate::core::error::{AppError, Result, UpstreamKind};
use crate::utils::dns::MxResolver;
use crate::verification::api::DeliverabilityProvider;

use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) fn test_config() -> Config {
    ConfigBuilder::new()
        .without_default_files()
        .sleep_between_requests(0.0, 0.0)
        .build()
        .expect("Failed to build default config for test")
}

/// Answers `true` for the listed domains and counts every lookup.
#[derive(Default)]
pub(crate) struct FakeMx {
    domains: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeMx {
    pub fn with(domains: &[&str]) -> Self {
        Self {
            domains: domains.iter().map(|d| d.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MxResolver for FakeMx {
    fn has_mx_records<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let found = self.domains.contains(domain);
        Box::pin(async move { found })
    }
}

/// Confirms the listed addresses, fails for the `fail_on` ones, denies the rest.
#[derive(Default)]
pub(crate) struct FakeProvider {
    confirmed: HashSet<String>,
    fail_on: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeProvider {
    pub fn confirming(emails: &[&str]) -> Self {
        Self {
            confirmed: emails.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, emails: &[&str]) -> Self {
        self.fail_on = emails.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeliverabilityProvider for FakeProvider {
    fn confirm<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<bool>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = if self.fail_on.contains(email) {
            Err(AppError::upstream(
                UpstreamKind::Permissions,
                "deliverability",
                "role-based address refused",
            ))
        } else {
            Ok(self.confirmed.contains(email))
        };
        Box::pin(async move { outcome })
    }
}
