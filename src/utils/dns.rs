//! Mail-exchange lookups for a domain.

use crate::core::config::Config;
use crate::core::error::Result;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::TokioAsyncResolver;

/// Answers whether a domain advertises at least one MX record.
///
/// Implementations never fail: every resolution problem is reported as `false`.
pub trait MxResolver: Send + Sync {
    fn has_mx_records<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, bool>;
}

/// Builds the tokio resolver from the configured name servers, falling back
/// to the system configuration when none parse as IP addresses.
pub(crate) fn create_resolver(config: &Config) -> Result<TokioAsyncResolver> {
    let ips: Vec<IpAddr> = config
        .dns_servers
        .iter()
        .filter_map(|s| match s.trim().parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::warn!(target: "dns", "Ignoring unparsable DNS server address '{}'", s);
                None
            }
        })
        .collect();

    if ips.is_empty() {
        tracing::info!(target: "dns", "Using system DNS configuration.");
        return Ok(TokioAsyncResolver::tokio_from_system_conf()?);
    }

    let name_servers = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
    let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
    let mut opts = ResolverOpts::default();
    opts.timeout = config.dns_timeout;
    opts.attempts = 2;

    tracing::debug!(target: "dns", "Resolver configured with {} name servers.", ips.len());
    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}

enum MxOutcome {
    Found(usize),
    NoRecords,
    Failed(String),
}

/// Upper bound on cached domains before the cache is cleared.
const MX_CACHE_CAPACITY: usize = 10_000;

/// DNS-backed [`MxResolver`] with a per-domain cache of definitive answers.
///
/// The cache lives as long as the resolver. It holds at most
/// `MX_CACHE_CAPACITY` domains and is emptied when that bound is reached, so
/// long-lived callers re-query DNS periodically instead of growing forever.
pub struct DnsMxResolver {
    resolver: TokioAsyncResolver,
    deadline: Duration,
    cache: RwLock<HashMap<String, bool>>,
    cache_capacity: usize,
}

impl DnsMxResolver {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            resolver: create_resolver(config)?,
            deadline: config.dns_timeout,
            cache: RwLock::new(HashMap::new()),
            cache_capacity: MX_CACHE_CAPACITY,
        })
    }

    fn remember(&self, domain: &str, has_mx: bool) {
        let mut cache = self.cache.write();
        if cache.len() >= self.cache_capacity && !cache.contains_key(domain) {
            tracing::debug!(target: "dns", "MX cache reached {} entries; clearing.", cache.len());
            cache.clear();
        }
        cache.insert(domain.to_string(), has_mx);
    }

    async fn lookup(&self, domain: &str) -> MxOutcome {
        let query = format!("{}.", domain.trim_end_matches('.'));
        match tokio::time::timeout(self.deadline, self.resolver.mx_lookup(query)).await {
            Err(_) => MxOutcome::Failed(format!("timed out after {:?}", self.deadline)),
            Ok(Ok(lookup)) => {
                let count = lookup.iter().count();
                if count == 0 {
                    MxOutcome::NoRecords
                } else {
                    MxOutcome::Found(count)
                }
            }
            Ok(Err(e)) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => MxOutcome::NoRecords,
                _ => MxOutcome::Failed(e.to_string()),
            },
        }
    }
}

impl MxResolver for DnsMxResolver {
    fn has_mx_records<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if let Some(cached) = self.cache.read().get(domain).copied() {
                tracing::trace!(target: "dns", "MX cache hit for {}: {}", domain, cached);
                return cached;
            }

            tracing::debug!(target: "dns", "Resolving MX for {}...", domain);
            match self.lookup(domain).await {
                MxOutcome::Found(count) => {
                    tracing::debug!(target: "dns", "Found {} MX records for {}", count, domain);
                    self.remember(domain, true);
                    true
                }
                MxOutcome::NoRecords => {
                    tracing::info!(target: "dns", "No MX records (or NXDOMAIN) for {}", domain);
                    self.remember(domain, false);
                    false
                }
                MxOutcome::Failed(reason) => {
                    tracing::warn!(target: "dns", "MX lookup for {} failed: {}. Treating as no mail servers.", domain, reason);
                    false
                }
            }
        })
    }
}
