use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, warn};

use crate::rank::Entry;

/// Per-lookup time limit used unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Lookups in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(n) => n,
    None => unreachable!(),
};

/// Why a reverse lookup did not produce a name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LookupFailure {
    #[error("not an IP address")]
    Malformed,
    #[error("no PTR record")]
    NoRecord,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Resolver(String),
}

/// Outcome of resolving one address. A failed lookup is not an error: the
/// report shows the address in place of the name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Hostname {
    Resolved(String),
    Fallback(LookupFailure),
}

impl Hostname {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Hostname::Resolved(_))
    }
}

/// A source of reverse (PTR) lookups.
#[async_trait]
pub trait ReverseLookup: Send + Sync {
    async fn reverse(&self, ip: IpAddr) -> Result<String, LookupFailure>;
}

/// Reverse lookups through the system's DNS configuration.
pub struct DnsLookup {
    resolver: TokioAsyncResolver,
}

impl DnsLookup {
    /// Build a resolver from the system configuration, falling back to the
    /// library defaults when it cannot be read. Each query gets one attempt.
    pub fn from_system_conf(timeout: Duration) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(err) => {
                warn!(%err, "could not read system resolver configuration, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = 1;
        DnsLookup {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl ReverseLookup for DnsLookup {
    async fn reverse(&self, ip: IpAddr) -> Result<String, LookupFailure> {
        let lookup = self
            .resolver
            .reverse_lookup(ip)
            .await
            .map_err(|err| match err.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => LookupFailure::NoRecord,
                _ => LookupFailure::Resolver(err.to_string()),
            })?;
        lookup
            .iter()
            .next()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .ok_or(LookupFailure::NoRecord)
    }
}

/// Resolves the surviving report entries, concurrently and each within its
/// own time limit.
pub struct Resolver<L> {
    lookup: L,
    timeout: Duration,
    concurrency: NonZeroUsize,
}

impl<L: ReverseLookup> Resolver<L> {
    pub fn new(lookup: L) -> Self {
        Resolver {
            lookup,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Resolve a single address. Never fails.
    pub async fn resolve(&self, address: &str) -> Hostname {
        // Scoped addresses (fe80::1%eth0) do not parse as IpAddr.
        let bare = address.split_once('%').map_or(address, |(ip, _)| ip);
        let Ok(ip) = bare.parse::<IpAddr>() else {
            debug!(address, "not resolvable as an IP address");
            return Hostname::Fallback(LookupFailure::Malformed);
        };

        let outcome = match tokio::time::timeout(self.timeout, self.lookup.reverse(ip)).await {
            Ok(Ok(name)) => return Hostname::Resolved(name),
            Ok(Err(failure)) => failure,
            Err(_) => LookupFailure::Timeout(self.timeout),
        };
        debug!(address, reason = %outcome, "reverse lookup failed");
        Hostname::Fallback(outcome)
    }

    /// Fill in the hostname of every entry. The returned entries keep the
    /// order they were given in, whatever order the lookups finish in.
    pub async fn resolve_all(&self, entries: Vec<Entry>) -> Vec<Entry> {
        stream::iter(entries)
            .map(|mut entry| async move {
                entry.hostname = Some(self.resolve(&entry.address).await);
                entry
            })
            .buffered(self.concurrency.get())
            .collect()
            .await
    }
}
