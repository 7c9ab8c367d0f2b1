// # Record Repository Trait
//
// Domain operations over the resolver's host-override store.
//
// ## Implementations
//
// - OPNsense Unbound: `autodns-provider-opnsense` crate
//
// ## Usage
//
// ```rust,ignore
// use autodns_core::RecordRepository;
//
// let existing = repository.find_record("nas", "home.lan").await?;
// match existing {
//     Some(record) => repository.update_record(&record, "nas", "home.lan", ip).await?,
//     None => repository.create_record("nas", "home.lan", ip).await?,
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Snapshot of one host override as the remote store reports it
///
/// Fetched fresh for every hostname on every pass and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// Identifier assigned by the remote store
    pub id: String,
    /// Host part of the override
    pub hostname: String,
    /// Domain part of the override
    pub domain: String,
    /// Address the override currently resolves to, verbatim from the store
    pub current_ip: String,
    /// Free-form description
    pub description: String,
    /// Whether the override is active
    pub enabled: bool,
}

impl RemoteRecord {
    /// Case-insensitive identity match on hostname and domain
    pub fn matches(&self, hostname: &str, domain: &str) -> bool {
        self.hostname.eq_ignore_ascii_case(hostname) && self.domain.eq_ignore_ascii_case(domain)
    }

    /// Whether this record already points at `ip`
    ///
    /// Compares parsed addresses when the stored value parses, so different
    /// spellings of the same IPv6 address are equal. Anything unparseable
    /// falls back to exact string comparison.
    pub fn points_at(&self, ip: IpAddr) -> bool {
        match self.current_ip.trim().parse::<IpAddr>() {
            Ok(current) => current == ip,
            Err(_) => self.current_ip == ip.to_string(),
        }
    }
}

/// Trait for host-override record stores
///
/// Implementations own transport, response validation and error
/// classification. They never decide whether a write is needed and never
/// retry; that belongs to [`crate::ReconciliationEngine`] and the pass
/// scheduler respectively.
///
/// # Reconfigure contract
///
/// `create_record` and `update_record` must trigger exactly one
/// [`reconfigure`](RecordRepository::reconfigure) after a successful write.
/// If that reload fails the call returns
/// [`Error::ReconfigurePending`](crate::Error::ReconfigurePending): the write
/// is not rolled back.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Look up the host override for `hostname`.`domain`
    ///
    /// Returns the first case-insensitive match, or `None` if there is none.
    /// Fails with [`Error::Lookup`](crate::Error::Lookup) when the search
    /// request fails or its response cannot be interpreted.
    async fn find_record(
        &self,
        hostname: &str,
        domain: &str,
    ) -> Result<Option<RemoteRecord>, crate::Error>;

    /// Create a new host override pointing at `ip`, then reconfigure
    async fn create_record(
        &self,
        hostname: &str,
        domain: &str,
        ip: IpAddr,
    ) -> Result<(), crate::Error>;

    /// Point `existing` at `ip` and force it enabled, then reconfigure
    async fn update_record(
        &self,
        existing: &RemoteRecord,
        hostname: &str,
        domain: &str,
        ip: IpAddr,
    ) -> Result<(), crate::Error>;

    /// Ask the resolver to reload its configuration
    async fn reconfigure(&self) -> Result<(), crate::Error>;

    /// Store name, for logging
    fn store_name(&self) -> &'static str;
}
