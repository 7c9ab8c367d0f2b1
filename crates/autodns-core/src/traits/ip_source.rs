// # IP Source Trait
//
// Where a reconciliation pass gets its target address from.
//
// ## Implementations
//
// - [`FixedIpSource`]: an operator-pinned address
// - UDP outbound probe: `autodns-ip-probe` crate

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
///
/// Called once at the start of every pass; implementations must not cache
/// across calls, so a changed network is picked up on the next pass.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the address host overrides should point at
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Source name, for logging
    fn source_name(&self) -> &'static str;
}

/// An IP source that always returns the configured address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIpSource {
    ip: IpAddr,
}

impl FixedIpSource {
    /// Create a source pinned to `ip`
    pub fn new(ip: IpAddr) -> Self {
        Self { ip }
    }
}

#[async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr, crate::Error> {
        tracing::debug!(ip = %self.ip, "Using provided IP address");
        Ok(self.ip)
    }

    fn source_name(&self) -> &'static str {
        "fixed"
    }
}
