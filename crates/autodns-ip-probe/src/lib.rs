// # Outbound-Address IP Source
//
// Resolves the address this machine uses to reach the outside world.
//
// ## How it works
//
// A UDP socket is "connected" to a well-known public address. Connecting a
// UDP socket sends nothing; it only makes the kernel pick a route and bind
// the matching local address, which is then read back. No packet leaves the
// machine and no reply is expected.
//
// ## Limitations
//
// - Behind NAT this is the private LAN address, which is what Unbound host
//   overrides on the LAN want
// - Without a default route the probe fails and the pass is skipped

use async_trait::async_trait;
use autodns_core::traits::IpSource;
use autodns_core::{Error, Result};
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;

/// Default probe target (Cloudflare resolver, port 80)
pub const DEFAULT_PROBE_TARGET: &str = "1.1.1.1:80";

/// IP source that reads the local address of a connected UDP socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpProbeIpSource {
    target: SocketAddr,
}

impl UdpProbeIpSource {
    /// Probe towards [`DEFAULT_PROBE_TARGET`]
    pub fn new() -> Self {
        Self {
            target: SocketAddr::from(([1, 1, 1, 1], 80)),
        }
    }

    /// Probe towards a custom target
    pub fn with_target(target: SocketAddr) -> Self {
        Self { target }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    fn bind_addr(&self) -> SocketAddr {
        match self.target {
            SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
            SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
        }
    }
}

impl Default for UdpProbeIpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IpSource for UdpProbeIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let socket = UdpSocket::bind(self.bind_addr())
            .await
            .map_err(|e| Error::ip_source(format!("failed to bind probe socket: {}", e)))?;

        socket
            .connect(self.target)
            .await
            .map_err(|e| Error::ip_source(format!("failed to route to {}: {}", self.target, e)))?;

        let local = socket
            .local_addr()
            .map_err(|e| Error::ip_source(format!("failed to read local address: {}", e)))?;

        let ip = local.ip();
        if ip.is_unspecified() {
            return Err(Error::ip_source(format!(
                "no local address selected for route to {}",
                self.target
            )));
        }

        tracing::debug!(ip = %ip, target = %self.target, "Detected current IP");
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        "udp-probe"
    }
}
