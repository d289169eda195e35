//! Source-address allowlist.
//!
//! Queries from sources inside one of the configured networks are served;
//! everything else is refused before any synthesis happens.

use ipnetwork::IpNetwork;
use std::net::IpAddr;
use tracing::warn;

use crate::config::AllowConfig;
use crate::error::DnsError;

/// Parsed allowlist.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    networks: Vec<IpNetwork>,
}

impl AccessPolicy {
    /// Parse every CIDR in the config; any invalid entry is a config error.
    pub fn from_config(config: &AllowConfig) -> Result<Self, DnsError> {
        let networks = config
            .networks
            .iter()
            .map(|network| {
                network.parse::<IpNetwork>().map_err(|e| {
                    warn!(network = %network, error = %e, "invalid allowlist network");
                    DnsError::Config(format!("invalid allowlist network {network:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { networks })
    }

    /// Whether `src` may query the server.
    ///
    /// IPv4-mapped IPv6 sources are checked as IPv4.
    pub fn allows(&self, src: IpAddr) -> bool {
        let src = match src {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(src),
            IpAddr::V4(_) => src,
        };
        self.networks.iter().any(|network| network.contains(src))
    }

    /// Number of configured networks.
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Whether no network is configured (every source is refused).
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
