//! DNS server setup and lifecycle management.

use hickory_server::ServerFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::access::AccessPolicy;
use crate::config::{DnsConfig, SynthMode};
use crate::docker::DockerInventory;
use crate::error::DnsError;
use crate::handler::SynthHandler;
use crate::inventory::{Inventory, InventoryResolver};
use crate::synthesizer::RecordSynthesizer;

/// DNS server answering synthetic A/AAAA/PTR queries.
pub struct DnsServer {
    config: DnsConfig,
    synthesizer: Arc<RecordSynthesizer>,
    access: Option<Arc<AccessPolicy>>,
}

impl DnsServer {
    /// Create a server for `config`, connecting a Docker inventory in docker mode.
    pub fn new(config: DnsConfig) -> Result<Self, DnsError> {
        let inventory: Option<Arc<dyn Inventory>> = match config.mode {
            SynthMode::Rdns => None,
            SynthMode::Docker => Some(Arc::new(DockerInventory::new(&config.inventory)?)),
        };
        Self::with_inventory(config, inventory)
    }

    /// Create a server using the given inventory instead of the configured backend.
    ///
    /// With `None`, answers are computed from the address encoding.
    pub fn with_inventory(
        config: DnsConfig,
        inventory: Option<Arc<dyn Inventory>>,
    ) -> Result<Self, DnsError> {
        config.validate()?;

        let zone = config.zone_config();
        let synthesizer = match inventory {
            Some(inventory) => {
                let timeout = Duration::from_millis(config.inventory.timeout_ms);
                RecordSynthesizer::with_inventory(zone, InventoryResolver::new(inventory, timeout))
            }
            None => RecordSynthesizer::rdns(zone),
        };

        let access = if config.allow.enabled {
            Some(Arc::new(AccessPolicy::from_config(&config.allow)?))
        } else {
            None
        };

        Ok(Self {
            config,
            synthesizer: Arc::new(synthesizer),
            access,
        })
    }

    /// The shared synthesizer.
    pub fn synthesizer(&self) -> &Arc<RecordSynthesizer> {
        &self.synthesizer
    }

    /// Whether queries are gated by a source allowlist.
    pub fn has_allowlist(&self) -> bool {
        self.access.is_some()
    }

    /// Request handler answering for every origin.
    pub fn handler(&self) -> SynthHandler {
        SynthHandler::new(self.synthesizer.clone(), self.access.clone())
    }

    /// Run the DNS server until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), DnsError> {
        info!(
            listen_addr = %self.config.listen_addr,
            mode = ?self.config.mode,
            "Starting synth-dns server"
        );

        let mut server = ServerFuture::new(self.handler());

        // Bind UDP
        let udp_socket = UdpSocket::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS UDP listening");
        server.register_socket(udp_socket);

        // Bind TCP
        let tcp_listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, Duration::from_secs(30));

        info!(
            origins = ?self.synthesizer.origins(),
            allowlist = self.access.as_ref().map(|a| a.len()),
            "DNS server ready to serve queries"
        );

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("DNS server shutdown requested");
            }
            result = server.block_until_done() => {
                if let Err(e) = result {
                    error!("DNS server error: {}", e);
                }
            }
        }

        info!("DNS server stopped");
        Ok(())
    }
}
