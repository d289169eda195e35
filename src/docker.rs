//! Docker Engine API inventory backend.
//!
//! Talks to the Engine API over its unix socket (`unix:///var/run/docker.sock`)
//! or over HTTP (`dockerd -H tcp://…` or a socket proxy):
//!
//! - `GET /<version>/containers/json` for address → name scans
//! - `GET /<version>/containers/<name>/json` for name → address lookups

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use reqwest::{Client as HttpClient, Url};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::InventoryConfig;
use crate::error::{DnsError, InventoryError};
use crate::inventory::{Inventory, InventoryEntry, NetworkAttachment};

const UNIX_SCHEME: &str = "unix://";

/// Summary row of `GET /containers/json`.
#[derive(Debug, Deserialize)]
struct ContainerSummary {
    #[serde(rename = "Names", default)]
    names: Vec<String>,
    #[serde(rename = "NetworkSettings", default)]
    network_settings: Option<NetworkSettings>,
}

/// Body of `GET /containers/<name>/json`.
#[derive(Debug, Deserialize)]
struct ContainerInspect {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "NetworkSettings", default)]
    network_settings: Option<NetworkSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct NetworkSettings {
    // Keyed by network name; BTreeMap keeps attachment order stable.
    #[serde(rename = "Networks", default)]
    networks: BTreeMap<String, EndpointSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointSettings {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,
    #[serde(rename = "GlobalIPv6Address", default)]
    global_ipv6_address: String,
}

impl EndpointSettings {
    fn attachment(&self) -> NetworkAttachment {
        NetworkAttachment {
            ipv4: self.ip_address.parse::<Ipv4Addr>().ok(),
            ipv6: self.global_ipv6_address.parse::<Ipv6Addr>().ok(),
        }
    }
}

fn attachments(settings: Option<&NetworkSettings>) -> Vec<NetworkAttachment> {
    settings
        .map(|s| s.networks.values().map(EndpointSettings::attachment).collect())
        .unwrap_or_default()
}

/// Docker reports names with a leading `/`.
fn canonical(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}

impl ContainerSummary {
    fn into_entry(self) -> Option<InventoryEntry> {
        let canonical_name = canonical(self.names.first()?);
        Some(InventoryEntry {
            canonical_name,
            attachments: attachments(self.network_settings.as_ref()),
        })
    }
}

impl ContainerInspect {
    fn into_entry(self) -> InventoryEntry {
        InventoryEntry {
            canonical_name: canonical(&self.name),
            attachments: attachments(self.network_settings.as_ref()),
        }
    }
}

/// Container names accepted by the Engine: `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
fn is_valid_container_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

#[derive(Debug, Clone)]
enum Transport {
    Http(HttpClient),
    #[cfg(unix)]
    Unix(std::path::PathBuf),
}

/// Inventory backed by a Docker Engine.
#[derive(Debug, Clone)]
pub struct DockerInventory {
    transport: Transport,
    base: Url,
    timeout: Duration,
}

impl DockerInventory {
    /// Build a client for the configured Engine endpoint.
    ///
    /// `unix://<path>` URLs connect to the Engine socket, anything else is
    /// treated as an HTTP base URL.
    pub fn new(config: &InventoryConfig) -> Result<Self, DnsError> {
        let timeout = Duration::from_millis(config.timeout_ms);

        let (transport, root) = match config.url.strip_prefix(UNIX_SCHEME) {
            Some(path) => (unix_transport(path)?, "http://docker/"),
            None => {
                let http = HttpClient::builder()
                    .timeout(timeout)
                    .user_agent(concat!("synth-dns/", env!("CARGO_PKG_VERSION")))
                    .build()?;
                (Transport::Http(http), config.url.as_str())
            }
        };

        let mut base = Url::parse(root)
            .map_err(|e| DnsError::Config(format!("invalid inventory url {}: {}", root, e)))?;
        base.path_segments_mut()
            .map_err(|_| DnsError::Config(format!("inventory url {} cannot be a base", root)))?
            .pop_if_empty()
            .push(config.api_version.trim_matches('/'));

        Ok(Self {
            transport,
            base,
            timeout,
        })
    }

    /// Versioned API root, e.g. `http://127.0.0.1:2375/v1.22`.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// API URL for `segments` below the versioned root, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, InventoryError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| InventoryError::Backend(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `segments`. A 404 is `None`, any other non-success status is an error.
    async fn get(&self, segments: &[&str]) -> Result<Option<Bytes>, InventoryError> {
        let url = self.endpoint(segments)?;
        trace!(%url, "docker request");

        let (status, body) = match &self.transport {
            Transport::Http(http) => {
                let response = http.get(url).send().await?;
                let status = response.status();
                (status, response.bytes().await?)
            }
            #[cfg(unix)]
            Transport::Unix(socket) => {
                tokio::time::timeout(self.timeout, unix::get(socket, url.path()))
                    .await
                    .map_err(|_| {
                        InventoryError::Backend(format!("{} timed out", socket.display()))
                    })??
            }
        };

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(InventoryError::Status(status.as_u16()));
        }
        Ok(Some(body))
    }
}

#[cfg(unix)]
fn unix_transport(path: &str) -> Result<Transport, DnsError> {
    if path.is_empty() {
        return Err(DnsError::Config("inventory url has an empty socket path".to_string()));
    }
    Ok(Transport::Unix(path.into()))
}

#[cfg(not(unix))]
fn unix_transport(_path: &str) -> Result<Transport, DnsError> {
    Err(DnsError::Config(
        "unix socket inventory urls are not supported on this platform".to_string(),
    ))
}

#[cfg(unix)]
mod unix {
    use bytes::Bytes;
    use http::{header, Request, StatusCode};
    use http_body_util::{BodyExt, Empty};
    use hyper_util::rt::TokioIo;
    use std::path::Path;
    use tokio::net::UnixStream;
    use tracing::trace;

    use crate::error::InventoryError;

    /// One HTTP/1.1 GET over a fresh connection to the Engine socket.
    pub(super) async fn get(
        socket: &Path,
        path: &str,
    ) -> Result<(StatusCode, Bytes), InventoryError> {
        let stream = UnixStream::connect(socket).await?;
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                trace!(error = %e, "docker connection closed");
            }
        });

        let request = Request::get(path)
            .header(header::HOST, "docker")
            .header(header::USER_AGENT, concat!("synth-dns/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<Bytes>::new())
            .map_err(|e| InventoryError::Backend(e.to_string()))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        Ok((status, body))
    }
}

#[async_trait]
impl Inventory for DockerInventory {
    async fn list_entries(&self) -> Result<Vec<InventoryEntry>, InventoryError> {
        let body = self
            .get(&["containers", "json"])
            .await?
            .ok_or(InventoryError::Status(StatusCode::NOT_FOUND.as_u16()))?;

        let containers: Vec<ContainerSummary> = serde_json::from_slice(&body)?;
        debug!(count = containers.len(), "listed containers");
        Ok(containers
            .into_iter()
            .filter_map(ContainerSummary::into_entry)
            .collect())
    }

    async fn inspect(&self, canonical_name: &str) -> Result<Option<InventoryEntry>, InventoryError> {
        if !is_valid_container_name(canonical_name) {
            trace!(name = canonical_name, "not a container name");
            return Ok(None);
        }

        let Some(body) = self.get(&["containers", canonical_name, "json"]).await? else {
            return Ok(None);
        };

        let container: ContainerInspect = serde_json::from_slice(&body)?;
        Ok(Some(container.into_entry()))
    }
}
