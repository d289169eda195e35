//! Configuration types for synth-dns.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::codec::{AddressCodec, DEFAULT_DELIMITER};
use crate::error::DnsError;
use crate::matcher::FamilyNaming;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    pub dns: DnsConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Where answers come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthMode {
    /// Answers are computed from the address encoding alone.
    #[default]
    Rdns,
    /// Answers come from a live container inventory.
    Docker,
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for DNS server to listen on (UDP and TCP).
    pub listen_addr: SocketAddr,

    /// Answer source.
    #[serde(default)]
    pub mode: SynthMode,

    /// Prefix shared by both families unless overridden.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Suffix shared by both families unless overridden.
    #[serde(default)]
    pub suffix: Option<String>,

    /// IPv4 naming overrides.
    #[serde(default)]
    pub v4: FamilyOverrides,

    /// IPv6 naming overrides.
    #[serde(default)]
    pub v6: FamilyOverrides,

    /// TTL for synthesized records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Separator between address components in synthetic names.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Inventory backend settings (docker mode).
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Source allowlist.
    #[serde(default)]
    pub allow: AllowConfig,
}

/// Per-family prefix/suffix overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyOverrides {
    /// Overrides [`DnsConfig::prefix`] for this family.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Overrides [`DnsConfig::suffix`] for this family.
    #[serde(default)]
    pub suffix: Option<String>,
}

/// Docker Engine endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Engine endpoint: `unix://<socket path>` or an HTTP base URL.
    #[serde(default = "default_inventory_url")]
    pub url: String,

    /// API version path segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Deadline for a single inventory call, in milliseconds.
    #[serde(default = "default_inventory_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            url: default_inventory_url(),
            api_version: default_api_version(),
            timeout_ms: default_inventory_timeout_ms(),
        }
    }
}

/// Source networks allowed to query the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowConfig {
    /// Refuse queries from sources outside `networks`.
    #[serde(default)]
    pub enabled: bool,

    /// CIDR networks; defaults to private, loopback and link-local ranges.
    #[serde(default = "default_allow_networks")]
    pub networks: Vec<String>,
}

impl Default for AllowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            networks: default_allow_networks(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "synth_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,

    /// OpenTelemetry configuration.
    #[serde(default)]
    pub opentelemetry: Option<OpenTelemetryConfig>,
}

/// OpenTelemetry exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTelemetryConfig {
    /// OTLP endpoint (e.g., "http://localhost:4317").
    pub endpoint: String,

    /// Service name for traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
            opentelemetry: None,
        }
    }
}

/// Resolved, immutable naming rules shared by every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfig {
    /// IPv4 naming.
    pub v4: FamilyNaming,
    /// IPv6 naming.
    pub v6: FamilyNaming,
    /// Record TTL in seconds.
    pub ttl: u32,
    /// Address codec.
    pub codec: AddressCodec,
}

impl DnsConfig {
    /// Config with defaults for everything but the listen address.
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            mode: SynthMode::default(),
            prefix: None,
            suffix: None,
            v4: FamilyOverrides::default(),
            v6: FamilyOverrides::default(),
            ttl: default_ttl(),
            delimiter: default_delimiter(),
            inventory: InventoryConfig::default(),
            allow: AllowConfig::default(),
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), DnsError> {
        if !AddressCodec::is_valid_delimiter(self.delimiter) {
            return Err(DnsError::Config(format!(
                "delimiter {:?} collides with address or label syntax",
                self.delimiter
            )));
        }
        if self.inventory.timeout_ms == 0 {
            return Err(DnsError::Config(
                "inventory.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve shared and per-family settings into a [`ZoneConfig`].
    pub fn zone_config(&self) -> ZoneConfig {
        let naming = |overrides: &FamilyOverrides| {
            FamilyNaming::new(
                overrides
                    .prefix
                    .clone()
                    .or_else(|| self.prefix.clone())
                    .unwrap_or_default(),
                overrides
                    .suffix
                    .clone()
                    .or_else(|| self.suffix.clone())
                    .unwrap_or_default(),
            )
        };

        ZoneConfig {
            v4: naming(&self.v4),
            v6: naming(&self.v6),
            ttl: self.ttl,
            codec: AddressCodec::new(self.delimiter),
        }
    }
}

fn default_ttl() -> u32 {
    86400
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

fn default_inventory_url() -> String {
    "unix:///var/run/docker.sock".to_string()
}

fn default_api_version() -> String {
    "v1.22".to_string()
}

fn default_inventory_timeout_ms() -> u64 {
    2000
}

/// Private, loopback and link-local ranges for both families.
pub fn default_allow_networks() -> Vec<String> {
    [
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "::1/128",
        "fe80::/10",
        "fc00::/7",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "synth-dns".to_string()
}
