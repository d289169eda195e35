//! synth-dns - An authoritative DNS server that synthesizes address records.
//!
//! Every address has a name and every name in the synthetic zone has an
//! address, without any zone data. Names are either computed from the address
//! itself (`rdns` mode) or looked up in a live container inventory (`docker`
//! mode).
//!
//! ## Features
//!
//! - PTR answers under `in-addr.arpa.` and `ip6.arpa.`
//! - A/AAAA answers for names carrying a configured prefix and suffix
//! - Per-family prefix/suffix overrides
//! - REFUSED for anything that is not synthetic, SERVFAIL when the inventory fails
//! - Optional source-address allowlist
//! - Graceful shutdown support
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          synth-dns                           │
//! │                                                              │
//! │  UDP/TCP ──▶ ServerFuture ──▶ SynthHandler (allowlist)       │
//! │                                       │                      │
//! │                                       ▼                      │
//! │                              RecordSynthesizer               │
//! │                  ┌────────────────────┼──────────────┐       │
//! │                  ▼                    ▼              ▼       │
//! │           reverse parser        name matcher    AddressCodec │
//! │                                       │                      │
//! │                                       ▼                      │
//! │                             InventoryResolver ──▶ Docker API │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## DNS Resolution
//!
//! ```text
//! 5.0.0.10.in-addr.arpa. PTR  → 10-0-0-5.docker.
//! 10-0-0-5.docker.       A    → 10.0.0.5
//! fe80--5.docker.        AAAA → fe80::5
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use synth_dns::{DnsConfig, DnsServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = DnsConfig::new("[::]:5353".parse().unwrap());
//!     config.suffix = Some(".docker".to_string());
//!
//!     let shutdown = CancellationToken::new();
//!     let server = DnsServer::new(config).unwrap();
//!     server.run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod access;
pub mod codec;
pub mod config;
pub mod docker;
pub mod error;
pub mod handler;
pub mod inventory;
pub mod matcher;
pub mod metrics;
pub mod reverse;
pub mod server;
pub mod synthesizer;
pub mod telemetry;

// Re-export main types
pub use codec::{AddressCodec, Family};
pub use config::{Config, DnsConfig, SynthMode, TelemetryConfig, ZoneConfig};
pub use error::{DnsError, InventoryError, SynthError};
pub use handler::SynthHandler;
pub use inventory::{Inventory, InventoryEntry, InventoryResolver, StaticInventory};
pub use server::DnsServer;
pub use synthesizer::{Outcome, RecordSynthesizer};
