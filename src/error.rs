//! Error types for synth-dns.

use thiserror::Error;

/// Errors that can occur while setting up or running the DNS server.
#[derive(Debug, Error)]
pub enum DnsError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error (from inventory client initialization)
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Per-query synthesis failures.
///
/// Only [`SynthError::InventoryUnavailable`] and [`SynthError::InvalidName`]
/// become a server failure. The rest mean the query is not ours and it is
/// refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// Encoded text does not decode to an address of the expected family.
    #[error("malformed synthetic address: {0}")]
    MalformedAddress(String),

    /// Reverse-zone query name with the wrong label count or content.
    #[error("malformed reverse name: {0}")]
    MalformedReverseName(String),

    /// The name does not carry the configured prefix/suffix.
    #[error("name is not synthetic: {0}")]
    NameNotSynthetic(String),

    /// The inventory could not be queried (transport error or timeout).
    #[error("inventory unavailable: {0}")]
    InventoryUnavailable(String),

    /// A synthesized target is not a valid DNS name.
    #[error("invalid DNS name: {0}")]
    InvalidName(String),
}

impl SynthError {
    /// Whether this error should end the query with SERVFAIL instead of
    /// falling through.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SynthError::InventoryUnavailable(_) | SynthError::InvalidName(_)
        )
    }
}

/// Errors returned by [`Inventory`](crate::inventory::Inventory) backends.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The HTTP request to the inventory failed.
    #[error("inventory request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Engine socket could not be reached.
    #[error("inventory socket error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP exchange over the Engine socket failed.
    #[error("inventory transport error: {0}")]
    Transport(#[from] hyper::Error),

    /// The inventory answered with a body that is not the expected JSON.
    #[error("inventory response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The inventory answered with an unexpected status.
    #[error("inventory returned HTTP {0}")]
    Status(u16),

    /// The backend is not reachable for another reason.
    #[error("inventory backend error: {0}")]
    Backend(String),
}
