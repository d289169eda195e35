//! Container inventory lookups.
//!
//! The inventory is the authoritative source of live name → address
//! mappings. It is queried fresh on every DNS query; nothing is cached here.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::codec::Family;
use crate::error::{InventoryError, SynthError};
use crate::metrics::{self, InventoryOp, InventoryResult, Timer};

/// One network attachment of an inventory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkAttachment {
    /// IPv4 address on this network, if any.
    pub ipv4: Option<Ipv4Addr>,
    /// Global IPv6 address on this network, if any.
    pub ipv6: Option<Ipv6Addr>,
}

impl NetworkAttachment {
    /// Address of the requested family, if assigned.
    pub fn address(&self, family: Family) -> Option<IpAddr> {
        match family {
            Family::V4 => self.ipv4.map(IpAddr::V4),
            Family::V6 => self.ipv6.map(IpAddr::V6),
        }
    }
}

/// A named inventory entry (e.g. a running container).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    /// Name the entry is known by.
    pub canonical_name: String,
    /// One attachment per network, in inventory order.
    pub attachments: Vec<NetworkAttachment>,
}

impl InventoryEntry {
    /// All addresses of `family`, in attachment order.
    pub fn addresses(&self, family: Family) -> Vec<IpAddr> {
        self.attachments
            .iter()
            .filter_map(|a| a.address(family))
            .collect()
    }

    /// Whether any attachment carries `ip`.
    pub fn has_address(&self, ip: &IpAddr) -> bool {
        let family = Family::of(ip);
        self.attachments
            .iter()
            .any(|a| a.address(family).as_ref() == Some(ip))
    }
}

/// Read-only snapshot API of an inventory backend.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// All current entries, in backend order.
    async fn list_entries(&self) -> Result<Vec<InventoryEntry>, InventoryError>;

    /// The entry known as `canonical_name`, or `None` if there is none.
    async fn inspect(&self, canonical_name: &str) -> Result<Option<InventoryEntry>, InventoryError>;
}

/// Thread-safe in-memory inventory.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    entries: Arc<RwLock<Vec<InventoryEntry>>>,
}

impl StaticInventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any entry with the same canonical name in
    /// place so scan order is kept.
    pub fn upsert(&self, entry: InventoryEntry) {
        let mut entries = self.entries.write();
        debug!(name = %entry.canonical_name, attachments = entry.attachments.len(), "upserting inventory entry");
        match entries
            .iter_mut()
            .find(|e| e.canonical_name == entry.canonical_name)
        {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    /// Remove an entry by canonical name.
    pub fn remove(&self, canonical_name: &str) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.canonical_name != canonical_name);
        if entries.len() != before {
            debug!(name = canonical_name, "removed inventory entry");
        }
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the inventory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Inventory for StaticInventory {
    async fn list_entries(&self) -> Result<Vec<InventoryEntry>, InventoryError> {
        Ok(self.entries.read().clone())
    }

    async fn inspect(&self, canonical_name: &str) -> Result<Option<InventoryEntry>, InventoryError> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|e| e.canonical_name == canonical_name)
            .cloned())
    }
}

/// Resolves synthetic queries against an [`Inventory`] with a deadline.
#[derive(Clone)]
pub struct InventoryResolver {
    inventory: Arc<dyn Inventory>,
    timeout: Duration,
}

impl std::fmt::Debug for InventoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl InventoryResolver {
    /// Create a resolver; every inventory call is bounded by `timeout`.
    pub fn new(inventory: Arc<dyn Inventory>, timeout: Duration) -> Self {
        Self { inventory, timeout }
    }

    /// Canonical name of the first entry carrying `ip`.
    ///
    /// Entries are scanned in inventory order and the first match wins.
    pub async fn resolve_by_ip(&self, ip: IpAddr) -> Result<Option<String>, SynthError> {
        let timer = Timer::start();
        let entries = self
            .bounded(InventoryOp::List, self.inventory.list_entries(), &timer)
            .await?;

        let found = entries
            .into_iter()
            .find(|entry| entry.has_address(&ip))
            .map(|entry| entry.canonical_name);

        match &found {
            Some(name) => {
                trace!(%ip, name = %name, "inventory match by address");
                metrics::record_inventory_lookup(InventoryOp::List, InventoryResult::Found, timer.elapsed());
            }
            None => {
                debug!(%ip, "no inventory entry carries address");
                metrics::record_inventory_lookup(InventoryOp::List, InventoryResult::Missing, timer.elapsed());
            }
        }

        Ok(found)
    }

    /// Every `family` address of the entry named `canonical_name`.
    ///
    /// `Ok(None)` when the entry does not exist; `Ok(Some(vec![]))` when it
    /// exists without addresses of that family.
    pub async fn resolve_by_name(
        &self,
        canonical_name: &str,
        family: Family,
    ) -> Result<Option<Vec<IpAddr>>, SynthError> {
        let timer = Timer::start();
        let entry = self
            .bounded(InventoryOp::Inspect, self.inventory.inspect(canonical_name), &timer)
            .await?;

        match entry {
            Some(entry) => {
                let ips = entry.addresses(family);
                trace!(name = canonical_name, count = ips.len(), "inventory match by name");
                metrics::record_inventory_lookup(InventoryOp::Inspect, InventoryResult::Found, timer.elapsed());
                Ok(Some(ips))
            }
            None => {
                debug!(name = canonical_name, "no inventory entry with name");
                metrics::record_inventory_lookup(InventoryOp::Inspect, InventoryResult::Missing, timer.elapsed());
                Ok(None)
            }
        }
    }

    async fn bounded<T>(
        &self,
        op: InventoryOp,
        call: impl std::future::Future<Output = Result<T, InventoryError>>,
        timer: &Timer,
    ) -> Result<T, SynthError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(error = %e, "inventory lookup failed");
                metrics::record_inventory_lookup(op, InventoryResult::Error, timer.elapsed());
                Err(SynthError::InventoryUnavailable(e.to_string()))
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "inventory lookup timed out");
                metrics::record_inventory_lookup(op, InventoryResult::Timeout, timer.elapsed());
                Err(SynthError::InventoryUnavailable(format!(
                    "timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}
