//! Per-query answer synthesis.
//!
//! ```text
//! PTR  …ip6.arpa.        → parse nibbles  → encode / inventory scan → PTR
//! PTR  …in-addr.arpa.    → parse octets   → encode / inventory scan → PTR
//! AAAA <v6 prefix>…<v6 suffix> → strip → decode / inventory inspect → AAAA*
//! A    <v4 prefix>…<v4 suffix> → strip → decode / inventory inspect → A*
//! anything else          → not applicable
//! ```

use hickory_proto::rr::rdata::{A, AAAA, PTR};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use std::net::IpAddr;
use tracing::{debug, trace, warn};

use crate::codec::Family;
use crate::config::ZoneConfig;
use crate::error::SynthError;
use crate::inventory::InventoryResolver;
use crate::matcher::{fqdn, FamilyNaming};
use crate::reverse;

/// Result of synthesizing one query.
#[derive(Debug)]
pub enum Outcome {
    /// The query is ours. The records may be empty when the name exists
    /// without addresses of the requested family.
    Handled(Vec<Record>),
    /// Not a synthetic name; the query is refused.
    NotApplicable,
    /// Ours, but no correct answer can be produced.
    Failed(SynthError),
}

/// Where address data comes from.
#[derive(Debug, Clone)]
enum Source {
    Codec,
    Inventory(InventoryResolver),
}

/// Builds A/AAAA/PTR answers from the zone configuration and, in docker
/// mode, a live inventory.
#[derive(Debug, Clone)]
pub struct RecordSynthesizer {
    zone: ZoneConfig,
    source: Source,
}

impl RecordSynthesizer {
    /// Answers computed purely from the address encoding.
    pub fn rdns(zone: ZoneConfig) -> Self {
        Self {
            zone,
            source: Source::Codec,
        }
    }

    /// Answers looked up in an inventory.
    pub fn with_inventory(zone: ZoneConfig, resolver: InventoryResolver) -> Self {
        Self {
            zone,
            source: Source::Inventory(resolver),
        }
    }

    /// The naming rules in use.
    pub fn zone(&self) -> &ZoneConfig {
        &self.zone
    }

    /// Zone apexes this synthesizer can answer under, deduplicated.
    pub fn origins(&self) -> Vec<String> {
        let mut origins = vec![
            reverse::V4_ZONE.to_string(),
            reverse::V6_ZONE.to_string(),
        ];
        for zone in [self.zone.v4.zone(), self.zone.v6.zone()] {
            if !origins.contains(&zone) {
                origins.push(zone);
            }
        }
        origins
    }

    fn naming(&self, family: Family) -> &FamilyNaming {
        match family {
            Family::V4 => &self.zone.v4,
            Family::V6 => &self.zone.v6,
        }
    }

    /// Answer `name`/`rtype`; records carry `dns_class` and the configured TTL.
    pub async fn synthesize(&self, name: &Name, rtype: RecordType, dns_class: DNSClass) -> Outcome {
        let qname = fqdn(&name.to_ascii());

        let result = match rtype {
            RecordType::PTR if reverse::reverse_zone(&qname).is_some() => {
                self.ptr(name, &qname, dns_class).await
            }
            RecordType::AAAA => self.forward(name, &qname, Family::V6, dns_class).await,
            RecordType::A => self.forward(name, &qname, Family::V4, dns_class).await,
            _ => Ok(None),
        };

        match result {
            Ok(Some(records)) => Outcome::Handled(records),
            Ok(None) => {
                trace!(name = %qname, rtype = ?rtype, "not a synthetic query");
                Outcome::NotApplicable
            }
            Err(e) if e.is_fatal() => {
                warn!(name = %qname, rtype = ?rtype, error = %e, "synthesis failed");
                Outcome::Failed(e)
            }
            Err(e) => {
                debug!(name = %qname, rtype = ?rtype, error = %e, "falling through");
                Outcome::NotApplicable
            }
        }
    }

    async fn ptr(
        &self,
        name: &Name,
        qname: &str,
        dns_class: DNSClass,
    ) -> Result<Option<Vec<Record>>, SynthError> {
        let ip = reverse::parse_reverse(qname)?;
        let family = Family::of(&ip);

        let interior = match &self.source {
            Source::Codec => self.zone.codec.encode(ip),
            Source::Inventory(resolver) => match resolver.resolve_by_ip(ip).await? {
                Some(canonical) => canonical,
                None => return Ok(None),
            },
        };

        let target = self.naming(family).decorate(&interior);
        let target = Name::from_ascii(&target)
            .map_err(|e| SynthError::InvalidName(format!("{target}: {e}")))?;

        debug!(%ip, target = %target, "PTR synthesized");
        Ok(Some(vec![self.record(name, dns_class, RData::PTR(PTR(target)))]))
    }

    async fn forward(
        &self,
        name: &Name,
        qname: &str,
        family: Family,
        dns_class: DNSClass,
    ) -> Result<Option<Vec<Record>>, SynthError> {
        let naming = self.naming(family);
        if !naming.matches(qname) {
            return Ok(None);
        }
        let interior = naming.strip(qname)?;

        let ips = match &self.source {
            Source::Codec => vec![self.zone.codec.decode(&interior, family)?],
            Source::Inventory(resolver) => match resolver.resolve_by_name(&interior, family).await? {
                Some(ips) => ips,
                None => return Ok(None),
            },
        };

        debug!(name = %qname, count = ips.len(), "addresses synthesized");
        Ok(Some(
            ips.into_iter()
                .map(|ip| {
                    let rdata = match ip {
                        IpAddr::V4(v4) => RData::A(A::from(v4)),
                        IpAddr::V6(v6) => RData::AAAA(AAAA::from(v6)),
                    };
                    self.record(name, dns_class, rdata)
                })
                .collect(),
        ))
    }

    fn record(&self, name: &Name, dns_class: DNSClass, rdata: RData) -> Record {
        let mut record = Record::from_rdata(name.clone(), self.zone.ttl, rdata);
        record.set_dns_class(dns_class);
        record
    }
}
