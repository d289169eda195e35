//! Reverse-zone (`in-addr.arpa` / `ip6.arpa`) name parsing.
//!
//! ```text
//! 5.0.0.10.in-addr.arpa.          → 10.0.0.5
//! 5.0.0.0.(…28 more…).8.e.f.ip6.arpa. → fe80::5
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::SynthError;
use crate::matcher::fqdn;

/// IPv4 reverse zone apex.
pub const V4_ZONE: &str = "in-addr.arpa.";
/// IPv6 reverse zone apex.
pub const V6_ZONE: &str = "ip6.arpa.";

const V4_LABELS: usize = 4;
const V6_LABELS: usize = 32;

/// Which reverse zone a query name falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverseZone {
    /// `in-addr.arpa.`
    V4,
    /// `ip6.arpa.`
    V6,
}

/// Classify `name` by reverse zone suffix, if any.
pub fn reverse_zone(name: &str) -> Option<ReverseZone> {
    let name = fqdn(name);
    if name.ends_with(&format!(".{V4_ZONE}")) {
        Some(ReverseZone::V4)
    } else if name.ends_with(&format!(".{V6_ZONE}")) {
        Some(ReverseZone::V6)
    } else {
        None
    }
}

/// Parse a name under either reverse zone.
pub fn parse_reverse(name: &str) -> Result<IpAddr, SynthError> {
    match reverse_zone(name) {
        Some(ReverseZone::V4) => parse_v4_reverse(name).map(IpAddr::V4),
        Some(ReverseZone::V6) => parse_v6_reverse(name).map(IpAddr::V6),
        None => Err(SynthError::MalformedReverseName(name.to_string())),
    }
}

/// Labels between the start of `name` and `.zone`, in query order.
fn zone_labels(name: &str, zone: &str) -> Option<Vec<String>> {
    let name = fqdn(name);
    let interior = name.strip_suffix(zone)?.strip_suffix('.')?;
    Some(interior.split('.').map(str::to_string).collect())
}

/// `5.0.0.10.in-addr.arpa.` → `10.0.0.5`.
pub fn parse_v4_reverse(name: &str) -> Result<Ipv4Addr, SynthError> {
    let malformed = || SynthError::MalformedReverseName(name.to_string());
    let labels = zone_labels(name, V4_ZONE).ok_or_else(malformed)?;
    if labels.len() != V4_LABELS {
        return Err(malformed());
    }

    let mut octets = [0u8; V4_LABELS];
    for i in 0..V4_LABELS {
        let label = &labels[V4_LABELS - 1 - i];
        if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        octets[i] = label.parse::<u8>().map_err(|_| malformed())?;
    }

    Ok(Ipv4Addr::from(octets))
}

/// 32 nibble labels under `ip6.arpa.` → IPv6 address.
pub fn parse_v6_reverse(name: &str) -> Result<Ipv6Addr, SynthError> {
    let malformed = || SynthError::MalformedReverseName(name.to_string());
    let labels = zone_labels(name, V6_ZONE).ok_or_else(malformed)?;
    if labels.len() != V6_LABELS {
        return Err(malformed());
    }

    // Most significant nibble first after reversal.
    let mut nibbles = [0u8; V6_LABELS];
    for i in 0..V6_LABELS {
        let label = labels[V6_LABELS - 1 - i].as_bytes();
        if label.len() != 1 {
            return Err(malformed());
        }
        nibbles[i] = match (label[0] as char).to_digit(16) {
            Some(n) => n as u8,
            None => return Err(malformed()),
        };
    }

    let mut segments = [0u16; 8];
    for (seg, chunk) in segments.iter_mut().zip(nibbles.chunks_exact(4)) {
        *seg = (chunk[0] as u16) << 12
            | (chunk[1] as u16) << 8
            | (chunk[2] as u16) << 4
            | chunk[3] as u16;
    }

    Ok(Ipv6Addr::from(segments))
}

/// Render the reverse query name for `ip`.
pub fn reverse_name(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.{V4_ZONE}", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let mut out = String::with_capacity(V6_LABELS * 2 + V6_ZONE.len());
            for byte in v6.octets().iter().rev() {
                out.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
            }
            out.push_str(V6_ZONE);
            out
        }
    }
}
