//! Reversible text encoding of IP addresses into DNS labels.
//!
//! IPv4 addresses become their four decimal octets joined by the delimiter
//! (`10.0.0.5` → `10-0-0-5`). IPv6 addresses become their RFC 5952 hextets
//! with every `:` replaced by the delimiter (`fe80::5` → `fe80--5`).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::SynthError;

/// Default delimiter between address components.
pub const DEFAULT_DELIMITER: char = '-';

/// Address family of a query or attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// IPv4 (`A`, `in-addr.arpa`).
    V4,
    /// IPv6 (`AAAA`, `ip6.arpa`).
    V6,
}

impl Family {
    /// Family of the given address.
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

/// Stateless encoder/decoder between addresses and synthetic labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressCodec {
    delimiter: char,
}

impl Default for AddressCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl AddressCodec {
    /// Create a codec with the given delimiter.
    ///
    /// Use [`AddressCodec::is_valid_delimiter`] to check the delimiter first;
    /// `.`, `:` and hex digits make the encoding ambiguous.
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Whether `delimiter` can separate address components without colliding
    /// with label separators or address digits.
    pub fn is_valid_delimiter(delimiter: char) -> bool {
        delimiter.is_ascii_graphic()
            && delimiter != '.'
            && delimiter != ':'
            && !delimiter.is_ascii_hexdigit()
    }

    /// The configured delimiter.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Encode an address of either family.
    pub fn encode(&self, ip: IpAddr) -> String {
        match ip {
            IpAddr::V4(v4) => self.encode_v4(v4),
            IpAddr::V6(v6) => self.encode_v6(v6),
        }
    }

    /// Decode `text` as an address of `family`.
    pub fn decode(&self, text: &str, family: Family) -> Result<IpAddr, SynthError> {
        match family {
            Family::V4 => self.decode_v4(text).map(IpAddr::V4),
            Family::V6 => self.decode_v6(text).map(IpAddr::V6),
        }
    }

    /// `10.0.0.5` → `10-0-0-5`.
    pub fn encode_v4(&self, addr: Ipv4Addr) -> String {
        let [a, b, c, d] = addr.octets();
        let sep = self.delimiter;
        format!("{a}{sep}{b}{sep}{c}{sep}{d}")
    }

    /// `2001:db8::` → `2001-db8--0`.
    ///
    /// A trailing `::` gets a terminal `0` so the label never ends in the
    /// delimiter; [`AddressCodec::decode_v6`] accepts both forms.
    pub fn encode_v6(&self, addr: Ipv6Addr) -> String {
        let mut out = canonical_v6(&addr).replace(':', &self.delimiter.to_string());
        if out.ends_with(self.delimiter) {
            out.push('0');
        }
        out
    }

    /// `10-0-0-5` → `10.0.0.5`.
    pub fn decode_v4(&self, text: &str) -> Result<Ipv4Addr, SynthError> {
        let dotted = text.replace(self.delimiter, ".");
        match dotted.parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => Ok(v4),
            _ => Err(SynthError::MalformedAddress(text.to_string())),
        }
    }

    /// `fe80--5` → `fe80::5`.
    pub fn decode_v6(&self, text: &str) -> Result<Ipv6Addr, SynthError> {
        let mut buf = text.to_string();
        if buf.ends_with(self.delimiter) {
            buf.push('0');
        }
        let colons = buf.replace(self.delimiter, ":");
        match colons.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => Ok(v6),
            _ => Err(SynthError::MalformedAddress(text.to_string())),
        }
    }
}

/// RFC 5952 text form using hextets only.
///
/// Matches `Ipv6Addr`'s `Display` except that IPv4-mapped and -compatible
/// addresses keep hex notation, since a dotted quad cannot sit in one label.
fn canonical_v6(addr: &Ipv6Addr) -> String {
    let segments = addr.segments();

    // Longest run of zero hextets, leftmost on ties, at least two long.
    let mut best_start = 0usize;
    let mut best_len = 0usize;
    let mut i = 0usize;
    while i < segments.len() {
        if segments[i] == 0 {
            let start = i;
            while i < segments.len() && segments[i] == 0 {
                i += 1;
            }
            if i - start > best_len {
                best_start = start;
                best_len = i - start;
            }
        } else {
            i += 1;
        }
    }

    let mut out = String::with_capacity(39);
    if best_len < 2 {
        for (idx, seg) in segments.iter().enumerate() {
            if idx > 0 {
                out.push(':');
            }
            out.push_str(&format!("{seg:x}"));
        }
        return out;
    }

    for (idx, seg) in segments[..best_start].iter().enumerate() {
        if idx > 0 {
            out.push(':');
        }
        out.push_str(&format!("{seg:x}"));
    }
    out.push_str("::");
    for (idx, seg) in segments[best_start + best_len..].iter().enumerate() {
        if idx > 0 {
            out.push(':');
        }
        out.push_str(&format!("{seg:x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> AddressCodec {
        AddressCodec::default()
    }

    #[test]
    fn test_encode_v4_keeps_address_order() {
        assert_eq!(codec().encode_v4("10.0.0.5".parse().unwrap()), "10-0-0-5");
        assert_eq!(
            codec().encode_v4("192.168.1.254".parse().unwrap()),
            "192-168-1-254"
        );
    }

    #[test]
    fn test_decode_v4() {
        assert_eq!(
            codec().decode_v4("10-0-0-5").unwrap(),
            "10.0.0.5".parse::<Ipv4Addr>().unwrap()
        );
    }

    #[test]
    fn test_decode_v4_rejects_garbage() {
        assert!(matches!(
            codec().decode_v4("10-0-0"),
            Err(SynthError::MalformedAddress(_))
        ));
        assert!(matches!(
            codec().decode_v4("10-0-0-256"),
            Err(SynthError::MalformedAddress(_))
        ));
        assert!(matches!(
            codec().decode_v4("www"),
            Err(SynthError::MalformedAddress(_))
        ));
    }

    #[test]
    fn test_decode_v4_rejects_v6_text() {
        assert!(matches!(
            codec().decode_v4("fe80--5"),
            Err(SynthError::MalformedAddress(_))
        ));
    }

    #[test]
    fn test_decode_v6_rejects_v4_text() {
        assert!(matches!(
            codec().decode_v6("10-0-0-5"),
            Err(SynthError::MalformedAddress(_))
        ));
    }

    #[test]
    fn test_encode_v6_compresses_zero_run() {
        assert_eq!(codec().encode_v6("fe80::5".parse().unwrap()), "fe80--5");
        assert_eq!(codec().encode_v6("::1".parse().unwrap()), "--1");
    }

    #[test]
    fn test_encode_v6_trailing_compression_gets_terminal_zero() {
        assert_eq!(
            codec().encode_v6("2001:db8::".parse().unwrap()),
            "2001-db8--0"
        );
        assert_eq!(codec().encode_v6("::".parse().unwrap()), "--0");
    }

    #[test]
    fn test_decode_v6_accepts_trailing_delimiter() {
        assert_eq!(
            codec().decode_v6("2001-db8--").unwrap(),
            "2001:db8::".parse::<Ipv6Addr>().unwrap()
        );
    }

    #[test]
    fn test_encode_v6_single_zero_not_compressed() {
        assert_eq!(
            codec().encode_v6("2001:db8:0:1:1:1:1:1".parse().unwrap()),
            "2001-db8-0-1-1-1-1-1"
        );
    }

    #[test]
    fn test_encode_v6_mapped_stays_hex() {
        let encoded = codec().encode_v6("::ffff:1.2.3.4".parse().unwrap());
        assert_eq!(encoded, "--ffff-102-304");
        assert!(!encoded.contains('.'));
    }

    #[test]
    fn test_canonical_v6_matches_display_for_plain_addresses() {
        for text in [
            "2001:db8::1",
            "fe80::5",
            "2001:db8:0:0:1:0:0:1",
            "1:2:3:4:5:6:7:8",
            "fd00:0:0:1:aaaa:bbbb:0:1",
        ] {
            let addr: Ipv6Addr = text.parse().unwrap();
            assert_eq!(canonical_v6(&addr), addr.to_string(), "{text}");
        }
    }

    #[test]
    fn test_round_trip_v4() {
        for text in ["0.0.0.0", "10.0.0.5", "127.0.0.1", "255.255.255.255"] {
            let addr: Ipv4Addr = text.parse().unwrap();
            assert_eq!(codec().decode_v4(&codec().encode_v4(addr)).unwrap(), addr);
        }
    }

    #[test]
    fn test_round_trip_v6() {
        for text in [
            "::",
            "::1",
            "2001:db8::",
            "fe80::5",
            "::ffff:1.2.3.4",
            "2001:db8:85a3:8d3:1319:8a2e:370:7348",
            "fd00:0:0:1:aaaa:bbbb:0:1",
        ] {
            let addr: Ipv6Addr = text.parse().unwrap();
            assert_eq!(
                codec().decode_v6(&codec().encode_v6(addr)).unwrap(),
                addr,
                "{text}"
            );
        }
    }

    #[test]
    fn test_custom_delimiter() {
        let codec = AddressCodec::new('x');
        assert_eq!(codec.encode_v4("10.0.0.5".parse().unwrap()), "10x0x0x5");
        assert_eq!(
            codec.decode_v4("10x0x0x5").unwrap(),
            "10.0.0.5".parse::<Ipv4Addr>().unwrap()
        );
    }

    #[test]
    fn test_delimiter_validation() {
        assert!(AddressCodec::is_valid_delimiter('-'));
        assert!(AddressCodec::is_valid_delimiter('x'));
        assert!(!AddressCodec::is_valid_delimiter('.'));
        assert!(!AddressCodec::is_valid_delimiter(':'));
        assert!(!AddressCodec::is_valid_delimiter('a'));
        assert!(!AddressCodec::is_valid_delimiter('7'));
        assert!(!AddressCodec::is_valid_delimiter(' '));
    }

    #[test]
    fn test_family_of() {
        assert_eq!(Family::of(&"10.0.0.1".parse().unwrap()), Family::V4);
        assert_eq!(Family::of(&"::1".parse().unwrap()), Family::V6);
    }
}
