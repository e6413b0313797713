//! CIDR operations for subnet bookkeeping
//!
//! Provides utilities for working with administrator-defined subnets:
//! - Parse and validate CIDR notation (e.g., "192.168.1.0/24")
//! - Enumerate every usable host address in a block
//! - Join the host list against asset IP links ([`view`])
//!
//! Only prefixes /20 through /32 are accepted, which caps an expansion at
//! 4094 addresses.
//!
//! # Examples
//!
//! ```
//! use assetnet_cidr::Cidr;
//!
//! let cidr = Cidr::parse("192.168.1.0/24").unwrap();
//! assert_eq!(cidr.prefix_len(), 24);
//! assert_eq!(cidr.network(), 0xC0A80100); // 192.168.1.0
//! assert_eq!(cidr.usable_hosts(), 254);
//! assert!(cidr.contains(0xC0A80101)); // 192.168.1.1
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod view;

pub use view::{join_addresses, AddressRow, LinkedIp, SubnetView, Utilization};

/// Smallest accepted prefix length
pub const MIN_PREFIX_LEN: u8 = 20;
/// Largest accepted prefix length
pub const MAX_PREFIX_LEN: u8 = 32;

/// CIDR errors
///
/// Every variant is an "invalid CIDR" rejection; the variant only records why.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    /// Not of the form a.b.c.d/n
    #[error("invalid CIDR: {0}")]
    InvalidNotation(String),

    /// An octet above 255
    #[error("invalid CIDR: octet {0} is out of range")]
    InvalidOctet(u16),

    /// Prefix outside the accepted window
    #[error("invalid CIDR: prefix /{0} must be between /20 and /32")]
    PrefixOutOfRange(u8),

    /// Host bits are set in the address
    #[error("invalid CIDR: {given} is not a network address (did you mean {network}?)")]
    NotNetworkAddress { given: String, network: String },

    /// A single address failed to parse
    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),
}

impl CidrError {
    /// True for rejections of a CIDR string, as opposed to a bare address
    pub fn is_invalid_cidr(&self) -> bool {
        !matches!(self, CidrError::InvalidIpAddress(_))
    }
}

pub type Result<T> = std::result::Result<T, CidrError>;

/// Validated CIDR block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    /// Network address (base IP)
    network: u32,
    /// Prefix length (20-32)
    prefix_len: u8,
    /// Network mask
    mask: u32,
}

impl Cidr {
    /// Parse and validate CIDR notation
    ///
    /// The address must be the canonical network address of the block:
    /// "192.168.1.5/24" is rejected rather than silently masked.
    ///
    /// # Examples
    ///
    /// ```
    /// use assetnet_cidr::Cidr;
    ///
    /// assert!(Cidr::parse("10.0.0.0/30").is_ok());
    /// assert!(Cidr::parse("10.0.0.0/8").is_err());
    /// assert!(Cidr::parse("192.168.1.5/24").is_err());
    /// ```
    pub fn parse(cidr: &str) -> Result<Self> {
        let (ip_str, prefix_str) = cidr.split_once('/').ok_or_else(|| {
            CidrError::InvalidNotation(format!("expected a.b.c.d/prefix, got {:?}", cidr))
        })?;

        let octets = parse_octets(ip_str)
            .ok_or_else(|| CidrError::InvalidNotation(format!("malformed address {:?}", ip_str)))?;
        if !is_decimal(prefix_str, 2) {
            return Err(CidrError::InvalidNotation(format!(
                "malformed prefix {:?}",
                prefix_str
            )));
        }

        let mut address = 0u32;
        for (i, octet) in octets.iter().enumerate() {
            if *octet > 255 {
                return Err(CidrError::InvalidOctet(*octet));
            }
            address |= (*octet as u32) << (24 - i * 8);
        }

        let prefix_len: u8 = prefix_str
            .parse()
            .map_err(|_| CidrError::InvalidNotation(format!("malformed prefix {:?}", prefix_str)))?;

        let cidr = Self::new(address, prefix_len)?;
        if cidr.network != address {
            return Err(CidrError::NotNetworkAddress {
                given: format_ipv4(address),
                network: cidr.to_string(),
            });
        }

        Ok(cidr)
    }

    /// Create a CIDR from a network address and prefix length
    ///
    /// Host bits in `network` are cleared.
    pub fn new(network: u32, prefix_len: u8) -> Result<Self> {
        if !(MIN_PREFIX_LEN..=MAX_PREFIX_LEN).contains(&prefix_len) {
            return Err(CidrError::PrefixOutOfRange(prefix_len));
        }

        let mask = mask_for(prefix_len);

        Ok(Self {
            network: network & mask,
            prefix_len,
            mask,
        })
    }

    /// Get network address
    pub fn network(&self) -> u32 {
        self.network
    }

    /// Get prefix length
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Get network mask
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Get broadcast address
    pub fn broadcast(&self) -> u32 {
        self.network | !self.mask
    }

    /// Total number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_len)
    }

    /// Number of usable host addresses
    ///
    /// Network and broadcast addresses are excluded, so a /31 has none.
    /// A /32 is a point address and counts as one host.
    pub fn usable_hosts(&self) -> u32 {
        if self.prefix_len == 32 {
            1
        } else {
            (self.size() - 2) as u32
        }
    }

    /// Check if IP address is in this CIDR block
    pub fn contains(&self, ip: u32) -> bool {
        (ip & self.mask) == self.network
    }

    /// Iterate over usable host addresses in ascending order
    pub fn hosts(&self) -> HostIter {
        HostIter::new(*self)
    }

    /// Render every usable host as a dotted quad
    pub fn expand(&self) -> Vec<String> {
        self.hosts().map(format_ipv4).collect()
    }

    /// Describe the block with addresses rendered as dotted quads
    pub fn analyze(&self) -> CidrAnalysis {
        let mut hosts = self.hosts();
        let first_usable = hosts.next().map(format_ipv4);
        let last_usable = hosts.last().map(format_ipv4).or_else(|| first_usable.clone());

        CidrAnalysis {
            cidr: self.to_string(),
            network: format_ipv4(self.network),
            broadcast: format_ipv4(self.broadcast()),
            mask: format_ipv4(self.mask),
            prefix_len: self.prefix_len,
            total_addresses: self.size(),
            usable_hosts: self.usable_hosts(),
            first_usable,
            last_usable,
        }
    }
}

/// Summary of a CIDR block; `first_usable`/`last_usable` are `None` for a /31
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidrAnalysis {
    pub cidr: String,
    pub network: String,
    pub broadcast: String,
    pub mask: String,
    pub prefix_len: u8,
    pub total_addresses: u64,
    pub usable_hosts: u32,
    pub first_usable: Option<String>,
    pub last_usable: Option<String>,
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", format_ipv4(self.network), self.prefix_len)
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self> {
        Cidr::parse(s)
    }
}

impl TryFrom<String> for Cidr {
    type Error = CidrError;

    fn try_from(value: String) -> Result<Self> {
        Cidr::parse(&value)
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}

/// Iterator over the usable hosts of a CIDR block
pub struct HostIter {
    base: u32,
    next_offset: u32,
    last_offset: u32,
}

impl HostIter {
    fn new(cidr: Cidr) -> Self {
        if cidr.prefix_len() == 32 {
            // The point address itself
            Self {
                base: cidr.network(),
                next_offset: 0,
                last_offset: 0,
            }
        } else {
            Self {
                base: cidr.network(),
                next_offset: 1,
                // Empty when usable_hosts is 0 (/31)
                last_offset: cidr.usable_hosts(),
            }
        }
    }
}

impl Iterator for HostIter {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_offset <= self.last_offset {
            let ip = self.base.wrapping_add(self.next_offset);
            self.next_offset += 1;
            Some(ip)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last_offset + 1).saturating_sub(self.next_offset) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for HostIter {}

/// Parse and expand a CIDR string in one step
pub fn expand_cidr(cidr: &str) -> Result<Vec<String>> {
    Ok(Cidr::parse(cidr)?.expand())
}

/// Parse a dotted-quad IPv4 address to u32
pub fn parse_ipv4(ip: &str) -> Result<u32> {
    let octets =
        parse_octets(ip).ok_or_else(|| CidrError::InvalidIpAddress(ip.to_string()))?;

    let mut result = 0u32;
    for (i, octet) in octets.iter().enumerate() {
        if *octet > 255 {
            return Err(CidrError::InvalidIpAddress(ip.to_string()));
        }
        result |= (*octet as u32) << (24 - i * 8);
    }

    Ok(result)
}

/// Render a u32 as a dotted-quad IPv4 address
pub fn format_ipv4(ip: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (ip >> 24) & 0xFF,
        (ip >> 16) & 0xFF,
        (ip >> 8) & 0xFF,
        ip & 0xFF
    )
}

fn mask_for(prefix_len: u8) -> u32 {
    if prefix_len >= 32 {
        u32::MAX
    } else {
        !(u32::MAX >> prefix_len)
    }
}

/// Split four 1-3 digit groups; range is checked by the caller
fn parse_octets(ip: &str) -> Option<[u16; 4]> {
    let mut octets = [0u16; 4];
    let mut parts = ip.split('.');
    for slot in octets.iter_mut() {
        let part = parts.next()?;
        if !is_decimal(part, 3) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

fn is_decimal(s: &str, max_digits: usize) -> bool {
    !s.is_empty() && s.len() <= max_digits && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze() {
        let analysis = Cidr::parse("10.1.4.0/22").unwrap().analyze();
        assert_eq!(analysis.network, "10.1.4.0");
        assert_eq!(analysis.broadcast, "10.1.7.255");
        assert_eq!(analysis.mask, "255.255.252.0");
        assert_eq!(analysis.total_addresses, 1024);
        assert_eq!(analysis.usable_hosts, 1022);
        assert_eq!(analysis.first_usable.as_deref(), Some("10.1.4.1"));
        assert_eq!(analysis.last_usable.as_deref(), Some("10.1.7.254"));

        let point = Cidr::parse("10.0.0.5/32").unwrap().analyze();
        assert_eq!(point.first_usable.as_deref(), Some("10.0.0.5"));
        assert_eq!(point.last_usable.as_deref(), Some("10.0.0.5"));

        let pair = Cidr::parse("10.0.0.4/31").unwrap().analyze();
        assert_eq!(pair.usable_hosts, 0);
        assert_eq!(pair.first_usable, None);
        assert_eq!(pair.last_usable, None);
    }

    #[test]
    fn test_parse_cidr() {
        let cidr = Cidr::parse("192.168.1.0/24").unwrap();
        assert_eq!(cidr.network(), 0xC0A80100);
        assert_eq!(cidr.prefix_len(), 24);
        assert_eq!(cidr.mask(), 0xFFFFFF00);
    }

    #[test]
    fn test_parse_cidr_slash_20() {
        let cidr = Cidr::parse("10.20.16.0/20").unwrap();
        assert_eq!(cidr.network(), 0x0A141000);
        assert_eq!(cidr.usable_hosts(), 4094);
    }

    #[test]
    fn test_parse_invalid_notation() {
        assert!(matches!(
            Cidr::parse("not-a-cidr"),
            Err(CidrError::InvalidNotation(_))
        ));
        assert!(matches!(
            Cidr::parse("192.168.1.0"),
            Err(CidrError::InvalidNotation(_))
        ));
        assert!(matches!(
            Cidr::parse("192.168.1/24"),
            Err(CidrError::InvalidNotation(_))
        ));
        assert!(matches!(
            Cidr::parse("192.168.1.0.0/24"),
            Err(CidrError::InvalidNotation(_))
        ));
        assert!(matches!(
            Cidr::parse(" 192.168.1.0/24"),
            Err(CidrError::InvalidNotation(_))
        ));
        assert!(matches!(
            Cidr::parse("192.168.1.0/+4"),
            Err(CidrError::InvalidNotation(_))
        ));
    }

    #[test]
    fn test_parse_octet_out_of_range() {
        assert_eq!(
            Cidr::parse("999.1.1.0/24").unwrap_err(),
            CidrError::InvalidOctet(999)
        );
    }

    #[test]
    fn test_parse_prefix_out_of_range() {
        assert_eq!(
            Cidr::parse("10.0.0.0/8").unwrap_err(),
            CidrError::PrefixOutOfRange(8)
        );
        assert_eq!(
            Cidr::parse("10.0.0.0/33").unwrap_err(),
            CidrError::PrefixOutOfRange(33)
        );
        assert_eq!(
            Cidr::parse("10.0.0.0/19").unwrap_err(),
            CidrError::PrefixOutOfRange(19)
        );
    }

    #[test]
    fn test_parse_host_bits_set() {
        let err = Cidr::parse("192.168.1.5/24").unwrap_err();
        assert_eq!(
            err,
            CidrError::NotNetworkAddress {
                given: "192.168.1.5".to_string(),
                network: "192.168.1.0/24".to_string(),
            }
        );
        assert!(err.to_string().starts_with("invalid CIDR"));
    }

    #[test]
    fn test_all_rejections_are_invalid_cidr() {
        for input in [
            "192.168.1.5/24",
            "10.0.0.0/8",
            "10.0.0.0/33",
            "999.1.1.0/24",
            "not-a-cidr",
        ] {
            let err = Cidr::parse(input).unwrap_err();
            assert!(err.is_invalid_cidr(), "{} should be an invalid CIDR", input);
        }
    }

    #[test]
    fn test_cidr_contains() {
        let cidr = Cidr::parse("192.168.1.0/24").unwrap();
        assert!(cidr.contains(0xC0A80100)); // 192.168.1.0
        assert!(cidr.contains(0xC0A801FF)); // 192.168.1.255
        assert!(!cidr.contains(0xC0A80001)); // 192.168.0.1
        assert!(!cidr.contains(0xC0A80200)); // 192.168.2.0
    }

    #[test]
    fn test_cidr_broadcast() {
        let cidr = Cidr::parse("192.168.1.0/24").unwrap();
        assert_eq!(cidr.broadcast(), 0xC0A801FF);
    }

    #[test]
    fn test_usable_hosts() {
        assert_eq!(Cidr::parse("192.168.1.0/24").unwrap().usable_hosts(), 254);
        assert_eq!(Cidr::parse("10.0.0.0/30").unwrap().usable_hosts(), 2);
        assert_eq!(Cidr::parse("10.0.0.0/31").unwrap().usable_hosts(), 0);
        assert_eq!(Cidr::parse("10.0.0.5/32").unwrap().usable_hosts(), 1);
    }

    #[test]
    fn test_expand_slash_30() {
        let hosts = expand_cidr("10.0.0.0/30").unwrap();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_expand_slash_32() {
        let hosts = expand_cidr("10.0.0.5/32").unwrap();
        assert_eq!(hosts, vec!["10.0.0.5"]);
    }

    #[test]
    fn test_expand_slash_31_is_empty() {
        let cidr = Cidr::parse("10.0.0.0/31").unwrap();
        assert_eq!(cidr.hosts().len(), 0);
        assert!(cidr.expand().is_empty());
    }

    #[test]
    fn test_expand_top_of_address_space() {
        let hosts = expand_cidr("255.255.255.252/30").unwrap();
        assert_eq!(hosts, vec!["255.255.255.253", "255.255.255.254"]);
    }

    #[test]
    fn test_host_iter_exact_size() {
        let cidr = Cidr::parse("192.168.1.0/24").unwrap();
        let mut iter = cidr.hosts();
        assert_eq!(iter.len(), 254);
        iter.next();
        assert_eq!(iter.len(), 253);
    }

    #[test]
    fn test_cidr_display() {
        let cidr = Cidr::parse("192.168.1.0/24").unwrap();
        assert_eq!(cidr.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn test_cidr_new_masks_host_bits() {
        let cidr = Cidr::new(0xC0A80105, 24).unwrap();
        assert_eq!(cidr.network(), 0xC0A80100);
        assert!(Cidr::new(0x0A000000, 8).is_err());
    }

    #[test]
    fn test_cidr_serde_as_string() {
        let cidr = Cidr::parse("10.1.2.0/23").unwrap();
        let json = serde_json::to_string(&cidr).unwrap();
        assert_eq!(json, "\"10.1.2.0/23\"");

        let back: Cidr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cidr);

        assert!(serde_json::from_str::<Cidr>("\"10.1.2.1/23\"").is_err());
    }

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_ipv4("8.8.8.8").unwrap(), 0x08080808);
        assert_eq!(parse_ipv4("192.168.1.1").unwrap(), 0xC0A80101);
        assert!(parse_ipv4("invalid").is_err());
        assert!(parse_ipv4("256.0.0.1").is_err());
        assert!(parse_ipv4("1.2.3").is_err());
        assert!(!parse_ipv4("1.2.3").unwrap_err().is_invalid_cidr());
    }

    #[test]
    fn test_format_ipv4() {
        assert_eq!(format_ipv4(0xC0A80101), "192.168.1.1");
        assert_eq!(format_ipv4(0), "0.0.0.0");
        assert_eq!(format_ipv4(u32::MAX), "255.255.255.255");
    }
}
