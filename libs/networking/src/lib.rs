//! Network perimeter model for the platform.
//!
//! This library provides:
//! - IPv4 CIDR parsing and containment checks
//! - Protocol and port-range validation for inbound allow rules
//! - The `NetworkPerimeter`: an address block plus an inbound allow-list
//!
//! # Invariants
//!
//! - Inbound traffic is denied by default; outbound is allowed by default
//! - Every allow rule is validated at construction time, never at deploy time

use std::net::Ipv4Addr;
use std::str::FromStr;

use spotgrid_id::PerimeterName;
use thiserror::Error;

/// Networking errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Invalid IP address.
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    /// Invalid CIDR prefix.
    #[error("invalid CIDR prefix: {0}")]
    InvalidPrefix(String),

    /// Unknown protocol name.
    #[error("unknown protocol: {0} (expected tcp, udp, or icmp)")]
    UnknownProtocol(String),

    /// Invalid port or port range.
    #[error("invalid port range: {0}")]
    InvalidPortRange(String),

    /// Invalid ingress source specification.
    #[error("invalid ingress source: {0}")]
    InvalidSource(String),

    /// Rule shape does not match the protocol.
    #[error("invalid ingress rule: {0}")]
    InvalidRule(String),
}

// ============================================================================
// IPv4 CIDR
// ============================================================================

/// An IPv4 CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    /// Base address of the block (host bits masked off).
    address: Ipv4Addr,

    /// Prefix length (e.g., 16 for /16).
    prefix_len: u8,
}

impl Ipv4Cidr {
    /// Create a new CIDR block.
    ///
    /// Host bits below the prefix are masked off.
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, NetworkError> {
        if prefix_len > 32 {
            return Err(NetworkError::InvalidPrefix(format!(
                "prefix length {} exceeds 32",
                prefix_len
            )));
        }

        Ok(Self {
            address: mask_ipv4(address, prefix_len),
            prefix_len,
        })
    }

    /// Parse from CIDR notation (e.g., "10.0.0.0/16").
    pub fn from_cidr(s: &str) -> Result<Self, NetworkError> {
        let Some((addr_str, prefix_str)) = s.split_once('/') else {
            return Err(NetworkError::InvalidPrefix(format!(
                "missing '/' in CIDR: {}",
                s
            )));
        };

        let address = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidPrefix(prefix_str.to_string()))?;

        Self::new(address, prefix_len)
    }

    /// Check if an address is within this block.
    #[must_use]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        mask_ipv4(addr, self.prefix_len) == self.address
    }

    /// Base address of the block.
    #[must_use]
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Prefix length.
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of addresses in this block.
    #[must_use]
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_len)
    }
}

impl std::fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cidr(s)
    }
}

/// Mask an IPv4 address to a prefix length.
fn mask_ipv4(addr: Ipv4Addr, prefix_len: u8) -> Ipv4Addr {
    let bits = u32::from_be_bytes(addr.octets());
    let mask = if prefix_len == 0 {
        0
    } else if prefix_len >= 32 {
        u32::MAX
    } else {
        u32::MAX << (32 - prefix_len)
    };
    Ipv4Addr::from((bits & mask).to_be_bytes())
}

// ============================================================================
// Protocols and Ports
// ============================================================================

/// Transport protocol for an ingress rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
}

impl Protocol {
    /// Protocol name in lowercase.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "icmp" => Ok(Protocol::Icmp),
            other => Err(NetworkError::UnknownProtocol(other.to_string())),
        }
    }
}

/// An inclusive port range.
///
/// Port 0 is reserved and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRange {
    from: u16,
    to: u16,
}

impl PortRange {
    /// Create a range covering a single port.
    pub fn single(port: u16) -> Result<Self, NetworkError> {
        Self::new(port, port)
    }

    /// Create an inclusive range.
    pub fn new(from: u16, to: u16) -> Result<Self, NetworkError> {
        if from == 0 {
            return Err(NetworkError::InvalidPortRange(
                "port 0 is reserved".to_string(),
            ));
        }
        if from > to {
            return Err(NetworkError::InvalidPortRange(format!(
                "{}-{} is inverted",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Parse from "22" or "1024-2048".
    pub fn parse(s: &str) -> Result<Self, NetworkError> {
        if let Some((from_str, to_str)) = s.split_once('-') {
            let from = from_str
                .trim()
                .parse::<u16>()
                .map_err(|_| NetworkError::InvalidPortRange(s.to_string()))?;
            let to = to_str
                .trim()
                .parse::<u16>()
                .map_err(|_| NetworkError::InvalidPortRange(s.to_string()))?;
            Self::new(from, to)
        } else {
            let port = s
                .trim()
                .parse::<u16>()
                .map_err(|_| NetworkError::InvalidPortRange(s.to_string()))?;
            Self::single(port)
        }
    }

    /// First port in the range.
    #[must_use]
    pub fn from_port(&self) -> u16 {
        self.from
    }

    /// Last port in the range.
    #[must_use]
    pub fn to_port(&self) -> u16 {
        self.to
    }

    /// Check if a port is within the range.
    #[must_use]
    pub fn contains(&self, port: u16) -> bool {
        (self.from..=self.to).contains(&port)
    }
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

// ============================================================================
// Ingress Rules
// ============================================================================

/// Source specification for an ingress rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngressSource {
    /// Any IPv4 source (0.0.0.0/0).
    AnyIpv4,

    /// A specific CIDR block.
    Cidr(Ipv4Cidr),
}

impl IngressSource {
    /// Parse from "any" or CIDR notation.
    pub fn parse(s: &str) -> Result<Self, NetworkError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(IngressSource::AnyIpv4);
        }
        if !s.contains('/') {
            return Err(NetworkError::InvalidSource(format!(
                "expected 'any' or CIDR notation, got '{}'",
                s
            )));
        }
        Ok(IngressSource::Cidr(Ipv4Cidr::from_cidr(s)?))
    }
}

impl std::fmt::Display for IngressSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngressSource::AnyIpv4 => write!(f, "0.0.0.0/0"),
            IngressSource::Cidr(cidr) => write!(f, "{}", cidr),
        }
    }
}

/// A validated inbound allow rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    source: IngressSource,
    protocol: Protocol,
    ports: Option<PortRange>,
    description: Option<String>,
}

impl IngressRule {
    /// Create a TCP or UDP rule with a port range.
    pub fn new(
        source: IngressSource,
        protocol: Protocol,
        ports: PortRange,
    ) -> Result<Self, NetworkError> {
        if protocol == Protocol::Icmp {
            return Err(NetworkError::InvalidRule(
                "icmp rules carry no port range".to_string(),
            ));
        }
        Ok(Self {
            source,
            protocol,
            ports: Some(ports),
            description: None,
        })
    }

    /// Create an ICMP rule (no ports).
    #[must_use]
    pub fn icmp(source: IngressSource) -> Self {
        Self {
            source,
            protocol: Protocol::Icmp,
            ports: None,
            description: None,
        }
    }

    /// Attach a human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The rule's source.
    #[must_use]
    pub fn source(&self) -> IngressSource {
        self.source
    }

    /// The rule's protocol.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The rule's port range, if the protocol carries one.
    #[must_use]
    pub fn ports(&self) -> Option<PortRange> {
        self.ports
    }

    /// The rule's description, if set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

// ============================================================================
// Network Perimeter
// ============================================================================

/// A network segment plus an inbound allow-list.
///
/// The perimeter denies inbound traffic by default and allows outbound by
/// default; `allow_inbound` is the only way to widen it.
#[derive(Debug, Clone)]
pub struct NetworkPerimeter {
    name: PerimeterName,
    address_block: Ipv4Cidr,
    allowed_inbound: Vec<IngressRule>,
}

impl NetworkPerimeter {
    /// Create a perimeter with no inbound rules.
    #[must_use]
    pub fn new(name: PerimeterName, address_block: Ipv4Cidr) -> Self {
        Self {
            name,
            address_block,
            allowed_inbound: Vec::new(),
        }
    }

    /// Append a validated inbound allow rule.
    #[must_use]
    pub fn allow_inbound(mut self, rule: IngressRule) -> Self {
        self.allowed_inbound.push(rule);
        self
    }

    /// The perimeter's stable name.
    #[must_use]
    pub fn name(&self) -> &PerimeterName {
        &self.name
    }

    /// The perimeter's address block.
    #[must_use]
    pub fn address_block(&self) -> Ipv4Cidr {
        self.address_block
    }

    /// The inbound allow-list, in declaration order.
    #[must_use]
    pub fn allowed_inbound(&self) -> &[IngressRule] {
        &self.allowed_inbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_cidr() {
        let cidr = Ipv4Cidr::from_cidr("10.0.0.0/16").unwrap();
        assert_eq!(cidr.prefix_len(), 16);
        assert_eq!(cidr.size(), 65536);

        assert!(cidr.contains("10.0.42.1".parse().unwrap()));
        assert!(!cidr.contains("10.1.0.1".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_cidr_masks_host_bits() {
        let cidr = Ipv4Cidr::from_cidr("10.0.3.7/16").unwrap();
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
    }

    #[test]
    fn test_ipv4_cidr_rejects_bad_input() {
        assert!(Ipv4Cidr::from_cidr("10.0.0.0").is_err());
        assert!(Ipv4Cidr::from_cidr("10.0.0.0/33").is_err());
        assert!(Ipv4Cidr::from_cidr("300.0.0.0/8").is_err());
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!("tcp".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!("UDP".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert!(matches!(
            "gre".parse::<Protocol>(),
            Err(NetworkError::UnknownProtocol(_))
        ));
    }

    #[test]
    fn test_port_range() {
        let single = PortRange::parse("22").unwrap();
        assert_eq!(single.from_port(), 22);
        assert_eq!(single.to_port(), 22);
        assert_eq!(single.to_string(), "22");

        let range = PortRange::parse("1024-2048").unwrap();
        assert!(range.contains(1500));
        assert!(!range.contains(2049));
        assert_eq!(range.to_string(), "1024-2048");
    }

    #[test]
    fn test_port_range_rejects_bad_input() {
        assert!(PortRange::parse("0").is_err());
        assert!(PortRange::new(2048, 1024).is_err());
        assert!(PortRange::parse("http").is_err());
        assert!(PortRange::parse("70000").is_err());
    }

    #[test]
    fn test_ingress_source_parse() {
        assert_eq!(
            IngressSource::parse("any").unwrap(),
            IngressSource::AnyIpv4
        );
        assert_eq!(IngressSource::AnyIpv4.to_string(), "0.0.0.0/0");

        let cidr = IngressSource::parse("192.168.0.0/24").unwrap();
        assert!(matches!(cidr, IngressSource::Cidr(_)));

        assert!(IngressSource::parse("192.168.0.1").is_err());
    }

    #[test]
    fn test_ingress_rule_icmp_has_no_ports() {
        let result = IngressRule::new(
            IngressSource::AnyIpv4,
            Protocol::Icmp,
            PortRange::single(22).unwrap(),
        );
        assert!(matches!(result, Err(NetworkError::InvalidRule(_))));

        let rule = IngressRule::icmp(IngressSource::AnyIpv4);
        assert_eq!(rule.ports(), None);
    }

    #[test]
    fn test_perimeter_default_deny() {
        let name = PerimeterName::new("batch-perimeter").unwrap();
        let perimeter = NetworkPerimeter::new(name, Ipv4Cidr::from_cidr("10.0.0.0/16").unwrap());
        assert!(perimeter.allowed_inbound().is_empty());
    }

    #[test]
    fn test_perimeter_allow_inbound() {
        let name = PerimeterName::new("batch-perimeter").unwrap();
        let ssh = IngressRule::new(
            IngressSource::AnyIpv4,
            Protocol::Tcp,
            PortRange::single(22).unwrap(),
        )
        .unwrap()
        .with_description("SSH from anywhere");

        let perimeter = NetworkPerimeter::new(name, Ipv4Cidr::from_cidr("10.0.0.0/16").unwrap())
            .allow_inbound(ssh);

        assert_eq!(perimeter.allowed_inbound().len(), 1);
        assert_eq!(
            perimeter.allowed_inbound()[0].description(),
            Some("SSH from anywhere")
        );
    }
}
