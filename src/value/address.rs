use ipnet::IpNet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use super::{range_parts, tokens, Interval, Ordinal, RangeSet};
use crate::error::ValueError;

/// An IP address on a single total order.
///
/// Every IPv4 address sorts before every IPv6 address; within a family
/// addresses compare as unsigned integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    V4(u32),
    V6(u128),
}

impl Address {
    pub fn is_ipv4(&self) -> bool {
        matches!(self, Address::V4(_))
    }

    pub fn to_ip_addr(self) -> IpAddr {
        match self {
            Address::V4(v) => IpAddr::V4(Ipv4Addr::from(v)),
            Address::V6(v) => IpAddr::V6(Ipv6Addr::from(v)),
        }
    }
}

impl Ordinal for Address {
    const MIN: Self = Address::V4(u32::MIN);
    const MAX: Self = Address::V6(u128::MAX);

    fn successor(self) -> Option<Self> {
        match self {
            Address::V4(u32::MAX) => Some(Address::V6(u128::MIN)),
            Address::V4(v) => Some(Address::V4(v + 1)),
            Address::V6(v) => v.checked_add(1).map(Address::V6),
        }
    }
}

impl From<IpAddr> for Address {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(addr: Ipv4Addr) -> Self {
        Address::V4(u32::from(addr))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(addr: Ipv6Addr) -> Self {
        Address::V6(u128::from(addr))
    }
}

impl FromStr for Address {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<IpAddr>()
            .map(Address::from)
            .map_err(|_| ValueError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ip_addr())
    }
}

/// Set of addresses a rule accepts.
pub type IpValue = RangeSet<Address>;

/// Expand a CIDR expression into the inclusive range it covers.
///
/// Host bits in the address part are ignored: `192.168.42.23/22` covers
/// `192.168.40.0-192.168.43.255`.
pub fn parse_cidr(cidr: &str) -> Result<Interval<Address>, ValueError> {
    let net: IpNet = cidr
        .trim()
        .parse()
        .map_err(|_| ValueError::InvalidCidr(cidr.to_string()))?;
    Interval::new(net.network().into(), net.broadcast().into())
        .ok_or_else(|| ValueError::InvalidCidr(cidr.to_string()))
}

fn parse_range(token: &str, begin: &str, end: &str) -> Result<Interval<Address>, ValueError> {
    if begin.contains('/') || end.contains('/') {
        return Err(ValueError::InvalidRange(token.to_string()));
    }
    let begin: Address = begin.parse()?;
    let end: Address = end.parse()?;
    if begin.is_ipv4() != end.is_ipv4() {
        return Err(ValueError::MixedFamilies(token.to_string()));
    }
    Interval::new(begin, end).ok_or_else(|| ValueError::InvalidRange(token.to_string()))
}

impl RangeSet<Address> {
    /// Parse a comma-separated list of addresses, `A-B` ranges and CIDR expressions.
    pub fn parse(input: &str) -> Result<Self, ValueError> {
        let mut ranges = Vec::new();
        for token in tokens(input)? {
            let range = match range_parts(token)? {
                Some((begin, end)) => parse_range(token, begin, end)?,
                None if token.contains('/') => parse_cidr(token)?,
                None => Interval::point(token.parse()?),
            };
            ranges.push(range);
        }
        Self::from_intervals(ranges).ok_or_else(|| ValueError::Empty(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn range(begin: &str, end: &str) -> Interval<Address> {
        Interval::new(addr(begin), addr(end)).unwrap()
    }

    #[test]
    fn test_family_ordering() {
        assert!(addr("255.255.255.255") < addr("::"));
        assert!(addr("10.0.0.1") < addr("10.0.0.2"));
        assert!(addr("128.0.0.0") > addr("127.255.255.255"));
        assert!(addr("::1") < addr("fe80::1"));
        assert_eq!(addr("255.255.255.255").successor(), Some(addr("::")));
        assert_eq!(Address::MAX.successor(), None);
    }

    #[test]
    fn test_single_value() {
        let value = IpValue::parse("192.168.0.1").unwrap();
        assert!(!value.contains(addr("192.168.0.0")));
        assert!(value.contains(addr("192.168.0.1")));
        assert!(!value.contains(addr("192.168.0.2")));
    }

    #[test]
    fn test_multi_values() {
        let value = IpValue::parse("192.168.0.1, 192.168.0.2, 192.168.0.10").unwrap();
        assert!(value.contains(addr("192.168.0.1")));
        assert!(value.contains(addr("192.168.0.2")));
        for i in 3..10 {
            assert!(!value.contains(addr(&format!("192.168.0.{}", i))));
        }
        assert!(value.contains(addr("192.168.0.10")));
    }

    #[test]
    fn test_ranged_value() {
        let value = IpValue::parse("10.1.1.1-10.1.1.100").unwrap();
        for i in 1..=100 {
            assert!(value.contains(addr(&format!("10.1.1.{}", i))));
        }
        assert!(!value.contains(addr("10.1.1.101")));
    }

    #[test]
    fn test_parse_cidr() {
        let cases = [
            ("192.168.23.0/24", range("192.168.23.0", "192.168.23.255")),
            ("192.168.42.23/22", range("192.168.40.0", "192.168.43.255")),
            ("192.168.23.42/31", range("192.168.23.42", "192.168.23.43")),
            ("192.168.23.42/32", range("192.168.23.42", "192.168.23.42")),
            (
                "fe80::243d:e3ff:fe31:7660/64",
                range("fe80::", "fe80::ffff:ffff:ffff:ffff"),
            ),
        ];
        for (cidr, expected) in cases {
            assert_eq!(parse_cidr(cidr).unwrap(), expected, "{}", cidr);
        }
    }

    #[test]
    fn test_cidr_value_outside() {
        let value = IpValue::parse("10.0.0.5,192.168.0.0/24").unwrap();
        assert!(value.contains(addr("192.168.0.77")));
        assert!(!value.contains(addr("192.168.1.0")));
        assert!(!value.contains(addr("10.0.0.4")));
        assert!(value.contains(addr("10.0.0.5")));
        assert!(!value.contains(addr("10.0.0.6")));
    }

    #[test]
    fn test_ipv6_values() {
        let value = IpValue::parse("2001:0DB8:0:CD30::1").unwrap();
        assert!(value.contains(addr("2001:db8:0:cd30::1")));
        assert!(!value.contains(addr("2001:db8:0:cd30::2")));
        assert!(!value.contains(addr("192.168.0.1")));

        let value = IpValue::parse("2001:0DB8:0:CD30::1/127").unwrap();
        assert!(value.contains(addr("2001:db8:0:cd30::0")));
        assert!(value.contains(addr("2001:db8:0:cd30::1")));
        assert!(!value.contains(addr("2001:db8:0:cd30::2")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(IpValue::parse("*"), Err(ValueError::Wildcard(_))));
        assert!(matches!(
            IpValue::parse("300.400.500.600"),
            Err(ValueError::InvalidAddress(_))
        ));
        assert!(matches!(
            IpValue::parse("192.168.0.1-a.b.c.d"),
            Err(ValueError::InvalidAddress(_))
        ));
        assert!(matches!(
            IpValue::parse("192.168.10.255-192.168.0.1"),
            Err(ValueError::InvalidRange(_))
        ));
        assert!(matches!(
            IpValue::parse("192.0.0.0/8-192.168.0.0/24"),
            Err(ValueError::InvalidRange(_))
        ));
        assert!(matches!(
            IpValue::parse("10.0.0.1-::1"),
            Err(ValueError::MixedFamilies(_))
        ));
        assert!(matches!(
            IpValue::parse("10.0.0.0/33"),
            Err(ValueError::InvalidCidr(_))
        ));
    }
}
