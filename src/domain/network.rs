// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subnet Value Objects and Address Allocation

use ipnet::Ipv4Net;
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("CIDR {0} has host bits set; use the network address")]
    HostBitsSet(String),

    #[error("Subnet {cidr} has {addresses} addresses, at least {required} are required")]
    SubnetTooSmall {
        cidr: String,
        addresses: u64,
        required: u64,
    },
}

/// IPv4 subnet in CIDR notation
///
/// Invariants:
/// - Valid IPv4 network address and prefix length (0-32)
/// - No host bits set (`10.0.0.0/24`, never `10.0.0.5/24`)
///
/// # Examples
///
/// ```rust
/// use vsensor_quickstart::domain::SubnetCidr;
///
/// let subnet = SubnetCidr::new("10.0.0.0/24").unwrap();
/// assert_eq!(subnet.address_count(), 256);
/// assert_eq!(subnet.ingest_frontend_ip().unwrap().to_string(), "10.0.0.253");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubnetCidr(Ipv4Net);

impl SubnetCidr {
    /// Fewest addresses a subnet may have for frontend allocation to succeed
    pub const MIN_ALLOCATABLE_ADDRESSES: u64 = 3;

    /// Parse and validate a subnet
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref().trim();
        let net =
            Ipv4Net::from_str(cidr).map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        if net.trunc() != net {
            return Err(NetworkError::HostBitsSet(cidr.to_string()));
        }

        Ok(Self(net))
    }

    /// Network address
    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    /// Broadcast address
    pub fn broadcast(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    /// Prefix length
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// Total number of addresses, network and broadcast included
    pub fn address_count(&self) -> u64 {
        1u64 << (32 - u32::from(self.0.prefix_len()))
    }

    /// Whether `addr` lies inside this subnet
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.0.contains(&addr)
    }

    /// Address reserved for the direct-ingestion load balancer frontend
    ///
    /// Instances are assigned addresses from the bottom of the range, so the
    /// frontend takes the third address from the top: the last address is
    /// the broadcast address and the one below it is reserved by the platform.
    pub fn ingest_frontend_ip(&self) -> Result<Ipv4Addr, NetworkError> {
        let addresses = self.address_count();
        if addresses < Self::MIN_ALLOCATABLE_ADDRESSES {
            return Err(NetworkError::SubnetTooSmall {
                cidr: self.to_string(),
                addresses,
                required: Self::MIN_ALLOCATABLE_ADDRESSES,
            });
        }

        Ok(Ipv4Addr::from(u32::from(self.broadcast()) - 2))
    }
}

impl fmt::Display for SubnetCidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubnetCidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for SubnetCidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Select the ingest frontend address for the subnet `cidr`
pub fn select_ingest_frontend_ip(cidr: &str) -> Result<Ipv4Addr, NetworkError> {
    SubnetCidr::new(cidr)?.ingest_frontend_ip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_cidr() {
        let subnet = SubnetCidr::new("10.0.0.0/24").unwrap();
        assert_eq!(subnet.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(subnet.broadcast(), Ipv4Addr::new(10, 0, 0, 255));
        assert_eq!(subnet.prefix_len(), 24);
        assert_eq!(subnet.to_string(), "10.0.0.0/24");
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(matches!(
            SubnetCidr::new("10.0.0.0"),
            Err(NetworkError::InvalidCidr(_))
        ));
        assert!(matches!(
            SubnetCidr::new("10.0.0.0/33"),
            Err(NetworkError::InvalidCidr(_))
        ));
        assert!(matches!(
            SubnetCidr::new("2001:db8::/64"),
            Err(NetworkError::InvalidCidr(_))
        ));
        assert!(matches!(
            SubnetCidr::new("10.0.0.5/24"),
            Err(NetworkError::HostBitsSet(_))
        ));
    }

    #[test]
    fn test_frontend_ip_is_third_from_last() {
        assert_eq!(
            select_ingest_frontend_ip("10.0.0.0/24").unwrap(),
            Ipv4Addr::new(10, 0, 0, 253)
        );
        assert_eq!(
            select_ingest_frontend_ip("172.16.8.0/22").unwrap(),
            Ipv4Addr::new(172, 16, 11, 253)
        );
        assert_eq!(
            select_ingest_frontend_ip("192.168.10.16/29").unwrap(),
            Ipv4Addr::new(192, 168, 10, 21)
        );
    }

    #[test]
    fn test_smallest_allocatable_subnet() {
        assert_eq!(
            select_ingest_frontend_ip("10.1.1.4/30").unwrap(),
            Ipv4Addr::new(10, 1, 1, 5)
        );
    }

    #[test]
    fn test_subnet_too_small() {
        assert!(matches!(
            select_ingest_frontend_ip("10.1.1.4/31"),
            Err(NetworkError::SubnetTooSmall { addresses: 2, .. })
        ));
        assert!(matches!(
            select_ingest_frontend_ip("10.1.1.4/32"),
            Err(NetworkError::SubnetTooSmall { addresses: 1, .. })
        ));
    }
}
