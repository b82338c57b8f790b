//! Wire views for `ICMP` echo probing.
//!
//! The following packets are supported:
//! - `IPv4` and `IPv6` headers (enough to reach the `ICMP` message and its hop count)
//! - `ICMP` echo request / echo reply messages
//! - `ICMP` time exceeded / destination unreachable messages
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian) and
//! all accessor methods take and return data in host byte order.
//!
//! # Example
//!
//! Build an `ICMPv4` echo request:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use echoprobe_packet::checksum::icmp_ipv4_checksum;
//! use echoprobe_packet::icmp::EchoPacket;
//! use echoprobe_packet::icmpv4::IcmpType;
//!
//! let mut buf = [0; EchoPacket::minimum_packet_size()];
//! let mut icmp = EchoPacket::new(&mut buf)?;
//! icmp.set_icmp_type(IcmpType::EchoRequest.id());
//! icmp.set_identifier(1234);
//! icmp.set_sequence(10);
//! icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
//! assert_eq!(icmp.packet(), &hex_literal::hex!("08 00 f3 23 04 d2 00 0a"));
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// The `ICMP` checksum.
pub mod checksum;

/// `ICMP` message layouts shared by `ICMPv4` and `ICMPv6`.
pub mod icmp;

pub mod icmpv4;

pub mod icmpv6;

/// `IPv4` packets.
pub mod ipv4;

/// `IPv6` packets.
pub mod ipv6;

/// The IP protocol carried by an IP packet.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    IcmpV6,
    Other(u8),
}

impl IpProtocol {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::IcmpV6 => 58,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            58 => Self::IcmpV6,
            p => Self::Other(p),
        }
    }
}

fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}
