use crate::buffer::Buffer;
use crate::error::Result;
use crate::{fmt_payload, IpProtocol};
use std::fmt::{Debug, Formatter};
use std::net::Ipv6Addr;

const VERSION_OFFSET: usize = 0;
const PAYLOAD_LENGTH_OFFSET: usize = 4;
const NEXT_HEADER_OFFSET: usize = 6;
const HOP_LIMIT_OFFSET: usize = 7;
const SOURCE_OFFSET: usize = 8;
const DESTINATION_OFFSET: usize = 24;

/// An `IPv6` packet.
///
/// Extension headers are not walked; the payload begins directly after the
/// fixed header.
pub struct Ipv6Packet<'a> {
    buf: Buffer<'a>,
}

impl<'a> Ipv6Packet<'a> {
    pub fn new(packet: &'a mut [u8]) -> Result<Self> {
        Ok(Self {
            buf: Buffer::writable("Ipv6Packet", packet, Self::minimum_packet_size())?,
        })
    }

    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        Ok(Self {
            buf: Buffer::view("Ipv6Packet", packet, Self::minimum_packet_size())?,
        })
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        40
    }

    #[must_use]
    pub fn get_version(&self) -> u8 {
        (self.buf.read(VERSION_OFFSET) & 0xf0) >> 4
    }

    #[must_use]
    pub fn get_payload_length(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(PAYLOAD_LENGTH_OFFSET))
    }

    #[must_use]
    pub fn get_next_header(&self) -> IpProtocol {
        IpProtocol::from(self.buf.read(NEXT_HEADER_OFFSET))
    }

    #[must_use]
    pub fn get_hop_limit(&self) -> u8 {
        self.buf.read(HOP_LIMIT_OFFSET)
    }

    #[must_use]
    pub fn get_source(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.buf.get_bytes::<16>(SOURCE_OFFSET))
    }

    #[must_use]
    pub fn get_destination(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.buf.get_bytes::<16>(DESTINATION_OFFSET))
    }

    pub fn set_version(&mut self, val: u8) {
        *self.buf.write(VERSION_OFFSET) =
            (self.buf.read(VERSION_OFFSET) & 0xf) | ((val & 0xf) << 4);
    }

    pub fn set_payload_length(&mut self, val: u16) {
        self.buf.set_bytes(PAYLOAD_LENGTH_OFFSET, val.to_be_bytes());
    }

    pub fn set_next_header(&mut self, val: IpProtocol) {
        *self.buf.write(NEXT_HEADER_OFFSET) = val.id();
    }

    pub fn set_hop_limit(&mut self, val: u8) {
        *self.buf.write(HOP_LIMIT_OFFSET) = val;
    }

    pub fn set_source(&mut self, val: Ipv6Addr) {
        self.buf.set_bytes(SOURCE_OFFSET, val.octets());
    }

    pub fn set_destination(&mut self, val: Ipv6Addr) {
        self.buf.set_bytes(DESTINATION_OFFSET, val.octets());
    }

    pub fn set_payload(&mut self, vals: &[u8]) {
        let start = Self::minimum_packet_size();
        self.buf.as_slice_mut()[start..start + vals.len()].copy_from_slice(vals);
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[Self::minimum_packet_size()..]
    }
}

impl Debug for Ipv6Packet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ipv6Packet")
            .field("version", &self.get_version())
            .field("payload_length", &self.get_payload_length())
            .field("next_header", &self.get_next_header())
            .field("hop_limit", &self.get_hop_limit())
            .field("source", &self.get_source())
            .field("destination", &self.get_destination())
            .field("payload", &fmt_payload(self.payload()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::str::FromStr;

    #[test]
    fn test_view() -> anyhow::Result<()> {
        let buf = hex_literal::hex!(
            "
            60 00 00 00 00 08 3a 40 fe 80 00 00 00 00 00 00
            00 00 00 00 00 00 00 01 fe 80 00 00 00 00 00 00
            00 00 00 00 00 00 00 02 80 00 00 00 04 d2 00 09
            "
        );
        let packet = Ipv6Packet::new_view(&buf)?;
        assert_eq!(6, packet.get_version());
        assert_eq!(8, packet.get_payload_length());
        assert_eq!(IpProtocol::IcmpV6, packet.get_next_header());
        assert_eq!(64, packet.get_hop_limit());
        assert_eq!(Ipv6Addr::from_str("fe80::1")?, packet.get_source());
        assert_eq!(Ipv6Addr::from_str("fe80::2")?, packet.get_destination());
        assert_eq!(&hex_literal::hex!("80 00 00 00 04 d2 00 09"), packet.payload());
        Ok(())
    }

    #[test]
    fn test_build() -> anyhow::Result<()> {
        let mut buf = [0_u8; 42];
        let mut packet = Ipv6Packet::new(&mut buf)?;
        packet.set_version(6);
        packet.set_payload_length(2);
        packet.set_next_header(IpProtocol::IcmpV6);
        packet.set_hop_limit(1);
        packet.set_source(Ipv6Addr::LOCALHOST);
        packet.set_destination(Ipv6Addr::LOCALHOST);
        packet.set_payload(&[0x81, 0x00]);
        let view = Ipv6Packet::new_view(packet.packet())?;
        assert_eq!(6, view.get_version());
        assert_eq!(1, view.get_hop_limit());
        assert_eq!(Ipv6Addr::LOCALHOST, view.get_destination());
        assert_eq!(&[0x81, 0x00], view.payload());
        Ok(())
    }

    #[test]
    fn test_truncated() {
        let buf = [0x60_u8; 39];
        let err = Ipv6Packet::new_view(&buf).unwrap_err();
        assert_eq!(Error::InsufficientPacketBuffer("Ipv6Packet", 40, 39), err);
    }
}
