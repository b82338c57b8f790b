use crate::buffer::Buffer;
use crate::error::Result;
use crate::fmt_payload;
use std::fmt::{Debug, Formatter};

const TYPE_OFFSET: usize = 0;
const CODE_OFFSET: usize = 1;
const CHECKSUM_OFFSET: usize = 2;
const IDENTIFIER_OFFSET: usize = 4;
const SEQUENCE_OFFSET: usize = 6;

/// The size of the fixed `ICMP` header shared by echo and error messages.
pub const HEADER_SIZE: usize = 8;

/// An `ICMP` echo request or echo reply message.
///
/// `ICMPv4` and `ICMPv6` share this layout and differ only in their type
/// numbers, see [`crate::icmpv4::IcmpType`] and [`crate::icmpv6::IcmpType`].
pub struct EchoPacket<'a> {
    buf: Buffer<'a>,
}

impl<'a> EchoPacket<'a> {
    pub fn new(packet: &'a mut [u8]) -> Result<Self> {
        Ok(Self {
            buf: Buffer::writable("EchoPacket", packet, Self::minimum_packet_size())?,
        })
    }

    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        Ok(Self {
            buf: Buffer::view("EchoPacket", packet, Self::minimum_packet_size())?,
        })
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        HEADER_SIZE
    }

    #[must_use]
    pub fn get_icmp_type(&self) -> u8 {
        self.buf.read(TYPE_OFFSET)
    }

    #[must_use]
    pub fn get_icmp_code(&self) -> u8 {
        self.buf.read(CODE_OFFSET)
    }

    #[must_use]
    pub fn get_checksum(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(CHECKSUM_OFFSET))
    }

    #[must_use]
    pub fn get_identifier(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(IDENTIFIER_OFFSET))
    }

    #[must_use]
    pub fn get_sequence(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(SEQUENCE_OFFSET))
    }

    pub fn set_icmp_type(&mut self, val: u8) {
        *self.buf.write(TYPE_OFFSET) = val;
    }

    pub fn set_icmp_code(&mut self, val: u8) {
        *self.buf.write(CODE_OFFSET) = val;
    }

    pub fn set_checksum(&mut self, val: u16) {
        self.buf.set_bytes(CHECKSUM_OFFSET, val.to_be_bytes());
    }

    pub fn set_identifier(&mut self, val: u16) {
        self.buf.set_bytes(IDENTIFIER_OFFSET, val.to_be_bytes());
    }

    pub fn set_sequence(&mut self, val: u16) {
        self.buf.set_bytes(SEQUENCE_OFFSET, val.to_be_bytes());
    }

    /// Copy `vals` into the payload, which must fit in the buffer.
    pub fn set_payload(&mut self, vals: &[u8]) {
        let end = HEADER_SIZE + vals.len();
        self.buf.as_slice_mut()[HEADER_SIZE..end].copy_from_slice(vals);
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[HEADER_SIZE..]
    }
}

impl Debug for EchoPacket<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoPacket")
            .field("icmp_type", &self.get_icmp_type())
            .field("icmp_code", &self.get_icmp_code())
            .field("checksum", &self.get_checksum())
            .field("identifier", &self.get_identifier())
            .field("sequence", &self.get_sequence())
            .field("payload", &fmt_payload(self.payload()))
            .finish()
    }
}

/// An `ICMP` error message (time exceeded or destination unreachable).
///
/// The body quotes the start of the datagram which triggered the error,
/// beginning with its IP header.
pub struct ErrorPacket<'a> {
    buf: Buffer<'a>,
}

impl<'a> ErrorPacket<'a> {
    pub fn new(packet: &'a mut [u8]) -> Result<Self> {
        Ok(Self {
            buf: Buffer::writable("ErrorPacket", packet, Self::minimum_packet_size())?,
        })
    }

    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        Ok(Self {
            buf: Buffer::view("ErrorPacket", packet, Self::minimum_packet_size())?,
        })
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        HEADER_SIZE
    }

    #[must_use]
    pub fn get_icmp_type(&self) -> u8 {
        self.buf.read(TYPE_OFFSET)
    }

    #[must_use]
    pub fn get_icmp_code(&self) -> u8 {
        self.buf.read(CODE_OFFSET)
    }

    pub fn set_icmp_type(&mut self, val: u8) {
        *self.buf.write(TYPE_OFFSET) = val;
    }

    pub fn set_icmp_code(&mut self, val: u8) {
        *self.buf.write(CODE_OFFSET) = val;
    }

    /// Copy the quoted datagram into the body, which must fit in the buffer.
    pub fn set_original_datagram(&mut self, vals: &[u8]) {
        let end = HEADER_SIZE + vals.len();
        self.buf.as_slice_mut()[HEADER_SIZE..end].copy_from_slice(vals);
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// The quoted datagram which caused this error.
    #[must_use]
    pub fn original_datagram(&self) -> &[u8] {
        &self.buf.as_slice()[HEADER_SIZE..]
    }
}

impl Debug for ErrorPacket<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorPacket")
            .field("icmp_type", &self.get_icmp_type())
            .field("icmp_code", &self.get_icmp_code())
            .field("original_datagram", &fmt_payload(self.original_datagram()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_echo_view() -> anyhow::Result<()> {
        let buf = hex_literal::hex!("00 00 5c 1a 04 d2 00 07 00 00 00 00 3b 9a ca 00 ff ff");
        let packet = EchoPacket::new_view(&buf)?;
        assert_eq!(0, packet.get_icmp_type());
        assert_eq!(0, packet.get_icmp_code());
        assert_eq!(0x5c1a, packet.get_checksum());
        assert_eq!(1234, packet.get_identifier());
        assert_eq!(7, packet.get_sequence());
        assert_eq!(
            &hex_literal::hex!("00 00 00 00 3b 9a ca 00 ff ff"),
            packet.payload()
        );
        Ok(())
    }

    #[test]
    fn test_echo_build() -> anyhow::Result<()> {
        let mut buf = [0_u8; 12];
        let mut packet = EchoPacket::new(&mut buf)?;
        packet.set_icmp_type(8);
        packet.set_icmp_code(0);
        packet.set_identifier(0xbeef);
        packet.set_sequence(65535);
        packet.set_checksum(0x1234);
        packet.set_payload(&[1, 2, 3, 4]);
        assert_eq!(
            &hex_literal::hex!("08 00 12 34 be ef ff ff 01 02 03 04"),
            packet.packet()
        );
        Ok(())
    }

    #[test]
    fn test_echo_header_only() -> anyhow::Result<()> {
        let buf = hex_literal::hex!("81 00 00 00 00 01 00 02");
        let packet = EchoPacket::new_view(&buf)?;
        assert!(packet.payload().is_empty());
        Ok(())
    }

    #[test]
    fn test_echo_truncated() {
        let buf = hex_literal::hex!("00 00 5c 1a 04 d2 00");
        let err = EchoPacket::new_view(&buf).unwrap_err();
        assert_eq!(Error::InsufficientPacketBuffer("EchoPacket", 8, 7), err);
    }

    #[test]
    fn test_error_view() -> anyhow::Result<()> {
        let buf = hex_literal::hex!("0b 00 f4 ff 00 00 00 00 45 00 00 54");
        let packet = ErrorPacket::new_view(&buf)?;
        assert_eq!(11, packet.get_icmp_type());
        assert_eq!(0, packet.get_icmp_code());
        assert_eq!(&hex_literal::hex!("45 00 00 54"), packet.original_datagram());
        Ok(())
    }
}
