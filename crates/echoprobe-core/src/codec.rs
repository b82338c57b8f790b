//! Build echo requests and decode inbound `ICMP` messages.
//!
//! Every echo request carries the tick count at which it was sent as the first
//! [`Ticks::WIRE_SIZE`] bytes of its payload, followed by the payload pattern
//! byte repeated to the configured size.  Replies echo the payload back and so
//! the round trip time is measured from the payload alone.
use crate::clock::Ticks;
use crate::config::IpVersion;
use crate::constants::{MAX_PAYLOAD_SIZE, MIN_PAYLOAD_SIZE};
use crate::error::{Error, Result};
use crate::probe::{IcmpPacketCode, IcmpPacketType, Probe, Reply};
use crate::types::{Identifier, PayloadPattern, Sequence, TimeToLive};
use echoprobe_packet::checksum::icmp_ipv4_checksum;
use echoprobe_packet::icmp::{EchoPacket, ErrorPacket, HEADER_SIZE};
use echoprobe_packet::ipv4::Ipv4Packet;
use echoprobe_packet::ipv6::Ipv6Packet;
use echoprobe_packet::{icmpv4, icmpv6, IpProtocol};
use std::net::IpAddr;

/// Fill `payload` with the `sent` timestamp followed by the `pattern` byte.
pub fn encode_payload(payload: &mut [u8], sent: Ticks, pattern: PayloadPattern) -> Result<()> {
    if payload.len() < MIN_PAYLOAD_SIZE {
        return Err(Error::InvalidPayloadSize(payload.len()));
    }
    let (timestamp, filler) = payload.split_at_mut(Ticks::WIRE_SIZE);
    timestamp.copy_from_slice(&sent.to_bytes());
    filler.fill(pattern.0);
    Ok(())
}

/// Write the echo request for `probe` into `buf` and return its length.
///
/// The `ICMPv4` checksum is computed here, the `ICMPv6` checksum covers a pseudo header and is
/// left for the kernel to fill.
pub fn encode_echo_request(
    buf: &mut [u8],
    version: IpVersion,
    probe: &Probe,
    pattern: PayloadPattern,
) -> Result<usize> {
    let size = usize::from(probe.payload_size);
    if !(MIN_PAYLOAD_SIZE..=MAX_PAYLOAD_SIZE).contains(&size) {
        return Err(Error::InvalidPayloadSize(size));
    }
    let len = HEADER_SIZE + size;
    let buf = buf
        .get_mut(..len)
        .ok_or(Error::InvalidPayloadSize(size))?;
    encode_payload(&mut buf[HEADER_SIZE..], probe.sent, pattern)?;
    let mut icmp = EchoPacket::new(buf)?;
    let icmp_type = match version {
        IpVersion::V4 => icmpv4::IcmpType::EchoRequest.id(),
        IpVersion::V6 => icmpv6::IcmpType::EchoRequest.id(),
    };
    icmp.set_icmp_type(icmp_type);
    icmp.set_icmp_code(0);
    icmp.set_identifier(probe.identifier.0);
    icmp.set_sequence(probe.sequence.0);
    icmp.set_checksum(0);
    if version == IpVersion::V4 {
        icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
    }
    Ok(len)
}

/// Decode a frame read from an `ICMP` socket.
///
/// Returns `None` for messages which are not echo replies or errors quoting an echo request,
/// such as our own echo requests delivered back to a raw socket.  Frames which are too short
/// to decode are an error.
pub fn decode_reply(
    frame: &[u8],
    version: IpVersion,
    ip_header: bool,
    addr: Option<IpAddr>,
    received: Ticks,
) -> Result<Option<Reply>> {
    match (version, ip_header) {
        (IpVersion::V4, true) => {
            let ipv4 = Ipv4Packet::new_view(frame)?;
            if ipv4.get_protocol() != IpProtocol::Icmp {
                return Ok(None);
            }
            let from = Some(IpAddr::V4(ipv4.get_source()));
            let ttl = Some(TimeToLive(ipv4.get_ttl()));
            decode_icmpv4(ipv4.payload(), from, ttl, received)
        }
        (IpVersion::V4, false) => decode_icmpv4(frame, addr, None, received),
        (IpVersion::V6, _) => decode_icmpv6(frame, addr, received),
    }
}

fn decode_icmpv4(
    icmp: &[u8],
    addr: Option<IpAddr>,
    ttl: Option<TimeToLive>,
    received: Ticks,
) -> Result<Option<Reply>> {
    let Some(addr) = addr else {
        return Ok(None);
    };
    let header = EchoPacket::new_view(icmp)?;
    let code = IcmpPacketCode(header.get_icmp_code());
    let kind = match icmpv4::IcmpType::from(header.get_icmp_type()) {
        icmpv4::IcmpType::EchoReply => {
            return Ok(Some(Reply {
                kind: IcmpPacketType::EchoReply,
                identifier: Identifier(header.get_identifier()),
                sequence: Sequence(header.get_sequence()),
                payload: header.payload().to_vec(),
                addr,
                ttl,
                bytes: icmp.len(),
                received,
            }))
        }
        icmpv4::IcmpType::TimeExceeded => IcmpPacketType::TimeExceeded(code),
        icmpv4::IcmpType::DestinationUnreachable => IcmpPacketType::Unreachable(code),
        _ => return Ok(None),
    };
    let error = ErrorPacket::new_view(icmp)?;
    let quoted = Ipv4Packet::new_view(error.original_datagram())?;
    if quoted.get_protocol() != IpProtocol::Icmp {
        return Ok(None);
    }
    let echo = EchoPacket::new_view(quoted.payload())?;
    if icmpv4::IcmpType::from(echo.get_icmp_type()) != icmpv4::IcmpType::EchoRequest {
        return Ok(None);
    }
    Ok(Some(quoted_reply(&echo, kind, addr, ttl, icmp.len(), received)))
}

fn decode_icmpv6(icmp: &[u8], addr: Option<IpAddr>, received: Ticks) -> Result<Option<Reply>> {
    let Some(addr) = addr else {
        return Ok(None);
    };
    let header = EchoPacket::new_view(icmp)?;
    let code = IcmpPacketCode(header.get_icmp_code());
    let kind = match icmpv6::IcmpType::from(header.get_icmp_type()) {
        icmpv6::IcmpType::EchoReply => {
            return Ok(Some(Reply {
                kind: IcmpPacketType::EchoReply,
                identifier: Identifier(header.get_identifier()),
                sequence: Sequence(header.get_sequence()),
                payload: header.payload().to_vec(),
                addr,
                ttl: None,
                bytes: icmp.len(),
                received,
            }))
        }
        icmpv6::IcmpType::TimeExceeded => IcmpPacketType::TimeExceeded(code),
        icmpv6::IcmpType::DestinationUnreachable => IcmpPacketType::Unreachable(code),
        _ => return Ok(None),
    };
    let error = ErrorPacket::new_view(icmp)?;
    let quoted = Ipv6Packet::new_view(error.original_datagram())?;
    if quoted.get_next_header() != IpProtocol::IcmpV6 {
        return Ok(None);
    }
    let echo = EchoPacket::new_view(quoted.payload())?;
    if icmpv6::IcmpType::from(echo.get_icmp_type()) != icmpv6::IcmpType::EchoRequest {
        return Ok(None);
    }
    Ok(Some(quoted_reply(&echo, kind, addr, None, icmp.len(), received)))
}

fn quoted_reply(
    echo: &EchoPacket<'_>,
    kind: IcmpPacketType,
    addr: IpAddr,
    ttl: Option<TimeToLive>,
    bytes: usize,
    received: Ticks,
) -> Reply {
    Reply {
        kind,
        identifier: Identifier(echo.get_identifier()),
        sequence: Sequence(echo.get_sequence()),
        payload: echo.payload().to_vec(),
        addr,
        ttl,
        bytes,
        received,
    }
}
