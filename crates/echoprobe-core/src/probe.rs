use crate::clock::Ticks;
use crate::types::{Identifier, PayloadSize, Sequence, TimeToLive};
use std::net::IpAddr;
use std::time::Duration;

/// An echo request.
///
/// # Examples
///
/// ```
/// use echoprobe_core::{Identifier, PayloadSize, Probe, Sequence, Ticks, TimeToLive};
///
/// let probe = Probe::new(
///     Sequence(1),
///     Identifier(1234),
///     TimeToLive(64),
///     PayloadSize(56),
///     Ticks(1_000),
/// );
/// assert_eq!(Sequence(1), probe.sequence);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// The sequence of the probe.
    pub sequence: Sequence,
    /// The echo identifier.
    pub identifier: Identifier,
    /// The TTL (or hop limit) of the probe.
    pub ttl: TimeToLive,
    /// The number of payload bytes.
    pub payload_size: PayloadSize,
    /// The tick count when the probe was sent, carried in the payload.
    pub sent: Ticks,
}

impl Probe {
    #[must_use]
    pub const fn new(
        sequence: Sequence,
        identifier: Identifier,
        ttl: TimeToLive,
        payload_size: PayloadSize,
        sent: Ticks,
    ) -> Self {
        Self {
            sequence,
            identifier,
            ttl,
            payload_size,
            sent,
        }
    }
}

/// The type of ICMP packet received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpPacketType {
    /// `EchoReply` packet.
    EchoReply,
    /// `TimeExceeded` packet.
    TimeExceeded(IcmpPacketCode),
    /// Unreachable packet.
    Unreachable(IcmpPacketCode),
}

/// The code of `TimeExceeded` and `Unreachable` ICMP packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpPacketCode(pub u8);

/// An ICMP message read from the network.
///
/// For an echo reply the `identifier`, `sequence` and `payload` are those of the reply itself,
/// for an error they are taken from the echo request quoted by the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: IcmpPacketType,
    pub identifier: Identifier,
    pub sequence: Sequence,
    pub payload: Vec<u8>,
    /// The host which sent the message.
    pub addr: IpAddr,
    /// The TTL of the IP packet, if the socket delivers the IP header.
    pub ttl: Option<TimeToLive>,
    /// The size of the ICMP message.
    pub bytes: usize,
    /// The tick count when the message was read.
    pub received: Ticks,
}

impl Reply {
    /// The send timestamp carried in the payload, if present.
    #[must_use]
    pub fn sent(&self) -> Option<Ticks> {
        Ticks::from_bytes(&self.payload)
    }
}

/// The outcome of an individual probe, as reported to a [`crate::Handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStatus {
    /// The first reply for a probe.
    Received,
    /// A further reply for an already answered probe.
    Duplicate,
    /// No reply was received within the timeout.
    TimedOut,
    /// An ICMP error was received in place of a reply.
    IcmpError(IcmpPacketType),
}

/// A classified reply, or a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Echo {
    pub status: EchoStatus,
    pub identifier: Identifier,
    pub sequence: Sequence,
    pub addr: IpAddr,
    pub ttl: Option<TimeToLive>,
    /// The size of the ICMP message, zero for a timeout.
    pub bytes: usize,
    /// The round trip time, or the timeout for a probe which timed out.
    pub rtt: Duration,
}

impl Echo {
    pub(crate) fn from_reply(reply: &Reply, status: EchoStatus, rtt: Duration) -> Self {
        Self {
            status,
            identifier: reply.identifier,
            sequence: reply.sequence,
            addr: reply.addr,
            ttl: reply.ttl,
            bytes: reply.bytes,
            rtt,
        }
    }

    pub(crate) const fn timed_out(
        identifier: Identifier,
        sequence: Sequence,
        addr: IpAddr,
        timeout: Duration,
    ) -> Self {
        Self {
            status: EchoStatus::TimedOut,
            identifier,
            sequence,
            addr,
            ttl: None,
            bytes: 0,
            rtt: timeout,
        }
    }
}
