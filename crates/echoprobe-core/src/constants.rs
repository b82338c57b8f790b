use echoprobe_packet::icmp::HEADER_SIZE;

/// The number of bytes of the payload used for the send timestamp.
///
/// Every echo request carries the tick count at which it was sent as an 8 byte big-endian
/// prefix of the payload, and so no smaller payload is allowed.
pub const MIN_PAYLOAD_SIZE: usize = 8;

/// The maximum size of a packet we send or receive.
pub const MAX_PACKET_SIZE: usize = 8192;

/// The maximum size of an `IPv4` header, including options.
const MAX_IPV4_HEADER_SIZE: usize = 60;

/// The maximum echo payload size allowed.
///
/// This ensures the full reply, including an `IPv4` header with options, fits in a single
/// read buffer.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - MAX_IPV4_HEADER_SIZE - HEADER_SIZE;
