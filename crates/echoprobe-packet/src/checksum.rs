//! The internet checksum (RFC 1071) as used by `ICMPv4`.
//!
//! `ICMPv6` checksums cover a pseudo-header which the kernel fills in for
//! both raw and datagram `ICMPv6` sockets, so only the `IPv4` flavour is
//! provided here.

/// The 16-bit word index of the checksum field within an `ICMP` header.
const ICMP_CHECKSUM_WORD: usize = 1;

/// Calculate the checksum of an `ICMPv4` message.
///
/// The existing checksum field is skipped, so the message may be summed
/// whether or not a checksum was previously written.
#[must_use]
pub fn icmp_ipv4_checksum(data: &[u8]) -> u16 {
    if data.is_empty() {
        return 0;
    }
    fold(sum_be_words(data, ICMP_CHECKSUM_WORD))
}

/// Sum the big-endian 16-bit words of `data`, skipping the word at `skip`.
///
/// A trailing odd byte is padded with zero.
fn sum_be_words(data: &[u8], skip: usize) -> u32 {
    data.chunks(2)
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, word)| match *word {
            [hi, lo] => u32::from(u16::from_be_bytes([hi, lo])),
            [hi] => u32::from(hi) << 8,
            _ => 0,
        })
        .fold(0_u32, u32::wrapping_add)
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xffff);
    }
    !(sum as u16)
}
