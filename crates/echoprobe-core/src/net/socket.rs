use crate::error::IoResult as Result;
use std::net::SocketAddr;
use std::time::Duration;

/// A socket for sending echo requests and receiving replies.
///
/// A single socket is shared by the sender and receiver threads and so every operation takes
/// `&self`.
#[cfg_attr(test, mockall::automock)]
pub trait Socket
where
    Self: Sized,
{
    /// Create an IPv4 socket for ICMP echo, raw if `raw` otherwise datagram.
    fn new_icmp_socket_ipv4(raw: bool) -> Result<Self>;
    /// Create an IPv6 socket for ICMP echo, raw if `raw` otherwise datagram.
    fn new_icmp_socket_ipv6(raw: bool) -> Result<Self>;
    fn bind(&self, address: SocketAddr) -> Result<()>;
    fn set_ttl(&self, ttl: u32) -> Result<()>;
    fn set_unicast_hops_v6(&self, hops: u8) -> Result<()>;
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<()>;
    /// Returns true if the socket becomes readable before the timeout, false otherwise.
    fn is_readable(&self, timeout: Duration) -> Result<bool>;
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Option<SocketAddr>)>;
}
