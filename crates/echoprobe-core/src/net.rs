use crate::error::Result;
use crate::probe::{Probe, Reply};

/// Common types and helper functions.
mod common;

/// Platform specific network code.
mod platform;

/// A network socket.
mod socket;

/// A channel for sending probes and receiving replies.
pub mod channel;

/// The platform specific socket type.
pub use platform::SocketImpl;

/// An abstraction over a network interface for echo probing.
///
/// A run shares its `Network` between the sender and receiver threads, which call
/// `send_probe` and `recv_reply` concurrently, and so requires it to be `Sync`.
pub trait Network {
    /// Send a `Probe`.
    fn send_probe(&self, probe: &Probe) -> Result<()>;

    /// Receive the next ICMP message and return it as a `Reply`.
    ///
    /// Returns `None` if the read times out or the message read is not one of the types
    /// expected.
    fn recv_reply(&self) -> Result<Option<Reply>>;
}
