//! Echoprobe - An ICMP echo probing library.
//!
//! This crate provides the probe engine used by the `echoprobe` command line
//! tool: it sends ICMP echo requests to a target, matches the replies to the
//! requests which produced them and accumulates round trip time statistics.
//!
//! Each echo request carries a monotonic send timestamp in its payload so
//! that round trip times are unaffected by changes to the system clock.  Both
//! raw (privileged) and datagram (unprivileged) `ICMP` sockets are supported,
//! with the platform differences captured by a [`PlatformPolicy`].
//!
//! # Example
//!
//! The following example sends 5 echo requests with the default configuration
//! and prints the resulting statistics:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! # use std::net::IpAddr;
//! # use std::str::FromStr;
//! use echoprobe_core::Builder;
//!
//! let addr = IpAddr::from_str("1.1.1.1")?;
//! let outcome = Builder::new(addr).count(Some(5)).build()?.run()?;
//! println!("{:?}", outcome.statistics);
//! # Ok(())
//! # }
//! ```
//!
//! The following example pings in unprivileged mode (only supported on some
//! platforms) and prints each reply as it arrives:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! # use std::net::IpAddr;
//! # use std::str::FromStr;
//! use echoprobe_core::{Builder, Echo, Handler, PrivilegeMode};
//!
//! struct Printer;
//!
//! impl Handler for Printer {
//!     fn on_recv(&self, echo: &Echo) {
//!         println!("{} bytes from {}: icmp_seq={} time={:?}", echo.bytes, echo.addr, echo.sequence, echo.rtt);
//!     }
//! }
//!
//! let addr = IpAddr::from_str("1.1.1.1")?;
//! Builder::new(addr)
//!     .privilege_mode(PrivilegeMode::Unprivileged)
//!     .count(Some(5))
//!     .build()?
//!     .run_with(&Printer)?;
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Pinger`].
//! - [`Pinger::run`] - Run the pinger on the current thread.
//! - [`Pinger::run_with`] - Run the pinger with a custom [`Handler`].
//! - [`Pinger::spawn`] - Run the pinger on a new thread.
//! - [`Pinger::spawn_with`] - Run the pinger on a new thread with a custom [`Handler`].
#![deny(unsafe_code)]

mod builder;
mod config;
mod constants;
mod engine;
mod handler;
mod net;
mod pinger;
mod policy;
mod probe;
mod session;
mod stats;
mod types;

pub mod clock;
pub mod codec;
pub mod error;

pub use builder::Builder;
pub use clock::{Clock, ManualClock, MonotonicClock, Ticks};
pub use config::{defaults, IpVersion, PrivilegeMode};
pub use constants::{MAX_PAYLOAD_SIZE, MIN_PAYLOAD_SIZE};
pub use engine::CompletionReason;
pub use error::{Error, Result};
pub use handler::Handler;
pub use pinger::{Outcome, Pinger};
pub use policy::{IdentifierMatch, LengthAccounting, PlatformPolicy};
pub use probe::{Echo, EchoStatus, IcmpPacketCode, IcmpPacketType, Probe, Reply};
pub use stats::Statistics;
pub use types::{Identifier, PayloadPattern, PayloadSize, Sequence, TimeToLive};

#[cfg(windows)]
pub use clock::PerformanceCounterClock;
