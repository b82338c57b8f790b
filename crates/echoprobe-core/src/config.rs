use crate::policy::PlatformPolicy;
use crate::types::{Identifier, PayloadPattern, PayloadSize, Sequence, TimeToLive};
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use crate::config::PrivilegeMode;
    use std::time::Duration;

    /// The default value for `privilege-mode`.
    pub const DEFAULT_PRIVILEGE_MODE: PrivilegeMode = PrivilegeMode::Privileged;

    /// The default value for `interval`.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// The default value for `timeout`.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// The default value for `size`.
    pub const DEFAULT_PAYLOAD_SIZE: u16 = 56;

    /// The default value for `ttl`.
    pub const DEFAULT_TTL: u8 = 64;

    /// The default value for `payload-pattern`.
    pub const DEFAULT_PAYLOAD_PATTERN: u8 = 0;

    /// The default value for `initial-sequence`.
    pub const DEFAULT_INITIAL_SEQUENCE: u16 = 0;

    /// The default value for `read-timeout`.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

    /// The default value for `record-rtts`.
    pub const DEFAULT_RECORD_RTTS: bool = true;
}

/// The privilege mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrivilegeMode {
    /// Privileged mode (raw sockets).
    Privileged,
    /// Unprivileged mode (datagram ICMP sockets).
    Unprivileged,
}

impl PrivilegeMode {
    #[must_use]
    pub const fn is_unprivileged(self) -> bool {
        match self {
            Self::Privileged => false,
            Self::Unprivileged => true,
        }
    }
}

impl Display for PrivilegeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Privileged => write!(f, "privileged"),
            Self::Unprivileged => write!(f, "unprivileged"),
        }
    }
}

/// The IP version of a target.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IpVersion {
    V4,
    V6,
}

impl From<IpAddr> for IpVersion {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

impl Display for IpVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 => write!(f, "ipv4"),
            Self::V6 => write!(f, "ipv6"),
        }
    }
}

/// Pinger network channel configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChannelConfig {
    pub privilege_mode: PrivilegeMode,
    pub source_addr: Option<IpAddr>,
    pub target_addr: IpAddr,
    pub payload_size: PayloadSize,
    pub payload_pattern: PayloadPattern,
    pub ttl: TimeToLive,
    pub read_timeout: Duration,
    pub policy: PlatformPolicy,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            privilege_mode: defaults::DEFAULT_PRIVILEGE_MODE,
            source_addr: None,
            target_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            payload_size: PayloadSize(defaults::DEFAULT_PAYLOAD_SIZE),
            payload_pattern: PayloadPattern(defaults::DEFAULT_PAYLOAD_PATTERN),
            ttl: TimeToLive(defaults::DEFAULT_TTL),
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
            policy: PlatformPolicy::native(),
        }
    }
}

/// Pinger session configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SessionConfig {
    pub target_addr: IpAddr,
    pub privilege_mode: PrivilegeMode,
    pub identifier: Identifier,
    pub initial_sequence: Sequence,
    pub payload_size: PayloadSize,
    pub ttl: TimeToLive,
    /// The number of probes to send, unbounded if `None`.
    pub count: Option<usize>,
    pub record_rtts: bool,
    pub policy: PlatformPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            privilege_mode: defaults::DEFAULT_PRIVILEGE_MODE,
            identifier: Identifier::default(),
            initial_sequence: Sequence(defaults::DEFAULT_INITIAL_SEQUENCE),
            payload_size: PayloadSize(defaults::DEFAULT_PAYLOAD_SIZE),
            ttl: TimeToLive(defaults::DEFAULT_TTL),
            count: None,
            record_rtts: defaults::DEFAULT_RECORD_RTTS,
            policy: PlatformPolicy::native(),
        }
    }
}

/// Pinger engine configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EngineConfig {
    pub target_addr: IpAddr,
    pub identifier: Identifier,
    /// The time between successive probes.
    pub interval: Duration,
    /// How long a probe may remain unanswered before it is lost.
    pub timeout: Duration,
    /// The wall-clock limit for the whole run, unbounded if `None`.
    pub deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            identifier: Identifier::default(),
            interval: defaults::DEFAULT_INTERVAL,
            timeout: defaults::DEFAULT_TIMEOUT,
            deadline: None,
        }
    }
}
