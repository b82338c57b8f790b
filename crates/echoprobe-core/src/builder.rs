use crate::clock::{self, Clock};
use crate::config::{ChannelConfig, EngineConfig, IpVersion, SessionConfig};
use crate::constants::{MAX_PAYLOAD_SIZE, MIN_PAYLOAD_SIZE};
use crate::error::{Error, Result};
use crate::policy::PlatformPolicy;
use crate::{
    Identifier, PayloadPattern, PayloadSize, Pinger, PrivilegeMode, Sequence, TimeToLive,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Build a pinger.
///
/// This is a convenience builder to simplify the creation and validation of a
/// [`Pinger`].
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use echoprobe_core::{Builder, PrivilegeMode};
/// use std::time::Duration;
///
/// let addr = std::net::IpAddr::from([1, 2, 3, 4]);
/// let pinger = Builder::new(addr)
///     .privilege_mode(PrivilegeMode::Unprivileged)
///     .count(Some(5))
///     .interval(Duration::from_millis(200))
///     .build()?;
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`Pinger`] - An ICMP echo pinger.
#[derive(Debug)]
pub struct Builder {
    target_addr: IpAddr,
    target_name: Option<String>,
    source_addr: Option<IpAddr>,
    privilege_mode: PrivilegeMode,
    identifier: Identifier,
    initial_sequence: Sequence,
    payload_size: PayloadSize,
    payload_pattern: PayloadPattern,
    ttl: TimeToLive,
    count: Option<usize>,
    interval: Duration,
    timeout: Duration,
    deadline: Option<Duration>,
    read_timeout: Duration,
    record_rtts: bool,
    policy: PlatformPolicy,
    clock: Option<Arc<dyn Clock>>,
    drop_privileges: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            target_addr: ChannelConfig::default().target_addr,
            target_name: None,
            source_addr: ChannelConfig::default().source_addr,
            privilege_mode: ChannelConfig::default().privilege_mode,
            identifier: Identifier::from_process(),
            initial_sequence: SessionConfig::default().initial_sequence,
            payload_size: ChannelConfig::default().payload_size,
            payload_pattern: ChannelConfig::default().payload_pattern,
            ttl: ChannelConfig::default().ttl,
            count: SessionConfig::default().count,
            interval: EngineConfig::default().interval,
            timeout: EngineConfig::default().timeout,
            deadline: EngineConfig::default().deadline,
            read_timeout: ChannelConfig::default().read_timeout,
            record_rtts: SessionConfig::default().record_rtts,
            policy: PlatformPolicy::native(),
            clock: None,
            drop_privileges: false,
        }
    }
}

impl Builder {
    /// Build a pinger builder for a given target.
    ///
    /// # Examples
    ///
    /// Basic usage:
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use echoprobe_core::Builder;
    ///
    /// let addr = std::net::IpAddr::from([1, 1, 1, 1]);
    /// let pinger = Builder::new(addr).build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn new(target_addr: IpAddr) -> Self {
        Self {
            target_addr,
            ..Default::default()
        }
    }

    /// Set the display name of the target, such as the hostname it was resolved from.
    ///
    /// If not set then the target address is used.
    #[must_use]
    pub fn target_name(self, target_name: impl Into<String>) -> Self {
        Self {
            target_name: Some(target_name.into()),
            ..self
        }
    }

    /// Set the source address.
    ///
    /// If set then the socket is bound to this address, otherwise the source address is chosen
    /// by the operating system.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use std::net::IpAddr;
    /// use echoprobe_core::Builder;
    ///
    /// let addr = IpAddr::from([1, 1, 1, 1]);
    /// let source_addr = IpAddr::from([192, 168, 1, 1]);
    /// let pinger = Builder::new(addr).source_addr(Some(source_addr)).build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn source_addr(self, source_addr: Option<IpAddr>) -> Self {
        Self {
            source_addr,
            ..self
        }
    }

    /// Set the privilege mode.
    ///
    /// [`PrivilegeMode::Privileged`] uses raw sockets and requires elevated rights,
    /// [`PrivilegeMode::Unprivileged`] uses datagram `ICMP` sockets where the platform supports
    /// them.
    ///
    /// If not set then [`PrivilegeMode::Privileged`] is used.
    #[must_use]
    pub fn privilege_mode(self, privilege_mode: PrivilegeMode) -> Self {
        Self {
            privilege_mode,
            ..self
        }
    }

    /// Set the echo identifier.
    ///
    /// If not set then an identifier derived from the process id is used.
    #[must_use]
    pub fn identifier(self, identifier: Identifier) -> Self {
        Self { identifier, ..self }
    }

    /// Set the sequence number of the first probe.
    #[must_use]
    pub fn initial_sequence(self, initial_sequence: Sequence) -> Self {
        Self {
            initial_sequence,
            ..self
        }
    }

    /// Set the payload size.
    ///
    /// The payload must be large enough to hold the send timestamp.
    ///
    /// If not set then 56 bytes are used.
    #[must_use]
    pub fn payload_size(self, payload_size: PayloadSize) -> Self {
        Self {
            payload_size,
            ..self
        }
    }

    /// Set the byte used to fill the payload after the send timestamp.
    #[must_use]
    pub fn payload_pattern(self, payload_pattern: PayloadPattern) -> Self {
        Self {
            payload_pattern,
            ..self
        }
    }

    /// Set the time-to-live (or hop limit) of outgoing probes.
    #[must_use]
    pub fn ttl(self, ttl: TimeToLive) -> Self {
        Self { ttl, ..self }
    }

    /// Set the number of probes to send.
    ///
    /// If not set, or set to `None`, then probes are sent until the run is stopped or the
    /// deadline passes.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use echoprobe_core::Builder;
    ///
    /// let addr = std::net::IpAddr::from([1, 1, 1, 1]);
    /// let pinger = Builder::new(addr).count(Some(10)).build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn count(self, count: Option<usize>) -> Self {
        Self { count, ..self }
    }

    /// Set the interval between probes.
    #[must_use]
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Set how long a probe may wait for a reply before it is considered lost.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Set the overall time limit for the run.
    ///
    /// The deadline applies regardless of the count and a run which reaches it completes with
    /// [`crate::CompletionReason::DeadlineExceeded`].
    #[must_use]
    pub fn deadline(self, deadline: Option<Duration>) -> Self {
        Self { deadline, ..self }
    }

    /// Set the socket read timeout.
    ///
    /// This bounds how long a stop request may go unnoticed by the receiver and so must not
    /// exceed the interval.
    #[must_use]
    pub fn read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }

    /// Record every round trip time in the [`crate::Statistics`].
    #[must_use]
    pub fn record_rtts(self, record_rtts: bool) -> Self {
        Self {
            record_rtts,
            ..self
        }
    }

    /// Set the platform policy.
    ///
    /// If not set then the policy of the platform the pinger is compiled for is used.
    #[must_use]
    pub fn policy(self, policy: PlatformPolicy) -> Self {
        Self { policy, ..self }
    }

    /// Set the clock used to timestamp probes.
    ///
    /// If not set then the native high resolution clock for the platform is used.
    #[must_use]
    pub fn clock(self, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock: Some(clock),
            ..self
        }
    }

    /// Drop privileges after the socket has been opened.
    #[must_use]
    pub fn drop_privileges(self, drop_privileges: bool) -> Self {
        Self {
            drop_privileges,
            ..self
        }
    }

    /// Build the `Pinger`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use echoprobe_core::Builder;
    ///
    /// let addr = std::net::IpAddr::from([1, 1, 1, 1]);
    /// let pinger = Builder::new(addr).build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<Pinger> {
        let size = usize::from(self.payload_size);
        if !(MIN_PAYLOAD_SIZE..=MAX_PAYLOAD_SIZE).contains(&size) {
            return Err(Error::InvalidPayloadSize(size));
        }
        if self.ttl.0 == 0 {
            return Err(Error::BadConfig(String::from("ttl must be at least 1")));
        }
        if self.interval.is_zero() {
            return Err(Error::BadConfig(String::from("interval must be non-zero")));
        }
        if self.timeout.is_zero() {
            return Err(Error::BadConfig(String::from("timeout must be non-zero")));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::BadConfig(String::from(
                "read_timeout must be non-zero",
            )));
        }
        if self.read_timeout > self.interval {
            return Err(Error::BadConfig(format!(
                "read_timeout {:?} > interval {:?}",
                self.read_timeout, self.interval
            )));
        }
        if let Some(source_addr) = self.source_addr {
            if IpVersion::from(source_addr) != IpVersion::from(self.target_addr) {
                return Err(Error::BadConfig(format!(
                    "source_addr {source_addr} and target_addr {} are different address families",
                    self.target_addr
                )));
            }
        }
        let clock = match self.clock {
            Some(clock) => clock,
            None => clock::native()?,
        };
        let addr = self
            .target_name
            .unwrap_or_else(|| self.target_addr.to_string());
        Ok(Pinger::new(
            ChannelConfig {
                privilege_mode: self.privilege_mode,
                source_addr: self.source_addr,
                target_addr: self.target_addr,
                payload_size: self.payload_size,
                payload_pattern: self.payload_pattern,
                ttl: self.ttl,
                read_timeout: self.read_timeout,
                policy: self.policy,
            },
            SessionConfig {
                target_addr: self.target_addr,
                privilege_mode: self.privilege_mode,
                identifier: self.identifier,
                initial_sequence: self.initial_sequence,
                payload_size: self.payload_size,
                ttl: self.ttl,
                count: self.count,
                record_rtts: self.record_rtts,
                policy: self.policy,
            },
            EngineConfig {
                target_addr: self.target_addr,
                identifier: self.identifier,
                interval: self.interval,
                timeout: self.timeout,
                deadline: self.deadline,
            },
            addr,
            clock,
            self.drop_privileges,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, Ticks};
    use crate::config::defaults;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use test_case::test_case;

    const SOURCE_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10));
    const TARGET_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(2, 2, 2, 2));

    #[test]
    fn test_builder_minimal() -> anyhow::Result<()> {
        let pinger = Builder::new(TARGET_ADDR).build()?;
        assert_eq!(TARGET_ADDR, pinger.target_addr());
        assert_eq!("2.2.2.2", pinger.target_name());
        assert_eq!(None, pinger.source_addr());
        assert_eq!(defaults::DEFAULT_PRIVILEGE_MODE, pinger.privilege_mode());
        assert_eq!(Identifier::from_process(), pinger.identifier());
        assert_eq!(
            defaults::DEFAULT_INITIAL_SEQUENCE,
            pinger.initial_sequence().0
        );
        assert_eq!(defaults::DEFAULT_PAYLOAD_SIZE, pinger.payload_size().0);
        assert_eq!(
            defaults::DEFAULT_PAYLOAD_PATTERN,
            pinger.payload_pattern().0
        );
        assert_eq!(defaults::DEFAULT_TTL, pinger.ttl().0);
        assert_eq!(None, pinger.count());
        assert_eq!(defaults::DEFAULT_INTERVAL, pinger.interval());
        assert_eq!(defaults::DEFAULT_TIMEOUT, pinger.timeout());
        assert_eq!(None, pinger.deadline());
        assert_eq!(defaults::DEFAULT_READ_TIMEOUT, pinger.read_timeout());
        assert!(pinger.statistics().rtts().is_empty());
        Ok(())
    }

    #[test]
    fn test_builder_full() -> anyhow::Result<()> {
        let clock = Arc::new(ManualClock::new(Ticks(0)));
        let pinger = Builder::new(TARGET_ADDR)
            .target_name("example.com")
            .source_addr(Some(SOURCE_ADDR))
            .privilege_mode(PrivilegeMode::Unprivileged)
            .identifier(Identifier(99))
            .initial_sequence(Sequence(100))
            .payload_size(PayloadSize(120))
            .payload_pattern(PayloadPattern(0xff))
            .ttl(TimeToLive(12))
            .count(Some(7))
            .interval(Duration::from_millis(250))
            .timeout(Duration::from_secs(2))
            .deadline(Some(Duration::from_secs(30)))
            .read_timeout(Duration::from_millis(5))
            .record_rtts(false)
            .policy(PlatformPolicy::WINDOWS)
            .clock(clock)
            .drop_privileges(true)
            .build()?;
        assert_eq!(TARGET_ADDR, pinger.target_addr());
        assert_eq!("example.com", pinger.target_name());
        assert_eq!("example.com", pinger.statistics().addr());
        assert_eq!(Some(SOURCE_ADDR), pinger.source_addr());
        assert_eq!(PrivilegeMode::Unprivileged, pinger.privilege_mode());
        assert_eq!(Identifier(99), pinger.identifier());
        assert_eq!(Sequence(100), pinger.initial_sequence());
        assert_eq!(PayloadSize(120), pinger.payload_size());
        assert_eq!(PayloadPattern(0xff), pinger.payload_pattern());
        assert_eq!(TimeToLive(12), pinger.ttl());
        assert_eq!(Some(7), pinger.count());
        assert_eq!(Duration::from_millis(250), pinger.interval());
        assert_eq!(Duration::from_secs(2), pinger.timeout());
        assert_eq!(Some(Duration::from_secs(30)), pinger.deadline());
        assert_eq!(Duration::from_millis(5), pinger.read_timeout());
        assert_eq!(148, pinger.message_length());
        assert_eq!(Duration::from_nanos(1), pinger.tick_duration());
        Ok(())
    }

    #[test_case(0; "empty")]
    #[test_case(7; "too small for timestamp")]
    #[test_case(MAX_PAYLOAD_SIZE + 1; "too large")]
    fn test_invalid_payload_size(size: usize) {
        let size = u16::try_from(size).unwrap();
        let result = Builder::new(TARGET_ADDR)
            .payload_size(PayloadSize(size))
            .build();
        assert!(matches!(result, Err(Error::InvalidPayloadSize(s)) if s == usize::from(size)));
    }

    #[test_case(8; "timestamp only")]
    #[test_case(1024; "large")]
    #[test_case(MAX_PAYLOAD_SIZE; "maximum")]
    fn test_valid_payload_size(size: usize) {
        let size = u16::try_from(size).unwrap();
        let result = Builder::new(TARGET_ADDR)
            .payload_size(PayloadSize(size))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_ttl() {
        let result = Builder::new(TARGET_ADDR).ttl(TimeToLive(0)).build();
        assert!(matches!(result, Err(Error::BadConfig(_))));
    }

    #[test_case(Duration::ZERO, Duration::from_secs(1), Duration::from_millis(10); "zero interval")]
    #[test_case(Duration::from_secs(1), Duration::ZERO, Duration::from_millis(10); "zero timeout")]
    #[test_case(Duration::from_secs(1), Duration::from_secs(1), Duration::ZERO; "zero read timeout")]
    #[test_case(Duration::from_millis(5), Duration::from_secs(1), Duration::from_millis(10); "read timeout exceeds interval")]
    fn test_invalid_durations(interval: Duration, timeout: Duration, read_timeout: Duration) {
        let result = Builder::new(TARGET_ADDR)
            .interval(interval)
            .timeout(timeout)
            .read_timeout(read_timeout)
            .build();
        let err = result.unwrap_err();
        assert!(matches!(err, Error::BadConfig(_)));
        assert!(err.is_config());
    }

    #[test]
    fn test_mismatched_source_family() {
        let result = Builder::new(TARGET_ADDR)
            .source_addr(Some(IpAddr::V6(Ipv6Addr::LOCALHOST)))
            .build();
        assert!(matches!(result, Err(Error::BadConfig(_))));
    }
}
