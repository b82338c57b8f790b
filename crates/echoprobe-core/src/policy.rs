//! Per-platform rules for framing, identifier matching and length reporting.
//!
//! The rules are plain data selected once for the build target and can be
//! replaced through the builder, which lets every platform's behaviour be
//! exercised on any host.
use crate::config::{IpVersion, PrivilegeMode};
use crate::types::{Identifier, PayloadSize};
use echoprobe_packet::icmp::HEADER_SIZE;

const IPV4_HEADER_SIZE: usize = 20;
const IPV6_HEADER_SIZE: usize = 40;

/// How the identifier of a reply is compared with the identifier of the run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IdentifierMatch {
    /// The identifier must always match.
    Strict,
    /// The identifier must match for raw sockets only.
    ///
    /// The kernel replaces the identifier of echo requests sent from datagram `ICMP` sockets
    /// with the local port of the socket and only delivers replies for that socket, so only the
    /// sequence is used to match replies in unprivileged mode.
    PrivilegedOnly,
}

/// How the on-wire size of an echo message is reported.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LengthAccounting {
    /// The `ICMP` header and payload.
    IcmpMessage,
    /// The `ICMP` header and payload plus a minimal IP header.
    IncludingIpHeader,
}

/// Platform specific probing rules.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PlatformPolicy {
    pub identifier_match: IdentifierMatch,
    pub length_accounting: LengthAccounting,
    /// Do unprivileged `IPv4` sockets deliver replies with their IP header?
    pub unprivileged_ipv4_header: bool,
}

impl PlatformPolicy {
    /// Linux and Android.
    pub const LINUX: Self = Self {
        identifier_match: IdentifierMatch::PrivilegedOnly,
        length_accounting: LengthAccounting::IcmpMessage,
        unprivileged_ipv4_header: false,
    };

    /// macOS and the BSDs.
    pub const BSD: Self = Self {
        identifier_match: IdentifierMatch::Strict,
        length_accounting: LengthAccounting::IcmpMessage,
        unprivileged_ipv4_header: true,
    };

    /// Windows.
    pub const WINDOWS: Self = Self {
        identifier_match: IdentifierMatch::Strict,
        length_accounting: LengthAccounting::IncludingIpHeader,
        unprivileged_ipv4_header: true,
    };

    /// The policy for the platform this crate was built for.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(any(target_os = "linux", target_os = "android")) {
            Self::LINUX
        } else if cfg!(windows) {
            Self::WINDOWS
        } else {
            Self::BSD
        }
    }

    /// The reported length of an echo message carrying `size` bytes of payload.
    #[must_use]
    pub const fn message_length(&self, size: PayloadSize, version: IpVersion) -> usize {
        let icmp = size.0 as usize + HEADER_SIZE;
        match (self.length_accounting, version) {
            (LengthAccounting::IcmpMessage, _) => icmp,
            (LengthAccounting::IncludingIpHeader, IpVersion::V4) => icmp + IPV4_HEADER_SIZE,
            (LengthAccounting::IncludingIpHeader, IpVersion::V6) => icmp + IPV6_HEADER_SIZE,
        }
    }

    /// Does a reply carrying identifier `reply` belong to a run using identifier `own`?
    #[must_use]
    pub const fn matches_identifier(
        &self,
        reply: Identifier,
        own: Identifier,
        privilege_mode: PrivilegeMode,
    ) -> bool {
        match (self.identifier_match, privilege_mode) {
            (IdentifierMatch::PrivilegedOnly, PrivilegeMode::Unprivileged) => true,
            _ => reply.0 == own.0,
        }
    }

    /// Do frames read from the socket begin with an IP header?
    ///
    /// `IPv6` sockets never deliver the IP header.
    #[must_use]
    pub const fn includes_ip_header(&self, version: IpVersion, mode: PrivilegeMode) -> bool {
        match (version, mode) {
            (IpVersion::V6, _) => false,
            (IpVersion::V4, PrivilegeMode::Privileged) => true,
            (IpVersion::V4, PrivilegeMode::Unprivileged) => self.unprivileged_ipv4_header,
        }
    }
}

impl Default for PlatformPolicy {
    fn default() -> Self {
        Self::native()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(PlatformPolicy::LINUX, 56, IpVersion::V4, 64; "linux ipv4")]
    #[test_case(PlatformPolicy::LINUX, 56, IpVersion::V6, 64; "linux ipv6")]
    #[test_case(PlatformPolicy::BSD, 8, IpVersion::V4, 16; "bsd minimum")]
    #[test_case(PlatformPolicy::WINDOWS, 56, IpVersion::V4, 84; "windows ipv4")]
    #[test_case(PlatformPolicy::WINDOWS, 56, IpVersion::V6, 104; "windows ipv6")]
    fn test_message_length(
        policy: PlatformPolicy,
        size: u16,
        version: IpVersion,
        expected: usize,
    ) {
        assert_eq!(expected, policy.message_length(PayloadSize(size), version));
    }

    #[test_case(PlatformPolicy::LINUX, 1234, PrivilegeMode::Unprivileged, true; "linux unprivileged ignores id")]
    #[test_case(PlatformPolicy::LINUX, 1234, PrivilegeMode::Privileged, false; "linux privileged checks id")]
    #[test_case(PlatformPolicy::LINUX, 42, PrivilegeMode::Privileged, true; "linux privileged same id")]
    #[test_case(PlatformPolicy::BSD, 1234, PrivilegeMode::Unprivileged, false; "bsd unprivileged checks id")]
    #[test_case(PlatformPolicy::WINDOWS, 1234, PrivilegeMode::Privileged, false; "windows checks id")]
    #[test_case(PlatformPolicy::WINDOWS, 42, PrivilegeMode::Privileged, true; "windows same id")]
    fn test_matches_identifier(
        policy: PlatformPolicy,
        reply: u16,
        mode: PrivilegeMode,
        expected: bool,
    ) {
        assert_eq!(
            expected,
            policy.matches_identifier(Identifier(reply), Identifier(42), mode)
        );
    }

    #[test_case(PlatformPolicy::LINUX, IpVersion::V4, PrivilegeMode::Privileged, true; "linux raw ipv4")]
    #[test_case(PlatformPolicy::LINUX, IpVersion::V4, PrivilegeMode::Unprivileged, false; "linux dgram ipv4")]
    #[test_case(PlatformPolicy::BSD, IpVersion::V4, PrivilegeMode::Unprivileged, true; "bsd dgram ipv4")]
    #[test_case(PlatformPolicy::BSD, IpVersion::V6, PrivilegeMode::Privileged, false; "bsd raw ipv6")]
    #[test_case(PlatformPolicy::WINDOWS, IpVersion::V6, PrivilegeMode::Privileged, false; "windows raw ipv6")]
    fn test_includes_ip_header(
        policy: PlatformPolicy,
        version: IpVersion,
        mode: PrivilegeMode,
        expected: bool,
    ) {
        assert_eq!(expected, policy.includes_ip_header(version, mode));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_native_linux() {
        assert_eq!(PlatformPolicy::LINUX, PlatformPolicy::native());
    }
}
