use crate::config::{AddressFamilyConfig, LogFormat, LogSpanEvents};

/// The default value for `udp`.
///
/// Datagram `ICMP` sockets are used by default everywhere except Windows, where only raw
/// sockets are available.
pub const DEFAULT_UDP: bool = cfg!(not(windows));

/// The default value for `addr-family`.
pub const DEFAULT_ADDR_FAMILY: AddressFamilyConfig = AddressFamilyConfig::System;

/// The default value for `json`.
pub const DEFAULT_JSON: bool = false;

/// The default value for `debug`.
pub const DEFAULT_DEBUG: bool = false;

/// The default value for `log-format`.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Pretty;

/// The default value for `log-span-events`.
pub const DEFAULT_LOG_SPAN_EVENTS: LogSpanEvents = LogSpanEvents::Off;

/// The default value for `log-filter`.
pub const DEFAULT_LOG_FILTER: &str = "echoprobe=debug,echoprobe_core=debug";
