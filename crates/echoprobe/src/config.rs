use anyhow::anyhow;
use clap::ValueEnum;
use echoprobe_core::{
    defaults, PayloadPattern, PayloadSize, PrivilegeMode, TimeToLive, MAX_PAYLOAD_SIZE,
    MIN_PAYLOAD_SIZE,
};
use echoprobe_privilege::Privilege;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::time::Duration;

mod cmd;
mod constants;
mod file;

pub use cmd::Args;

/// The address family to resolve the target to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressFamilyConfig {
    /// IPv4 only.
    Ipv4,
    /// IPv6 only.
    Ipv6,
    /// The first address returned by the OS resolver, of either family.
    System,
}

impl Display for AddressFamilyConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
            Self::System => write!(f, "system"),
        }
    }
}

/// How to render the results of a run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OutputFormat {
    /// One line per event followed by a statistics summary.
    Text,
    /// A single json document once the run is complete.
    Json,
}

/// How to format log data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// How to log event spans.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogSpanEvents {
    /// Do not display event spans.
    Off,
    /// Display enter and exit event spans.
    Active,
    /// Display all event spans.
    Full,
}

/// Fully parsed and validated configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EchoprobeConfig {
    pub target: String,
    pub addr_family: AddressFamilyConfig,
    pub count: Option<usize>,
    pub interval: Duration,
    pub timeout: Duration,
    pub deadline: Option<Duration>,
    pub payload_size: PayloadSize,
    pub payload_pattern: PayloadPattern,
    pub ttl: TimeToLive,
    pub source_addr: Option<IpAddr>,
    pub privilege_mode: PrivilegeMode,
    pub output: OutputFormat,
    pub debug: bool,
    pub verbose: bool,
    pub log_format: LogFormat,
    pub log_filter: String,
    pub log_span_events: LogSpanEvents,
}

impl EchoprobeConfig {
    pub fn from(args: Args, privilege: &Privilege) -> anyhow::Result<Self> {
        let cfg_file = if let Some(cfg) = &args.config_file {
            file::read_config_file(cfg)?
        } else {
            file::ConfigFile::default()
        };
        Self::build_config(args, cfg_file, privilege)
    }

    fn build_config(
        args: Args,
        cfg_file: file::ConfigFile,
        privilege: &Privilege,
    ) -> anyhow::Result<Self> {
        let cfg_file_ping = cfg_file.ping.unwrap_or_default();
        let cfg_file_output = cfg_file.output.unwrap_or_default();
        let cfg_file_log = cfg_file.log.unwrap_or_default();
        let udp = if args.privileged {
            false
        } else {
            cfg_layer_bool_flag(args.udp, cfg_file_ping.udp, constants::DEFAULT_UDP)
        };
        let privilege_mode = if udp {
            PrivilegeMode::Unprivileged
        } else {
            PrivilegeMode::Privileged
        };
        let addr_family = match (args.ipv4, args.ipv6) {
            (true, _) => AddressFamilyConfig::Ipv4,
            (_, true) => AddressFamilyConfig::Ipv6,
            (false, false) => cfg_file_ping
                .addr_family
                .unwrap_or(constants::DEFAULT_ADDR_FAMILY),
        };
        let count = cfg_layer_opt(args.count, cfg_file_ping.count);
        let interval = cfg_layer(
            args.interval,
            cfg_file_ping.interval,
            defaults::DEFAULT_INTERVAL,
        );
        let timeout = cfg_layer(
            args.timeout,
            cfg_file_ping.timeout,
            defaults::DEFAULT_TIMEOUT,
        );
        let deadline = cfg_layer_opt(args.deadline, cfg_file_ping.deadline);
        let payload_size = cfg_layer(
            args.size,
            cfg_file_ping.size,
            defaults::DEFAULT_PAYLOAD_SIZE,
        );
        let payload_pattern = cfg_layer(
            args.payload_pattern,
            cfg_file_ping.payload_pattern,
            defaults::DEFAULT_PAYLOAD_PATTERN,
        );
        let ttl = cfg_layer(args.ttl, cfg_file_ping.ttl, defaults::DEFAULT_TTL);
        let source_addr = cfg_layer_opt(args.source_addr, cfg_file_ping.source_addr);
        let json = cfg_layer_bool_flag(args.json, cfg_file_output.json, constants::DEFAULT_JSON);
        let debug = cfg_layer_bool_flag(
            args.debug,
            cfg_file_output.debug,
            constants::DEFAULT_DEBUG,
        );
        let verbose = args.verbose;
        let log_format = cfg_layer(
            args.log_format,
            cfg_file_log.log_format,
            constants::DEFAULT_LOG_FORMAT,
        );
        let log_filter = cfg_layer(
            args.log_filter,
            cfg_file_log.log_filter,
            String::from(constants::DEFAULT_LOG_FILTER),
        );
        let log_span_events = cfg_layer(
            args.log_span_events,
            cfg_file_log.log_span_events,
            constants::DEFAULT_LOG_SPAN_EVENTS,
        );
        validate_privilege(privilege_mode, privilege)?;
        validate_payload_size(payload_size)?;
        validate_ttl(ttl)?;
        validate_durations(interval, timeout, deadline)?;
        validate_source_addr(source_addr, addr_family)?;
        Ok(Self {
            target: args.target,
            addr_family,
            count,
            interval,
            timeout,
            deadline,
            payload_size: PayloadSize(payload_size),
            payload_pattern: PayloadPattern(payload_pattern),
            ttl: TimeToLive(ttl),
            source_addr,
            privilege_mode,
            output: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            debug,
            verbose,
            log_format,
            log_filter,
            log_span_events,
        })
    }
}

fn cfg_layer<T>(fst: Option<T>, snd: Option<T>, def: T) -> T {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => val,
        (None, None) => def,
    }
}

fn cfg_layer_opt<T>(fst: Option<T>, snd: Option<T>) -> Option<T> {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => Some(val),
        (None, None) => None,
    }
}

const fn cfg_layer_bool_flag(fst: bool, snd: Option<bool>, default: bool) -> bool {
    match (fst, snd) {
        (true, _) => true,
        (false, Some(val)) => val,
        (false, None) => default,
    }
}

/// Validate that the chosen privilege mode can be used on this platform.
fn validate_privilege(privilege_mode: PrivilegeMode, privilege: &Privilege) -> anyhow::Result<()> {
    match (
        privilege_mode,
        privilege.has_privileges(),
        privilege.unprivileged_supported(),
    ) {
        (PrivilegeMode::Privileged, true, _) | (PrivilegeMode::Unprivileged, _, true) => Ok(()),
        (PrivilegeMode::Privileged, false, true) => Err(anyhow!(
            "privileges are required to use raw sockets, use --udp to ping without privileges"
        )),
        (PrivilegeMode::Privileged, false, false) => {
            Err(anyhow!("privileges are required to use raw sockets"))
        }
        (PrivilegeMode::Unprivileged, _, false) => Err(anyhow!(
            "unprivileged mode is not supported on this platform, use --privileged"
        )),
    }
}

fn validate_payload_size(payload_size: u16) -> anyhow::Result<()> {
    if (MIN_PAYLOAD_SIZE..=MAX_PAYLOAD_SIZE).contains(&usize::from(payload_size)) {
        Ok(())
    } else {
        Err(anyhow!(
            "size ({payload_size}) must be between {MIN_PAYLOAD_SIZE} and {MAX_PAYLOAD_SIZE} inclusive"
        ))
    }
}

fn validate_ttl(ttl: u8) -> anyhow::Result<()> {
    if ttl == 0 {
        Err(anyhow!("ttl ({ttl}) must be between 1 and 255 inclusive"))
    } else {
        Ok(())
    }
}

fn validate_durations(
    interval: Duration,
    timeout: Duration,
    deadline: Option<Duration>,
) -> anyhow::Result<()> {
    if interval.is_zero() {
        Err(anyhow!("interval must be greater than zero"))
    } else if timeout.is_zero() {
        Err(anyhow!("timeout must be greater than zero"))
    } else if deadline.is_some_and(|deadline| deadline.is_zero()) {
        Err(anyhow!("deadline must be greater than zero"))
    } else {
        Ok(())
    }
}

fn validate_source_addr(
    source_addr: Option<IpAddr>,
    addr_family: AddressFamilyConfig,
) -> anyhow::Result<()> {
    match (source_addr, addr_family) {
        (Some(IpAddr::V6(addr)), AddressFamilyConfig::Ipv4) => Err(anyhow!(
            "source address {addr} is not an IPv4 address"
        )),
        (Some(IpAddr::V4(addr)), AddressFamilyConfig::Ipv6) => Err(anyhow!(
            "source address {addr} is not an IPv6 address"
        )),
        _ => Ok(()),
    }
}
