use crate::config::{LogFormat, LogSpanEvents};
use clap::builder::Styles;
use clap::Parser;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// Send ICMP echo requests to a host and report round trip times
#[derive(Parser, Debug)]
#[command(
    name = "echoprobe",
    author,
    version,
    about,
    long_about = None,
    arg_required_else_help(true),
    styles=Styles::styled(),
    after_help = USAGE_EXAMPLES
)]
pub struct Args {
    /// The hostname or IP address to ping
    pub target: String,

    /// Config file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<String>,

    /// Stop after sending this many echo requests [default: unbounded]
    #[arg(short = 'c', long)]
    pub count: Option<usize>,

    /// The time to wait between sending echo requests [default: 1s]
    #[arg(short = 'i', long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// The time to wait for the reply to each echo request [default: 10s]
    #[arg(short = 't', long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Stop after this duration regardless of how many requests were sent [default: none]
    #[arg(short = 'w', long, value_parser = parse_duration)]
    pub deadline: Option<Duration>,

    /// The number of payload bytes to send [default: 56]
    #[arg(short = 's', long)]
    pub size: Option<u16>,

    /// The payload filler byte [default: 0]
    #[arg(short = 'p', long)]
    pub payload_pattern: Option<u8>,

    /// The time-to-live (TTL) of echo requests [default: 64]
    #[arg(short = 'l', long)]
    pub ttl: Option<u8>,

    /// The source IP address [default: OS chooses]
    #[arg(long, value_parser = parse_addr)]
    pub source_addr: Option<IpAddr>,

    /// Ping without requiring elevated privileges on supported platforms [default: true except on Windows]
    #[arg(long, conflicts_with = "privileged")]
    pub udp: bool,

    /// Ping using raw sockets, requires elevated privileges [default: false except on Windows]
    #[arg(long, conflicts_with = "udp")]
    pub privileged: bool,

    /// Use IPv4 only
    #[arg(short = '4', long, conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Use IPv6 only
    #[arg(short = '6', long, conflicts_with = "ipv4")]
    pub ipv6: bool,

    /// Print the precision of the clock before pinging
    #[arg(long)]
    pub debug: bool,

    /// Output a json report instead of one line per echo reply
    #[arg(long)]
    pub json: bool,

    /// The debug log format [default: pretty]
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// The debug log filter [default: echoprobe=debug]
    #[arg(long)]
    pub log_filter: Option<String>,

    /// The debug log span events [default: off]
    #[arg(long)]
    pub log_span_events: Option<LogSpanEvents>,

    /// Enable verbose debug logging
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

const USAGE_EXAMPLES: &str = "\
Examples:
  # ping continuously
  echoprobe www.example.com

  # ping 5 times
  echoprobe -c 5 www.example.com

  # ping 5 times at 500ms intervals
  echoprobe -c 5 -i 500ms www.example.com

  # ping for 5 seconds
  echoprobe -w 5s www.example.com

  # ping with raw sockets
  sudo echoprobe --privileged www.example.com";

fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    Ok(humantime::parse_duration(value)?)
}

fn parse_addr(value: &str) -> anyhow::Result<IpAddr> {
    Ok(IpAddr::from_str(value)?)
}
