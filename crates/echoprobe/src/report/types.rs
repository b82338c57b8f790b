use echoprobe_core::{Echo, EchoStatus, IcmpPacketType};
use serde::{Serialize, Serializer};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Serialize)]
pub struct Report {
    pub packets: Vec<Packet>,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Packet {
    pub status: PacketStatus,
    pub id: u16,
    pub seq: u16,
    pub addr: String,
    pub ip_addr: IpAddr,
    pub bytes: usize,
    pub ttl: Option<u8>,
    #[serde(serialize_with = "fixed_width")]
    pub rtt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacketStatus {
    Received,
    Timeout,
    TimeExceeded,
    Unreachable,
}

impl Packet {
    pub fn new(addr: &str, echo: &Echo) -> Self {
        let status = match echo.status {
            EchoStatus::Received | EchoStatus::Duplicate => PacketStatus::Received,
            EchoStatus::TimedOut => PacketStatus::Timeout,
            EchoStatus::IcmpError(IcmpPacketType::TimeExceeded(_)) => PacketStatus::TimeExceeded,
            EchoStatus::IcmpError(_) => PacketStatus::Unreachable,
        };
        Self {
            status,
            id: echo.identifier.0,
            seq: echo.sequence.0,
            addr: addr.to_string(),
            ip_addr: echo.addr,
            bytes: echo.bytes,
            ttl: echo.ttl.map(|ttl| ttl.0),
            rtt: millis(echo.rtt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub addr: String,
    pub ip_addr: IpAddr,
    pub packets_sent: usize,
    pub packets_recv: usize,
    pub packets_recv_duplicates: usize,
    pub icmp_errors: usize,
    #[serde(serialize_with = "fixed_width")]
    pub packet_loss: f64,
    #[serde(serialize_with = "fixed_width")]
    pub min_rtt: f64,
    #[serde(serialize_with = "fixed_width")]
    pub avg_rtt: f64,
    #[serde(serialize_with = "fixed_width")]
    pub max_rtt: f64,
    #[serde(serialize_with = "fixed_width")]
    pub stddev_rtt: f64,
    pub rtts: Vec<f64>,
}

impl From<&echoprobe_core::Statistics> for Statistics {
    fn from(value: &echoprobe_core::Statistics) -> Self {
        Self {
            addr: value.addr().to_string(),
            ip_addr: value.ip_addr(),
            packets_sent: value.packets_sent(),
            packets_recv: value.packets_recv(),
            packets_recv_duplicates: value.packets_recv_duplicates(),
            icmp_errors: value.icmp_errors(),
            packet_loss: value.packet_loss(),
            min_rtt: millis(value.min_rtt()),
            avg_rtt: millis(value.avg_rtt()),
            max_rtt: millis(value.max_rtt()),
            stddev_rtt: millis(value.stddev_rtt()),
            rtts: value.rtts().iter().copied().map(millis).collect(),
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000_f64
}

pub fn fixed_width<S>(val: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{val:.2}"))
}
