use crate::report::types::{Packet, Report, Statistics};
use echoprobe_core::{Echo, Handler};
use parking_lot::Mutex;
use std::io::Write;
use tracing::instrument;

/// Collect echo replies and timeouts to be written as a single json document.
///
/// Duplicate replies are counted in the statistics but are not listed as packets.
pub struct JsonReport {
    addr: String,
    packets: Mutex<Vec<Packet>>,
}

impl JsonReport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            packets: Mutex::new(Vec::new()),
        }
    }

    /// Write the collected packets and the final statistics.
    #[instrument(skip_all, level = "trace")]
    pub fn write<W: Write>(
        &self,
        writer: W,
        stats: &echoprobe_core::Statistics,
    ) -> anyhow::Result<()> {
        let report = Report {
            packets: std::mem::take(&mut *self.packets.lock()),
            statistics: Statistics::from(stats),
        };
        serde_json::to_writer(writer, &report)?;
        Ok(())
    }

    fn push(&self, echo: &Echo) {
        self.packets.lock().push(Packet::new(&self.addr, echo));
    }
}

impl Handler for JsonReport {
    fn on_recv(&self, echo: &Echo) {
        self.push(echo);
    }

    fn on_timeout(&self, echo: &Echo) {
        self.push(echo);
    }

    fn on_icmp_error(&self, echo: &Echo) {
        self.push(echo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::PacketStatus;
    use echoprobe_core::{
        EchoStatus, IcmpPacketCode, IcmpPacketType, Identifier, Sequence, TimeToLive,
    };
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));

    fn echo(status: EchoStatus, seq: u16, ttl: Option<u8>, rtt: Duration) -> Echo {
        Echo {
            status,
            identifier: Identifier(1234),
            sequence: Sequence(seq),
            addr: ADDR,
            ttl: ttl.map(TimeToLive),
            bytes: 64,
            rtt,
        }
    }

    #[test]
    fn test_collects_packets() {
        let report = JsonReport::new("example.com");
        report.on_recv(&echo(
            EchoStatus::Received,
            0,
            Some(57),
            Duration::from_millis(12),
        ));
        report.on_duplicate(&echo(
            EchoStatus::Duplicate,
            0,
            Some(57),
            Duration::from_millis(13),
        ));
        report.on_timeout(&echo(
            EchoStatus::TimedOut,
            1,
            None,
            Duration::from_secs(10),
        ));
        report.on_icmp_error(&echo(
            EchoStatus::IcmpError(IcmpPacketType::TimeExceeded(IcmpPacketCode(0))),
            2,
            Some(250),
            Duration::from_millis(4),
        ));
        let packets = report.packets.lock();
        let statuses = packets.iter().map(|p| p.status).collect::<Vec<_>>();
        assert_eq!(
            vec![
                PacketStatus::Received,
                PacketStatus::Timeout,
                PacketStatus::TimeExceeded
            ],
            statuses
        );
        assert_eq!("example.com", packets[0].addr);
        assert_eq!(Some(57), packets[0].ttl);
        assert!((packets[0].rtt - 12_f64).abs() < f64::EPSILON);
        assert_eq!(None, packets[1].ttl);
        assert!((packets[1].rtt - 10_000_f64).abs() < f64::EPSILON);
    }

    #[test]
    fn test_packet_json() -> anyhow::Result<()> {
        let packet = Packet::new(
            "example.com",
            &echo(EchoStatus::TimedOut, 7, None, Duration::from_millis(1500)),
        );
        let expected = r#"{"status":"timeout","id":1234,"seq":7,"addr":"example.com","ip_addr":"192.0.2.1","bytes":64,"ttl":null,"rtt":"1500.00"}"#;
        assert_eq!(expected, serde_json::to_string(&packet)?);
        Ok(())
    }
}
