use crate::report::types::{Packet, PacketStatus, Statistics};
use echoprobe_core::{Echo, Error, Handler, Pinger};

/// Print one line per echo reply followed by a statistics summary.
pub struct TextReport {
    addr: String,
}

impl TextReport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Handler for TextReport {
    fn on_recv(&self, echo: &Echo) {
        println!("{}", format_packet(&Packet::new(&self.addr, echo), false));
    }

    fn on_duplicate(&self, echo: &Echo) {
        println!("{}", format_packet(&Packet::new(&self.addr, echo), true));
    }

    fn on_timeout(&self, echo: &Echo) {
        println!("{}", format_packet(&Packet::new(&self.addr, echo), false));
    }

    fn on_icmp_error(&self, echo: &Echo) {
        println!("{}", format_packet(&Packet::new(&self.addr, echo), false));
    }

    fn on_error(&self, err: &Error) {
        eprintln!("error: {err}");
    }

    fn on_finish(&self, stats: &echoprobe_core::Statistics) {
        println!("{}", format_statistics(&Statistics::from(stats)));
    }
}

/// The line printed before the first echo request is sent.
pub fn format_header(pinger: &Pinger) -> String {
    let payload_size = usize::from(pinger.payload_size().0);
    format!(
        "PING {} ({}) {}({}) bytes of data:",
        pinger.target_name(),
        pinger.target_addr(),
        payload_size,
        pinger.message_length()
    )
}

fn format_packet(packet: &Packet, duplicate: bool) -> String {
    let ttl = packet.ttl.map_or(-1, i16::from);
    match packet.status {
        PacketStatus::Received => {
            let dup = if duplicate { " (DUP!)" } else { "" };
            format!(
                "{} bytes from {}: icmp_seq={} ttl={} time={:.3} ms{}",
                packet.bytes, packet.ip_addr, packet.seq, ttl, packet.rtt, dup
            )
        }
        PacketStatus::Timeout => format!(
            "Timeout! : icmp_seq={}  ttl={} time=>{:.3} ms",
            packet.seq, ttl, packet.rtt
        ),
        PacketStatus::TimeExceeded => format!(
            "From {} icmp_seq={} Time to live exceeded",
            packet.ip_addr, packet.seq
        ),
        PacketStatus::Unreachable => format!(
            "From {} icmp_seq={} Destination unreachable",
            packet.ip_addr, packet.seq
        ),
    }
}

fn format_statistics(stats: &Statistics) -> String {
    format!(
        "\n--- {} ping statistics ---\n\
        {} packets transmitted, {} packets received, {} duplicates, {}% packet loss\n\
        round-trip min/avg/max/stddev = {:.3}/{:.3}/{:.3}/{:.3} ms",
        stats.addr,
        stats.packets_sent,
        stats.packets_recv,
        stats.packets_recv_duplicates,
        stats.packet_loss,
        stats.min_rtt,
        stats.avg_rtt,
        stats.max_rtt,
        stats.stddev_rtt
    )
}
