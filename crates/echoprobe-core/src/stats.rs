use std::net::IpAddr;
use std::time::Duration;

/// Run statistics.
///
/// A `Statistics` is a point in time snapshot, further replies do not change
/// a snapshot which has already been taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    addr: String,
    ip_addr: IpAddr,
    packets_sent: usize,
    packets_recv: usize,
    packets_recv_duplicates: usize,
    icmp_errors: usize,
    min_rtt: Option<Duration>,
    max_rtt: Option<Duration>,
    /// Running mean of the round trip time, in seconds.
    mean: f64,
    /// Running sum of squared differences from the mean, in seconds squared.
    m2: f64,
    record_rtts: bool,
    rtts: Vec<Duration>,
}

impl Statistics {
    pub(crate) fn new(addr: String, ip_addr: IpAddr, record_rtts: bool) -> Self {
        Self {
            addr,
            ip_addr,
            packets_sent: 0,
            packets_recv: 0,
            packets_recv_duplicates: 0,
            icmp_errors: 0,
            min_rtt: None,
            max_rtt: None,
            mean: 0_f64,
            m2: 0_f64,
            record_rtts,
            rtts: Vec::new(),
        }
    }

    /// The target as it was given, hostname or address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The target address.
    #[must_use]
    pub const fn ip_addr(&self) -> IpAddr {
        self.ip_addr
    }

    /// The number of echo requests sent.
    #[must_use]
    pub const fn packets_sent(&self) -> usize {
        self.packets_sent
    }

    /// The number of echo requests answered, excluding duplicates.
    #[must_use]
    pub const fn packets_recv(&self) -> usize {
        self.packets_recv
    }

    /// The number of duplicate replies received.
    #[must_use]
    pub const fn packets_recv_duplicates(&self) -> usize {
        self.packets_recv_duplicates
    }

    /// The number of echo requests answered by an ICMP error.
    #[must_use]
    pub const fn icmp_errors(&self) -> usize {
        self.icmp_errors
    }

    /// The % of echo requests which were not answered.
    #[must_use]
    pub fn packet_loss(&self) -> f64 {
        if self.packets_sent > 0 {
            let lost = self.packets_sent.saturating_sub(self.packets_recv);
            lost as f64 / self.packets_sent as f64 * 100_f64
        } else {
            0_f64
        }
    }

    /// The fastest round trip time, zero if no replies were received.
    #[must_use]
    pub fn min_rtt(&self) -> Duration {
        self.min_rtt.unwrap_or_default()
    }

    /// The slowest round trip time, zero if no replies were received.
    #[must_use]
    pub fn max_rtt(&self) -> Duration {
        self.max_rtt.unwrap_or_default()
    }

    /// The mean round trip time, zero if no replies were received.
    #[must_use]
    pub fn avg_rtt(&self) -> Duration {
        Duration::try_from_secs_f64(self.mean).unwrap_or_default()
    }

    /// The population standard deviation of the round trip time.
    #[must_use]
    pub fn stddev_rtt(&self) -> Duration {
        if self.packets_recv > 0 {
            let variance = (self.m2 / self.packets_recv as f64).max(0_f64);
            Duration::try_from_secs_f64(variance.sqrt()).unwrap_or_default()
        } else {
            Duration::ZERO
        }
    }

    /// Every round trip time received, in arrival order.
    ///
    /// Empty if recording is disabled.
    #[must_use]
    pub fn rtts(&self) -> &[Duration] {
        &self.rtts
    }

    pub(crate) fn record_sent(&mut self) {
        self.packets_sent += 1;
    }

    /// Withdraw a send which failed.
    pub(crate) fn unrecord_sent(&mut self) {
        self.packets_sent = self.packets_sent.saturating_sub(1);
    }

    pub(crate) fn record_rtt(&mut self, rtt: Duration) {
        self.packets_recv += 1;
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |min| min.min(rtt)));
        self.max_rtt = Some(self.max_rtt.map_or(rtt, |max| max.max(rtt)));
        let secs = rtt.as_secs_f64();
        let delta = secs - self.mean;
        self.mean += delta / self.packets_recv as f64;
        self.m2 += delta * (secs - self.mean);
        if self.record_rtts {
            self.rtts.push(rtt);
        }
    }

    pub(crate) fn record_duplicate(&mut self) {
        self.packets_recv_duplicates += 1;
    }

    pub(crate) fn record_icmp_error(&mut self) {
        self.icmp_errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use test_case::test_case;

    fn stats() -> Statistics {
        Statistics::new(
            String::from("localhost"),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            true,
        )
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn assert_close(expected: Duration, actual: Duration) {
        let diff = expected.abs_diff(actual);
        assert!(
            diff < Duration::from_nanos(10),
            "expected {expected:?}, actual {actual:?}"
        );
    }

    #[test]
    fn test_empty() {
        let stats = stats();
        assert_eq!(0, stats.packets_sent());
        assert_eq!(0_f64, stats.packet_loss());
        assert_eq!(Duration::ZERO, stats.min_rtt());
        assert_eq!(Duration::ZERO, stats.avg_rtt());
        assert_eq!(Duration::ZERO, stats.max_rtt());
        assert_eq!(Duration::ZERO, stats.stddev_rtt());
        assert!(stats.rtts().is_empty());
        assert_eq!("localhost", stats.addr());
    }

    #[test]
    fn test_rtt_summary() {
        let mut stats = stats();
        for rtt in [ms(10), ms(20), ms(30), ms(40)] {
            stats.record_sent();
            stats.record_rtt(rtt);
        }
        assert_eq!(ms(10), stats.min_rtt());
        assert_eq!(ms(40), stats.max_rtt());
        assert_close(ms(25), stats.avg_rtt());
        // population stddev of 10, 20, 30, 40 is sqrt(125)
        assert_close(Duration::from_secs_f64(125_f64.sqrt() / 1000_f64), stats.stddev_rtt());
        assert_eq!(&[ms(10), ms(20), ms(30), ms(40)], stats.rtts());
    }

    #[test]
    fn test_single_sample() {
        let mut stats = stats();
        stats.record_sent();
        stats.record_rtt(ms(7));
        assert_eq!(ms(7), stats.min_rtt());
        assert_eq!(ms(7), stats.max_rtt());
        assert_close(ms(7), stats.avg_rtt());
        assert_eq!(Duration::ZERO, stats.stddev_rtt());
    }

    #[test]
    fn test_rtts_not_recorded() {
        let mut stats = Statistics::new(
            String::from("localhost"),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            false,
        );
        stats.record_sent();
        stats.record_rtt(ms(7));
        assert_eq!(1, stats.packets_recv());
        assert!(stats.rtts().is_empty());
    }

    #[test_case(0, 0, 0_f64; "nothing sent")]
    #[test_case(5, 3, 40_f64; "two lost")]
    #[test_case(4, 4, 0_f64; "none lost")]
    #[test_case(3, 0, 100_f64; "all lost")]
    fn test_packet_loss(sent: usize, recv: usize, expected: f64) {
        let mut stats = stats();
        for _ in 0..sent {
            stats.record_sent();
        }
        for _ in 0..recv {
            stats.record_rtt(ms(1));
        }
        assert!((expected - stats.packet_loss()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unrecord_sent() {
        let mut stats = stats();
        stats.record_sent();
        stats.record_sent();
        stats.unrecord_sent();
        assert_eq!(1, stats.packets_sent());
        stats.unrecord_sent();
        stats.unrecord_sent();
        assert_eq!(0, stats.packets_sent());
    }

    #[test]
    fn test_counters() {
        let mut stats = stats();
        stats.record_duplicate();
        stats.record_duplicate();
        stats.record_icmp_error();
        assert_eq!(2, stats.packets_recv_duplicates());
        assert_eq!(1, stats.icmp_errors());
        assert_eq!(0, stats.packets_recv());
    }
}
