use crate::clock::Ticks;
use crate::config::SessionConfig;
use crate::probe::{IcmpPacketType, Probe, Reply};
use crate::stats::Statistics;
use crate::types::{Identifier, Sequence};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::Duration;

/// The classification of a [`Reply`] against the probes of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The first echo reply for an outstanding probe.
    Received,
    /// A further echo reply for a probe which has already been answered.
    Duplicate,
    /// An ICMP error for an outstanding probe, which is now settled as lost.
    IcmpError,
    /// A reply for a probe which is not outstanding, such as a late reply for a probe which
    /// already timed out.
    Unknown,
    /// A reply for a different identifier.
    Foreign,
}

/// The mutable state of a run.
///
/// A session tracks which probes are awaiting a reply, which have been answered and the
/// accumulated statistics.  It is owned by a single lock and every method runs as one
/// critical section.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    next_sequence: Sequence,
    /// The number of probes assigned, including any which failed to send.
    attempted: usize,
    /// Probes awaiting a reply and the tick count they were sent at, in send order.
    outstanding: IndexMap<Sequence, Ticks>,
    /// Outstanding probes whose sequence was reused after wrapping, settled as lost by the next
    /// call to [`Session::expire`].
    superseded: Vec<Sequence>,
    /// The number of echo replies seen for each answered probe.
    seen: HashMap<Sequence, usize>,
    stats: Statistics,
}

impl Session {
    #[must_use]
    pub fn new(config: SessionConfig, addr: String) -> Self {
        Self {
            config,
            next_sequence: config.initial_sequence,
            attempted: 0,
            outstanding: IndexMap::new(),
            superseded: Vec::new(),
            seen: HashMap::new(),
            stats: Statistics::new(addr, config.target_addr, config.record_rtts),
        }
    }

    #[must_use]
    pub const fn identifier(&self) -> Identifier {
        self.config.identifier
    }

    /// Assign the next sequence and mark it outstanding.
    ///
    /// The probe is counted as sent, use [`Session::fail_probe`] to withdraw it if it could not
    /// be sent.  Returns `None` once the configured count has been reached.
    ///
    /// If the sequence wrapped onto a probe which is still awaiting a reply, that probe can no
    /// longer be matched and is returned by the next [`Session::expire`].
    pub fn next_probe(&mut self, sent: Ticks) -> Option<Probe> {
        if self.count_reached() {
            return None;
        }
        let sequence = self.next_sequence;
        self.next_sequence = sequence.next();
        self.attempted += 1;
        // after wrapping, a sequence number is a new probe
        self.seen.remove(&sequence);
        if self.outstanding.shift_remove(&sequence).is_some() {
            self.superseded.push(sequence);
        }
        self.outstanding.insert(sequence, sent);
        self.stats.record_sent();
        Some(Probe::new(
            sequence,
            self.config.identifier,
            self.config.ttl,
            self.config.payload_size,
            sent,
        ))
    }

    /// Withdraw a probe which could not be sent.
    pub fn fail_probe(&mut self, sequence: Sequence) {
        if self.outstanding.shift_remove(&sequence).is_some() {
            self.stats.unrecord_sent();
        }
    }

    /// Classify `reply` and update the session accordingly.
    ///
    /// `rtt` is the round trip time measured from the reply and is recorded for the first echo
    /// reply of an outstanding probe.
    pub fn classify(&mut self, reply: &Reply, rtt: Duration) -> Classification {
        if !self.config.policy.matches_identifier(
            reply.identifier,
            self.config.identifier,
            self.config.privilege_mode,
        ) {
            return Classification::Foreign;
        }
        match reply.kind {
            IcmpPacketType::EchoReply => {
                if self.outstanding.shift_remove(&reply.sequence).is_some() {
                    self.seen.insert(reply.sequence, 1);
                    self.stats.record_rtt(rtt);
                    Classification::Received
                } else if let Some(count) = self.seen.get_mut(&reply.sequence) {
                    *count += 1;
                    self.stats.record_duplicate();
                    Classification::Duplicate
                } else {
                    Classification::Unknown
                }
            }
            IcmpPacketType::TimeExceeded(_) | IcmpPacketType::Unreachable(_) => {
                if self.outstanding.shift_remove(&reply.sequence).is_some() {
                    self.stats.record_icmp_error();
                    Classification::IcmpError
                } else {
                    Classification::Unknown
                }
            }
        }
    }

    /// Remove and return every outstanding probe which has waited for `timeout` or longer,
    /// preceded by any probes superseded by a reused sequence.
    ///
    /// `elapsed` converts the tick count a probe was sent at to the time it has waited.
    pub fn expire(
        &mut self,
        timeout: Duration,
        elapsed: impl Fn(Ticks) -> Duration,
    ) -> Vec<Sequence> {
        let mut expired = std::mem::take(&mut self.superseded);
        self.outstanding.retain(|&sequence, &mut sent| {
            if elapsed(sent) >= timeout {
                expired.push(sequence);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Has every probe been sent and settled?
    ///
    /// Always false for an unbounded run.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.count_reached() && self.outstanding.is_empty() && self.superseded.is_empty()
    }

    /// The number of probes not yet settled.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.len() + self.superseded.len()
    }

    /// A snapshot of the statistics.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        self.stats.clone()
    }

    fn count_reached(&self) -> bool {
        self.config
            .count
            .is_some_and(|count| self.attempted >= count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrivilegeMode;
    use crate::policy::PlatformPolicy;
    use crate::probe::IcmpPacketCode;
    use std::net::{IpAddr, Ipv4Addr};

    const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn session(count: Option<usize>) -> Session {
        let config = SessionConfig {
            target_addr: TARGET,
            identifier: Identifier(42),
            initial_sequence: Sequence(1),
            count,
            policy: PlatformPolicy::BSD,
            ..SessionConfig::default()
        };
        Session::new(config, String::from("localhost"))
    }

    fn reply(kind: IcmpPacketType, identifier: u16, sequence: u16) -> Reply {
        Reply {
            kind,
            identifier: Identifier(identifier),
            sequence: Sequence(sequence),
            payload: vec![0; 56],
            addr: TARGET,
            ttl: None,
            bytes: 64,
            received: Ticks(0),
        }
    }

    fn echo_reply(sequence: u16) -> Reply {
        reply(IcmpPacketType::EchoReply, 42, sequence)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_next_probe_assigns_sequences() {
        let mut session = session(Some(3));
        let sequences = (0..5)
            .filter_map(|i| session.next_probe(Ticks(i)))
            .map(|probe| probe.sequence)
            .collect::<Vec<_>>();
        assert_eq!(vec![Sequence(1), Sequence(2), Sequence(3)], sequences);
        assert_eq!(3, session.statistics().packets_sent());
        assert_eq!(3, session.outstanding());
    }

    #[test]
    fn test_classify_received_then_duplicate() {
        let mut session = session(None);
        session.next_probe(Ticks(0));
        assert_eq!(
            Classification::Received,
            session.classify(&echo_reply(1), ms(5))
        );
        assert_eq!(
            Classification::Duplicate,
            session.classify(&echo_reply(1), ms(6))
        );
        assert_eq!(
            Classification::Duplicate,
            session.classify(&echo_reply(1), ms(7))
        );
        let stats = session.statistics();
        assert_eq!(1, stats.packets_recv());
        assert_eq!(2, stats.packets_recv_duplicates());
        assert_eq!(&[ms(5)], stats.rtts());
    }

    #[test]
    fn test_classify_foreign_identifier() {
        let mut session = session(None);
        session.next_probe(Ticks(0));
        let foreign = reply(IcmpPacketType::EchoReply, 7, 1);
        assert_eq!(Classification::Foreign, session.classify(&foreign, ms(1)));
        assert_eq!(1, session.outstanding());
        assert_eq!(0, session.statistics().packets_recv());
    }

    #[test]
    fn test_classify_unprivileged_linux_ignores_identifier() {
        let config = SessionConfig {
            identifier: Identifier(42),
            privilege_mode: PrivilegeMode::Unprivileged,
            policy: PlatformPolicy::LINUX,
            ..SessionConfig::default()
        };
        let mut session = Session::new(config, String::from("localhost"));
        let probe = session.next_probe(Ticks(0));
        assert!(probe.is_some());
        let rewritten = reply(IcmpPacketType::EchoReply, 5555, 0);
        assert_eq!(
            Classification::Received,
            session.classify(&rewritten, ms(1))
        );
    }

    #[test]
    fn test_classify_unknown_sequence() {
        let mut session = session(None);
        session.next_probe(Ticks(0));
        assert_eq!(
            Classification::Unknown,
            session.classify(&echo_reply(99), ms(1))
        );
    }

    #[test]
    fn test_late_reply_after_timeout_is_unknown() {
        let mut session = session(None);
        session.next_probe(Ticks(0));
        let expired = session.expire(ms(100), |_| ms(100));
        assert_eq!(vec![Sequence(1)], expired);
        assert_eq!(
            Classification::Unknown,
            session.classify(&echo_reply(1), ms(150))
        );
        assert_eq!(0, session.statistics().packets_recv());
    }

    #[test]
    fn test_classify_icmp_error_settles_probe() {
        let mut session = session(Some(1));
        session.next_probe(Ticks(0));
        let error = reply(
            IcmpPacketType::TimeExceeded(IcmpPacketCode(0)),
            42,
            1,
        );
        assert_eq!(Classification::IcmpError, session.classify(&error, ms(1)));
        assert!(session.is_complete());
        let stats = session.statistics();
        assert_eq!(1, stats.icmp_errors());
        assert_eq!(0, stats.packets_recv());
        assert!((100_f64 - stats.packet_loss()).abs() < f64::EPSILON);
        assert_eq!(
            Classification::Unknown,
            session.classify(&error, ms(1))
        );
    }

    #[test]
    fn test_expire_only_old_probes() {
        let mut session = session(None);
        session.next_probe(Ticks(0));
        session.next_probe(Ticks(50));
        session.next_probe(Ticks(100));
        let now = 120;
        let expired = session.expire(ms(60), |sent| ms(now - sent.0));
        assert_eq!(vec![Sequence(1), Sequence(2)], expired);
        assert_eq!(1, session.outstanding());
    }

    #[test]
    fn test_fail_probe() {
        let mut session = session(Some(2));
        let probe = session.next_probe(Ticks(0));
        session.fail_probe(probe.map(|p| p.sequence).unwrap_or_default());
        assert_eq!(0, session.statistics().packets_sent());
        assert_eq!(0, session.outstanding());
        // the failed probe still counts toward the count
        assert!(session.next_probe(Ticks(1)).is_some());
        assert!(session.next_probe(Ticks(2)).is_none());
    }

    #[test]
    fn test_is_complete() {
        let mut session = session(Some(2));
        assert!(!session.is_complete());
        session.next_probe(Ticks(0));
        session.next_probe(Ticks(1));
        assert!(!session.is_complete());
        session.classify(&echo_reply(1), ms(1));
        assert!(!session.is_complete());
        session.expire(ms(10), |_| ms(10));
        assert!(session.is_complete());
    }

    #[test]
    fn test_zero_count_is_complete() {
        let session = session(Some(0));
        assert!(session.is_complete());
    }

    #[test]
    fn test_unbounded_never_complete() {
        let mut session = session(None);
        session.next_probe(Ticks(0));
        session.classify(&echo_reply(1), ms(1));
        assert!(!session.is_complete());
    }

    #[test]
    fn test_sequence_wrap_resets_seen() {
        let config = SessionConfig {
            identifier: Identifier(42),
            initial_sequence: Sequence(u16::MAX),
            policy: PlatformPolicy::BSD,
            ..SessionConfig::default()
        };
        let mut session = Session::new(config, String::from("localhost"));
        session.next_probe(Ticks(0));
        assert_eq!(
            Classification::Received,
            session.classify(&echo_reply(u16::MAX), ms(1))
        );
        let wrapped = session.next_probe(Ticks(1)).map(|p| p.sequence);
        assert_eq!(Some(Sequence(0)), wrapped);
        for _ in 0..u16::MAX {
            session.next_probe(Ticks(2));
        }
        // u16::MAX is reused, its earlier reply must not make the next one a duplicate
        assert_eq!(
            Classification::Received,
            session.classify(&echo_reply(u16::MAX), ms(1))
        );
    }

    #[test]
    fn test_sequence_wrap_settles_unanswered_probe() {
        let mut session = session(None);
        for i in 0..65537 {
            session.next_probe(Ticks(i));
        }
        assert_eq!(65537, session.statistics().packets_sent());
        assert_eq!(65537, session.outstanding());
        // nothing has timed out yet, only the probe whose sequence was reused is settled
        let settled = session.expire(ms(10), |_| ms(0));
        assert_eq!(vec![Sequence(1)], settled);
        assert_eq!(65536, session.outstanding());
        let expired = session.expire(ms(10), |_| ms(10));
        assert_eq!(65536, expired.len());
        assert_eq!(0, session.outstanding());
        // a reused sequence is answerable again
        session.next_probe(Ticks(0));
        assert_eq!(
            Classification::Received,
            session.classify(&echo_reply(2), ms(1))
        );
    }

    #[test]
    fn test_sequence_wrap_keeps_session_incomplete() {
        let config = SessionConfig {
            identifier: Identifier(42),
            initial_sequence: Sequence(u16::MAX),
            count: Some(65537),
            policy: PlatformPolicy::BSD,
            ..SessionConfig::default()
        };
        let mut session = Session::new(config, String::from("localhost"));
        for _ in 0..65537 {
            session.next_probe(Ticks(0));
        }
        for sequence in 0..u16::MAX {
            session.classify(&echo_reply(sequence), ms(1));
        }
        session.classify(&echo_reply(u16::MAX), ms(1));
        // the first u16::MAX probe was never answered and is not yet reported
        assert!(!session.is_complete());
        assert_eq!(vec![Sequence(u16::MAX)], session.expire(ms(10), |_| ms(0)));
        assert!(session.is_complete());
    }
}
