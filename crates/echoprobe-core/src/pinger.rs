use crate::clock::Clock;
use crate::config::{ChannelConfig, EngineConfig, PrivilegeMode, SessionConfig};
use crate::engine::CompletionReason;
use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::stats::Statistics;
use crate::types::{Identifier, PayloadPattern, PayloadSize, Sequence, TimeToLive};
use std::net::IpAddr;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

/// The result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// What ended the run.
    pub reason: CompletionReason,
    /// The final statistics, as passed to [`Handler::on_finish`].
    pub statistics: Statistics,
}

/// An ICMP echo pinger.
///
/// See the [`crate`] documentation for more information.
///
/// Note that this type is cheaply cloneable, every clone refers to the same run.
#[derive(Debug, Clone)]
pub struct Pinger {
    inner: Arc<inner::PingerInner>,
}

impl Pinger {
    /// Create a `Pinger`.
    ///
    /// Use the [`crate::Builder`] type to create a [`Pinger`].
    #[must_use]
    pub(crate) fn new(
        channel_config: ChannelConfig,
        session_config: SessionConfig,
        engine_config: EngineConfig,
        addr: String,
        clock: Arc<dyn Clock>,
        drop_privileges: bool,
    ) -> Self {
        Self {
            inner: Arc::new(inner::PingerInner::new(
                channel_config,
                session_config,
                engine_config,
                addr,
                clock,
                drop_privileges,
            )),
        }
    }

    /// Run the [`Pinger`].
    ///
    /// This method will block until the configured count of probes has been sent and each has
    /// been answered or has timed out, until the deadline passes, until [`Pinger::stop`] is called
    /// or until the run fails.
    ///
    /// A `Pinger` runs at most once, a second call returns [`Error::AlreadyStarted`].
    ///
    /// # Example
    ///
    /// The following will send 3 echo requests to the target and print the packet loss:
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// # use std::net::IpAddr;
    /// # use std::str::FromStr;
    /// use echoprobe_core::Builder;
    ///
    /// let addr = IpAddr::from_str("1.1.1.1")?;
    /// let pinger = Builder::new(addr).count(Some(3)).build()?;
    /// let outcome = pinger.run()?;
    /// println!("{:.1}% packet loss", outcome.statistics.packet_loss());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # See Also
    ///
    /// - [`Pinger::run_with`] - Run the pinger with a custom handler.
    /// - [`Pinger::spawn`] - Spawn the pinger on a new thread.
    pub fn run(&self) -> Result<Outcome> {
        self.inner.run_with(&())
    }

    /// Run the [`Pinger`] with a custom [`Handler`].
    ///
    /// The handler is notified of every probe sent, every reply, timeout and transient error and
    /// finally of the statistics when the run ends.  `on_finish` is called exactly once, even if
    /// the run fails after the socket was opened.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// # use std::net::IpAddr;
    /// # use std::str::FromStr;
    /// use echoprobe_core::{Builder, Echo, Handler};
    ///
    /// struct Printer;
    ///
    /// impl Handler for Printer {
    ///     fn on_recv(&self, echo: &Echo) {
    ///         println!("icmp_seq={} time={:?}", echo.sequence, echo.rtt);
    ///     }
    /// }
    ///
    /// let addr = IpAddr::from_str("1.1.1.1")?;
    /// let pinger = Builder::new(addr).count(Some(3)).build()?;
    /// pinger.run_with(&Printer)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn run_with<H: Handler>(&self, handler: &H) -> Result<Outcome> {
        self.inner.run_with(handler)
    }

    /// Spawn the pinger on a new thread.
    ///
    /// Returns the [`Pinger`] and a handle to the thread, so that the statistics can be
    /// inspected, or the run stopped, while it is in progress.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// # use std::net::IpAddr;
    /// # use std::str::FromStr;
    /// # use std::thread;
    /// # use std::time::Duration;
    /// use echoprobe_core::Builder;
    ///
    /// let addr = IpAddr::from_str("1.1.1.1")?;
    /// let (pinger, handle) = Builder::new(addr).build()?.spawn()?;
    /// thread::sleep(Duration::from_secs(5));
    /// println!("{} sent so far", pinger.statistics().packets_sent());
    /// pinger.stop();
    /// let _outcome = handle.join().unwrap()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(self) -> Result<(Self, JoinHandle<Result<Outcome>>)> {
        self.spawn_with(())
    }

    /// Spawn the pinger with a custom [`Handler`] on a new thread.
    pub fn spawn_with<H: Handler + Send + 'static>(
        self,
        handler: H,
    ) -> Result<(Self, JoinHandle<Result<Outcome>>)> {
        let pinger = self.clone();
        let handle = thread::Builder::new()
            .name(format!("pinger-{}", self.identifier()))
            .spawn(move || pinger.run_with(&handler))
            .map_err(|err| Error::Other(err.to_string()))?;
        Ok((self, handle))
    }

    /// Stop the run.
    ///
    /// May be called from any thread at any time.  If called before the run starts then the run
    /// finishes immediately without sending, once a run has finished this has no effect.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// The statistics accumulated so far.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        self.inner.statistics()
    }

    /// The duration of a single clock tick, the precision of measured round trip times.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        self.inner.tick_duration()
    }

    /// The target address.
    #[must_use]
    pub fn target_addr(&self) -> IpAddr {
        self.inner.target_addr()
    }

    /// The target as it was given, hostname or address.
    #[must_use]
    pub fn target_name(&self) -> &str {
        self.inner.target_name()
    }

    /// The source address, if one was given.
    #[must_use]
    pub fn source_addr(&self) -> Option<IpAddr> {
        self.inner.source_addr()
    }

    /// The privilege mode of the pinger.
    #[must_use]
    pub fn privilege_mode(&self) -> PrivilegeMode {
        self.inner.privilege_mode()
    }

    /// The echo identifier of the pinger.
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        self.inner.identifier()
    }

    /// The first sequence number of the pinger.
    #[must_use]
    pub fn initial_sequence(&self) -> Sequence {
        self.inner.initial_sequence()
    }

    /// The payload size of the pinger.
    #[must_use]
    pub fn payload_size(&self) -> PayloadSize {
        self.inner.payload_size()
    }

    /// The payload pattern of the pinger.
    #[must_use]
    pub fn payload_pattern(&self) -> PayloadPattern {
        self.inner.payload_pattern()
    }

    /// The length of each echo request as reported on this platform.
    #[must_use]
    pub fn message_length(&self) -> usize {
        self.inner.message_length()
    }

    /// The time-to-live of the pinger.
    #[must_use]
    pub fn ttl(&self) -> TimeToLive {
        self.inner.ttl()
    }

    /// The number of probes to send, unbounded if `None`.
    #[must_use]
    pub fn count(&self) -> Option<usize> {
        self.inner.count()
    }

    /// The interval between probes.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.inner.interval()
    }

    /// The per-probe timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout()
    }

    /// The overall deadline, unbounded if `None`.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.inner.deadline()
    }

    /// The read timeout of the pinger.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.inner.read_timeout()
    }
}

mod inner {
    use super::Outcome;
    use crate::clock::Clock;
    use crate::config::{ChannelConfig, EngineConfig, IpVersion, PrivilegeMode, SessionConfig};
    use crate::engine::{CompletionReason, Engine, StopSignal};
    use crate::error::{Error, Result};
    use crate::handler::Handler;
    use crate::net::channel::Channel;
    use crate::net::{Network, SocketImpl};
    use crate::session::Session;
    use crate::stats::Statistics;
    use crate::types::{Identifier, PayloadPattern, PayloadSize, Sequence, TimeToLive};
    use echoprobe_privilege::Privilege;
    use parking_lot::Mutex;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::instrument;

    #[derive(Debug)]
    pub(super) struct PingerInner {
        channel_config: ChannelConfig,
        session_config: SessionConfig,
        engine_config: EngineConfig,
        addr: String,
        clock: Arc<dyn Clock>,
        drop_privileges: bool,
        started: AtomicBool,
        signal: StopSignal,
        session: Mutex<Session>,
    }

    impl PingerInner {
        pub(super) fn new(
            channel_config: ChannelConfig,
            session_config: SessionConfig,
            engine_config: EngineConfig,
            addr: String,
            clock: Arc<dyn Clock>,
            drop_privileges: bool,
        ) -> Self {
            Self {
                channel_config,
                session_config,
                engine_config,
                session: Mutex::new(Session::new(session_config, addr.clone())),
                addr,
                clock,
                drop_privileges,
                started: AtomicBool::new(false),
                signal: StopSignal::default(),
            }
        }

        #[instrument(skip_all, level = "trace")]
        pub(super) fn run_with<H: Handler>(&self, handler: &H) -> Result<Outcome> {
            self.run_internal(handler, || {
                let channel =
                    Channel::<SocketImpl>::connect(&self.channel_config, self.clock.clone())?;
                if self.drop_privileges {
                    Privilege::drop_privileges()?;
                }
                Ok(channel)
            })
        }

        /// Run against the network returned by `connect`.
        ///
        /// Errors opening the network are returned before the handler is notified of anything.
        pub(super) fn run_internal<N: Network + Sync, H: Handler>(
            &self,
            handler: &H,
            connect: impl FnOnce() -> Result<N>,
        ) -> Result<Outcome> {
            if self.started.swap(true, Ordering::SeqCst) {
                return Err(Error::AlreadyStarted);
            }
            if self.signal.is_stopped() {
                tracing::debug!("stopped before start");
                return Ok(self.finish(handler, CompletionReason::Cancelled));
            }
            let network = connect()?;
            let result = Engine::new(
                self.engine_config,
                &network,
                &self.session,
                self.clock.as_ref(),
                &self.signal,
                handler,
            )
            .run();
            match result {
                Ok(reason) => Ok(self.finish(handler, reason)),
                Err(err) => {
                    self.finish(handler, CompletionReason::Cancelled);
                    Err(err)
                }
            }
        }

        fn finish<H: Handler>(&self, handler: &H, reason: CompletionReason) -> Outcome {
            let statistics = self.statistics();
            tracing::debug!(?reason, ?statistics, "run finished");
            handler.on_finish(&statistics);
            Outcome { reason, statistics }
        }

        pub(super) fn stop(&self) {
            if self.signal.stop(CompletionReason::Cancelled) {
                tracing::debug!("stop requested");
            }
        }

        pub(super) fn statistics(&self) -> Statistics {
            self.session.lock().statistics()
        }

        pub(super) fn tick_duration(&self) -> Duration {
            self.clock.tick_duration()
        }

        pub(super) const fn target_addr(&self) -> IpAddr {
            self.channel_config.target_addr
        }

        pub(super) fn target_name(&self) -> &str {
            &self.addr
        }

        pub(super) const fn source_addr(&self) -> Option<IpAddr> {
            self.channel_config.source_addr
        }

        pub(super) const fn privilege_mode(&self) -> PrivilegeMode {
            self.channel_config.privilege_mode
        }

        pub(super) const fn identifier(&self) -> Identifier {
            self.session_config.identifier
        }

        pub(super) const fn initial_sequence(&self) -> Sequence {
            self.session_config.initial_sequence
        }

        pub(super) const fn payload_size(&self) -> PayloadSize {
            self.channel_config.payload_size
        }

        pub(super) const fn payload_pattern(&self) -> PayloadPattern {
            self.channel_config.payload_pattern
        }

        pub(super) fn message_length(&self) -> usize {
            self.channel_config.policy.message_length(
                self.channel_config.payload_size,
                IpVersion::from(self.channel_config.target_addr),
            )
        }

        pub(super) const fn ttl(&self) -> TimeToLive {
            self.channel_config.ttl
        }

        pub(super) const fn count(&self) -> Option<usize> {
            self.session_config.count
        }

        pub(super) const fn interval(&self) -> Duration {
            self.engine_config.interval
        }

        pub(super) const fn timeout(&self) -> Duration {
            self.engine_config.timeout
        }

        pub(super) const fn deadline(&self) -> Option<Duration> {
            self.engine_config.deadline
        }

        pub(super) const fn read_timeout(&self) -> Duration {
            self.channel_config.read_timeout
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, Ticks};
    use crate::error::{IoError, IoOperation};
    use crate::net::testing::{answer, ScriptedNetwork, TARGET};
    use crate::policy::PlatformPolicy;
    use crate::probe::Echo;
    use parking_lot::Mutex;
    use std::io;

    #[derive(Debug, Default)]
    struct Recorder {
        received: Mutex<usize>,
        finished: Mutex<Vec<Statistics>>,
    }

    impl Handler for Recorder {
        fn on_recv(&self, _echo: &Echo) {
            *self.received.lock() += 1;
        }

        fn on_finish(&self, stats: &Statistics) {
            self.finished.lock().push(stats.clone());
        }
    }

    fn pinger(clock: &Arc<ManualClock>, count: Option<usize>) -> Pinger {
        let session_config = SessionConfig {
            target_addr: TARGET,
            identifier: Identifier(77),
            initial_sequence: Sequence(1),
            count,
            policy: PlatformPolicy::BSD,
            ..SessionConfig::default()
        };
        let engine_config = EngineConfig {
            target_addr: TARGET,
            identifier: Identifier(77),
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
            deadline: None,
        };
        let channel_config = ChannelConfig {
            target_addr: TARGET,
            policy: PlatformPolicy::WINDOWS,
            ..ChannelConfig::default()
        };
        Pinger::new(
            channel_config,
            session_config,
            engine_config,
            String::from("localhost"),
            clock.clone(),
            false,
        )
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Ticks(0)))
    }

    #[test]
    fn test_run_finishes_once() -> anyhow::Result<()> {
        let clock = clock();
        let pinger = pinger(&clock, Some(3));
        let recorder = Recorder::default();
        let network = ScriptedNetwork::new(clock.clone(), answer(&[1, 2, 3]));
        let outcome = pinger.inner.run_internal(&recorder, || Ok(network))?;
        assert_eq!(CompletionReason::CountReached, outcome.reason);
        assert_eq!(3, outcome.statistics.packets_recv());
        assert_eq!(3, *recorder.received.lock());
        assert_eq!(vec![outcome.statistics.clone()], *recorder.finished.lock());
        assert_eq!(outcome.statistics, pinger.statistics());
        assert_eq!("localhost", outcome.statistics.addr());
        Ok(())
    }

    #[test]
    fn test_stop_before_run() -> anyhow::Result<()> {
        let clock = clock();
        let pinger = pinger(&clock, None);
        let recorder = Recorder::default();
        pinger.stop();
        pinger.stop();
        let outcome = pinger.run_with(&recorder)?;
        assert_eq!(CompletionReason::Cancelled, outcome.reason);
        assert_eq!(0, outcome.statistics.packets_sent());
        assert!(outcome.statistics.packet_loss().abs() < f64::EPSILON);
        assert_eq!(1, recorder.finished.lock().len());
        Ok(())
    }

    #[test]
    fn test_run_twice() -> anyhow::Result<()> {
        let clock = clock();
        let pinger = pinger(&clock, None);
        pinger.stop();
        pinger.run()?;
        assert!(matches!(pinger.run(), Err(Error::AlreadyStarted)));
        assert!(matches!(pinger.clone().run(), Err(Error::AlreadyStarted)));
        Ok(())
    }

    #[test]
    fn test_connect_failure_does_not_finish() {
        let clock = clock();
        let pinger = pinger(&clock, Some(1));
        let recorder = Recorder::default();
        let result = pinger.inner.run_internal(&recorder, || {
            Err::<ScriptedNetwork, _>(Error::PermissionDenied(IoError::Other(
                io::Error::from(io::ErrorKind::PermissionDenied),
                IoOperation::NewSocket,
            )))
        });
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert!(recorder.finished.lock().is_empty());
    }

    #[test]
    fn test_fatal_error_finishes_once() {
        let clock = clock();
        let pinger = pinger(&clock, None);
        let recorder = Recorder::default();
        let network = ScriptedNetwork::new(clock.clone(), answer(&[1]))
            .with_send_fault(|probe| {
                (probe.sequence == Sequence(2)).then(|| Error::Other(String::from("closed")))
            });
        let result = pinger.inner.run_internal(&recorder, || Ok(network));
        assert!(matches!(result, Err(Error::Other(_))));
        let finished = recorder.finished.lock();
        assert_eq!(1, finished.len());
        assert_eq!(1, finished[0].packets_sent());
    }

    #[test]
    fn test_stop_from_another_thread() -> anyhow::Result<()> {
        let clock = clock();
        let pinger = pinger(&clock, None);
        let network = ScriptedNetwork::new(clock.clone(), answer(&[]));
        let outcome = thread::scope(|scope| {
            let runner = scope.spawn(|| pinger.inner.run_internal(&(), || Ok(network)));
            thread::sleep(Duration::from_millis(20));
            pinger.stop();
            runner.join()
        })
        .map_err(|_| anyhow::anyhow!("run panicked"))??;
        assert_eq!(CompletionReason::Cancelled, outcome.reason);
        pinger.stop();
        Ok(())
    }

    #[test]
    fn test_accessors() {
        let clock = clock();
        let pinger = pinger(&clock, Some(4));
        assert_eq!(TARGET, pinger.target_addr());
        assert_eq!("localhost", pinger.target_name());
        assert_eq!(Identifier(77), pinger.identifier());
        assert_eq!(Sequence(1), pinger.initial_sequence());
        assert_eq!(Some(4), pinger.count());
        assert_eq!(84, pinger.message_length());
        assert_eq!(Duration::from_nanos(1), pinger.tick_duration());
    }
}
