use crate::clock::{Clock, Ticks};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::net::Network;
use crate::probe::{Echo, EchoStatus, IcmpPacketType, Reply};
use crate::session::{Classification, Session};
use parking_lot::{Condvar, Mutex};
use std::thread;
use std::time::Duration;
use tracing::instrument;

/// Indicates what ended a run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompletionReason {
    /// Every probe was sent and then answered, lost or timed out.
    CountReached,
    /// The run exceeded the configured deadline.
    DeadlineExceeded,
    /// The run was stopped by the caller.
    Cancelled,
}

#[derive(Debug, Default)]
enum SignalState {
    #[default]
    Pending,
    Stopped(CompletionReason),
    Aborted,
}

/// Tells the sender and receiver that a run is over.
///
/// The first call to `stop` or `abort` wins, later calls have no effect.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl StopSignal {
    /// End the run for `reason`, returns false if the run had already ended.
    pub(crate) fn stop(&self, reason: CompletionReason) -> bool {
        self.transition(SignalState::Stopped(reason))
    }

    /// End the run following a fatal error.
    pub(crate) fn abort(&self) {
        self.transition(SignalState::Aborted);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        !matches!(*self.state.lock(), SignalState::Pending)
    }

    pub(crate) fn reason(&self) -> Option<CompletionReason> {
        match *self.state.lock() {
            SignalState::Stopped(reason) => Some(reason),
            SignalState::Pending | SignalState::Aborted => None,
        }
    }

    /// Block for up to `timeout`, returns true if the run ended in the meantime.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        self.condvar.wait_while_for(
            &mut state,
            |state| matches!(state, SignalState::Pending),
            timeout,
        );
        !matches!(*state, SignalState::Pending)
    }

    fn transition(&self, next: SignalState) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, SignalState::Pending) {
            *state = next;
            self.condvar.notify_all();
            true
        } else {
            false
        }
    }
}

/// Ends the run if a worker thread unwinds.
struct AbortOnPanic<'a>(&'a StopSignal);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// Drives a run with a sender thread and a receiver thread.
///
/// The sender emits one probe per interval until the count is reached.  The receiver
/// classifies replies, expires probes which have waited longer than the timeout and decides
/// when the run is over.  The two share the [`Session`] behind a single lock, which is never
/// held while calling the [`Handler`].
pub(crate) struct Engine<'a, N, H> {
    config: EngineConfig,
    network: &'a N,
    session: &'a Mutex<Session>,
    clock: &'a dyn Clock,
    signal: &'a StopSignal,
    handler: &'a H,
}

impl<'a, N: Network + Sync, H: Handler> Engine<'a, N, H> {
    pub(crate) fn new(
        config: EngineConfig,
        network: &'a N,
        session: &'a Mutex<Session>,
        clock: &'a dyn Clock,
        signal: &'a StopSignal,
        handler: &'a H,
    ) -> Self {
        Self {
            config,
            network,
            session,
            clock,
            signal,
            handler,
        }
    }

    /// Run until the count is reached, the deadline passes, the run is stopped or a fatal
    /// error occurs.
    #[instrument(skip(self), level = "trace")]
    pub(crate) fn run(&self) -> Result<CompletionReason> {
        tracing::debug!(config = ?self.config);
        let started = self.clock.now()?;
        let id = self.config.identifier;
        thread::scope(|scope| {
            let sender = thread::Builder::new()
                .name(format!("echoprobe-send-{id}"))
                .spawn_scoped(scope, || self.worker(|| self.send_loop()))
                .map_err(|err| Error::Other(err.to_string()))?;
            let receiver = thread::Builder::new()
                .name(format!("echoprobe-recv-{id}"))
                .spawn_scoped(scope, || self.worker(|| self.recv_loop(started)));
            let receiver = match receiver {
                Ok(receiver) => receiver,
                Err(err) => {
                    self.signal.abort();
                    return Err(Error::Other(err.to_string()));
                }
            };
            let sent = sender
                .join()
                .map_err(|_| Error::Other(String::from("sender thread panicked")));
            let received = receiver
                .join()
                .map_err(|_| Error::Other(String::from("receiver thread panicked")));
            sent.and_then(|res| res)?;
            received.and_then(|res| res)?;
            Ok(self
                .signal
                .reason()
                .unwrap_or(CompletionReason::Cancelled))
        })
    }

    /// Run a worker loop, ending the run for both workers if it fails.
    fn worker(&self, work: impl FnOnce() -> Result<()>) -> Result<()> {
        let _guard = AbortOnPanic(self.signal);
        let result = work();
        if let Err(err) = &result {
            tracing::error!(%err, "run failed");
            self.signal.abort();
        }
        result
    }

    #[instrument(skip(self), level = "trace")]
    fn send_loop(&self) -> Result<()> {
        while !self.signal.is_stopped() {
            let now = self.clock.now()?;
            let Some(probe) = self.session.lock().next_probe(now) else {
                tracing::debug!("all probes sent");
                break;
            };
            match self.network.send_probe(&probe) {
                // the receiver may already have reported the reply
                Ok(()) => self.handler.on_send(&probe),
                Err(err) => {
                    self.session.lock().fail_probe(probe.sequence);
                    if !err.is_transient() {
                        return Err(err);
                    }
                    tracing::warn!(%err, sequence = %probe.sequence, "failed to send probe");
                    self.handler.on_error(&err);
                }
            }
            if self.signal.wait(self.config.interval) {
                break;
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "trace")]
    fn recv_loop(&self, started: Ticks) -> Result<()> {
        while !self.signal.is_stopped() {
            match self.network.recv_reply() {
                Ok(Some(reply)) => self.handle_reply(&reply),
                Ok(None) => {}
                Err(err) if err.is_transient() => {
                    tracing::warn!(%err, "failed to receive reply");
                    self.handler.on_error(&err);
                }
                Err(err) => return Err(err),
            }
            self.expire_probes()?;
            if self.session.lock().is_complete() {
                self.signal.stop(CompletionReason::CountReached);
            } else if let Some(deadline) = self.config.deadline {
                if self.clock.elapsed(started)? >= deadline {
                    let outstanding = self.session.lock().outstanding();
                    tracing::debug!(outstanding, "deadline exceeded");
                    self.signal.stop(CompletionReason::DeadlineExceeded);
                }
            }
        }
        Ok(())
    }

    fn handle_reply(&self, reply: &Reply) {
        let rtt = match (reply.sent(), reply.kind) {
            (Some(sent), _) => self.clock.to_duration(reply.received.saturating_since(sent)),
            (None, IcmpPacketType::EchoReply) => {
                tracing::debug!(sequence = %reply.sequence, "discarding echo reply without timestamp");
                return;
            }
            (None, _) => Duration::ZERO,
        };
        let classification = self.session.lock().classify(reply, rtt);
        match classification {
            Classification::Received => {
                let echo = Echo::from_reply(reply, EchoStatus::Received, rtt);
                self.handler.on_recv(&echo);
            }
            Classification::Duplicate => {
                let echo = Echo::from_reply(reply, EchoStatus::Duplicate, rtt);
                self.handler.on_duplicate(&echo);
            }
            Classification::IcmpError => {
                let echo = Echo::from_reply(reply, EchoStatus::IcmpError(reply.kind), rtt);
                self.handler.on_icmp_error(&echo);
            }
            Classification::Unknown => {
                tracing::debug!(sequence = %reply.sequence, "discarding reply for unknown probe");
            }
            Classification::Foreign => {
                tracing::trace!(identifier = %reply.identifier, "discarding reply for another identifier");
            }
        }
    }

    fn expire_probes(&self) -> Result<()> {
        let now = self.clock.now()?;
        let expired = self.session.lock().expire(self.config.timeout, |sent| {
            self.clock.to_duration(now.saturating_since(sent))
        });
        for sequence in expired {
            let echo = Echo::timed_out(
                self.config.identifier,
                sequence,
                self.config.target_addr,
                self.config.timeout,
            );
            self.handler.on_timeout(&echo);
        }
        Ok(())
    }
}
