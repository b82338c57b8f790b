use crate::error::Error;
use crate::probe::{Echo, Probe};
use crate::stats::Statistics;

/// Callbacks invoked as a run progresses.
///
/// Callbacks are invoked from the sender and receiver threads, never while session state is
/// locked, and so may themselves query the [`crate::Pinger`].  Every method has a default
/// implementation which does nothing.
///
/// # Examples
///
/// ```
/// use echoprobe_core::{Echo, Handler, Statistics};
///
/// struct Printer;
///
/// impl Handler for Printer {
///     fn on_recv(&self, echo: &Echo) {
///         println!("{} bytes from {}: icmp_seq={} time={:?}", echo.bytes, echo.addr, echo.sequence, echo.rtt);
///     }
///
///     fn on_finish(&self, stats: &Statistics) {
///         println!("{:.1}% packet loss", stats.packet_loss());
///     }
/// }
/// ```
pub trait Handler: Sync {
    /// An echo request was sent.
    ///
    /// Invoked by the sender thread once the write has succeeded, so a fast reply may be
    /// reported by [`Handler::on_recv`], or another outcome callback for the same probe,
    /// before this is invoked.
    fn on_send(&self, _probe: &Probe) {}

    /// The first reply for a probe was received.
    fn on_recv(&self, _echo: &Echo) {}

    /// A further reply for an already answered probe was received.
    fn on_duplicate(&self, _echo: &Echo) {}

    /// A probe was not answered within the timeout.
    fn on_timeout(&self, _echo: &Echo) {}

    /// A probe was answered with an ICMP error.
    fn on_icmp_error(&self, _echo: &Echo) {}

    /// A transient error occurred and the run continues.
    fn on_error(&self, _err: &Error) {}

    /// The run has finished, invoked exactly once.
    fn on_finish(&self, _stats: &Statistics) {}
}

/// A [`Handler`] which ignores every event.
impl Handler for () {}
