//! Monotonic tick sources used to timestamp probes and replies.
//!
//! A [`Clock`] counts opaque [`Ticks`] which are only meaningful relative to
//! one another and are converted to a [`Duration`] by the clock which
//! produced them.  Send timestamps travel in the echo payload, so the same
//! clock must read them back when the reply arrives.
use crate::error::Result;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[cfg(any(windows, test))]
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A reading of a [`Clock`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Ticks(pub u64);

impl Ticks {
    /// The number of bytes a tick count occupies on the wire.
    pub const WIRE_SIZE: usize = 8;

    /// The big-endian wire encoding of this tick count.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; Self::WIRE_SIZE] {
        self.0.to_be_bytes()
    }

    /// Decode a tick count from the first [`Ticks::WIRE_SIZE`] bytes of `bytes`.
    ///
    /// Returns `None` if too few bytes are available.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let prefix: [u8; Self::WIRE_SIZE] = bytes.get(..Self::WIRE_SIZE)?.try_into().ok()?;
        Some(Self(u64::from_be_bytes(prefix)))
    }

    /// The ticks elapsed since `earlier`, zero if `earlier` is in the future.
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> Self {
        Self(self.0.saturating_sub(earlier.0))
    }
}

/// A monotonic source of [`Ticks`].
pub trait Clock: Debug + Send + Sync {
    /// Read the current tick count.
    fn now(&self) -> Result<Ticks>;

    /// The duration of a single tick, the precision of this clock.
    fn tick_duration(&self) -> Duration;

    /// Convert a tick count to a [`Duration`].
    fn to_duration(&self, ticks: Ticks) -> Duration;

    /// The time elapsed between `since` and now.
    fn elapsed(&self, since: Ticks) -> Result<Duration> {
        Ok(self.to_duration(self.now()?.saturating_since(since)))
    }
}

/// A nanosecond [`Clock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Result<Ticks> {
        Ok(Ticks(
            u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX),
        ))
    }

    fn tick_duration(&self) -> Duration {
        Duration::from_nanos(1)
    }

    fn to_duration(&self, ticks: Ticks) -> Duration {
        Duration::from_nanos(ticks.0)
    }
}

/// A [`Clock`] which only moves when told to.
///
/// Each tick is one nanosecond.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: Ticks) -> Self {
        Self {
            ticks: AtomicU64::new(start.0),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.ticks.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Set the clock to `ticks`.
    pub fn set(&self, ticks: Ticks) {
        self.ticks.store(ticks.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<Ticks> {
        Ok(Ticks(self.ticks.load(Ordering::SeqCst)))
    }

    fn tick_duration(&self) -> Duration {
        Duration::from_nanos(1)
    }

    fn to_duration(&self, ticks: Ticks) -> Duration {
        Duration::from_nanos(ticks.0)
    }
}

/// Convert `ticks` of a counter running at `frequency` ticks per second.
#[cfg(any(windows, test))]
pub(crate) fn counter_ticks_to_duration(ticks: Ticks, frequency: u64) -> Duration {
    if frequency == 0 {
        return Duration::ZERO;
    }
    let nanos = u128::from(ticks.0) * NANOS_PER_SEC / u128::from(frequency);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// The duration of a single tick of a counter running at `frequency` ticks per second.
#[cfg(any(windows, test))]
pub(crate) fn counter_tick_duration(frequency: u64) -> Duration {
    counter_ticks_to_duration(Ticks(1), frequency)
}

/// Validate a counter frequency reported by the platform.
#[cfg(any(windows, test))]
pub(crate) fn check_counter_frequency(frequency: u64) -> Result<u64> {
    if frequency == 0 {
        Err(crate::error::Error::ClockFailure(String::from(
            "performance counter frequency is zero",
        )))
    } else {
        Ok(frequency)
    }
}

#[cfg(windows)]
pub use performance_counter::PerformanceCounterClock;

#[cfg(windows)]
mod performance_counter {
    use super::{check_counter_frequency, counter_tick_duration, counter_ticks_to_duration};
    use super::{Clock, Ticks};
    use crate::error::{Error, Result};
    use std::time::Duration;
    use windows_sys::Win32::System::Performance::{
        QueryPerformanceCounter, QueryPerformanceFrequency,
    };

    /// A [`Clock`] backed by the Windows high resolution performance counter.
    ///
    /// The counter frequency is fixed at boot and so is queried once, when the clock is
    /// created.
    #[derive(Debug, Clone, Copy)]
    pub struct PerformanceCounterClock {
        frequency: u64,
    }

    impl PerformanceCounterClock {
        /// Create a clock for a counter running at `frequency` ticks per second.
        pub fn new(frequency: u64) -> Result<Self> {
            Ok(Self {
                frequency: check_counter_frequency(frequency)?,
            })
        }

        /// Create a clock using the frequency reported by the system.
        pub fn system() -> Result<Self> {
            let mut frequency = 0_i64;
            #[expect(unsafe_code)]
            let ok = unsafe { QueryPerformanceFrequency(&mut frequency) };
            if ok == 0 {
                return Err(Error::ClockFailure(format!(
                    "QueryPerformanceFrequency failed: {}",
                    std::io::Error::last_os_error()
                )));
            }
            Self::new(u64::try_from(frequency).unwrap_or_default())
        }
    }

    impl Clock for PerformanceCounterClock {
        fn now(&self) -> Result<Ticks> {
            let mut counter = 0_i64;
            #[expect(unsafe_code)]
            let ok = unsafe { QueryPerformanceCounter(&mut counter) };
            if ok == 0 {
                return Err(Error::ClockFailure(format!(
                    "QueryPerformanceCounter failed: {}",
                    std::io::Error::last_os_error()
                )));
            }
            Ok(Ticks(u64::try_from(counter).unwrap_or_default()))
        }

        fn tick_duration(&self) -> Duration {
            counter_tick_duration(self.frequency)
        }

        fn to_duration(&self, ticks: Ticks) -> Duration {
            counter_ticks_to_duration(ticks, self.frequency)
        }
    }
}

/// The default [`Clock`] for this platform.
#[cfg(not(windows))]
#[expect(clippy::unnecessary_wraps)]
pub(crate) fn native() -> Result<std::sync::Arc<dyn Clock>> {
    Ok(std::sync::Arc::new(MonotonicClock::new()))
}

/// The default [`Clock`] for this platform.
#[cfg(windows)]
pub(crate) fn native() -> Result<std::sync::Arc<dyn Clock>> {
    Ok(std::sync::Arc::new(PerformanceCounterClock::system()?))
}
