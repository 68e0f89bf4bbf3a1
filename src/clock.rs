//! Time sources for the token bucket.
//!
//! The bucket never calls the system clock directly. It asks a [`Clock`],
//! which lets tests and simulations drive time explicitly with a
//! [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::types::Seconds;

/// A source of timestamps, in seconds.
///
/// Implementations should be monotonic or close to it. A reading that goes
/// backwards is tolerated by the token bucket but temporarily lowers the
/// tokens it sees.
pub trait Clock {
    /// Returns the current time in seconds.
    fn now(&self) -> Seconds;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> Seconds {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    #[inline]
    fn now(&self) -> Seconds {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> Seconds {
        (**self).now()
    }
}

/// Monotonic clock measuring seconds since it was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose zero is the current instant.
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Seconds {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Wall clock measuring seconds since the Unix epoch.
///
/// Subject to system clock adjustments; prefer [`MonotonicClock`] unless
/// timestamps must be comparable across processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Seconds {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since_epoch) => since_epoch.as_secs_f64(),
            // System time set before 1970.
            Err(before_epoch) => -before_epoch.duration().as_secs_f64(),
        }
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so a test can hand one clone to a bucket
/// and keep another to advance time.
///
/// ```rust
/// use flow_guard_core::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(10.0);
/// let handle = clock.clone();
/// handle.advance(2.5);
/// assert_eq!(clock.now(), 12.5);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading `start` seconds.
    pub fn new(start: Seconds) -> Self {
        ManualClock {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    /// Sets the reading. Moving backwards is allowed, to simulate clock skew.
    pub fn set(&self, now: Seconds) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    /// Moves the reading by `delta` seconds (negative moves it back).
    pub fn advance(&self, delta: Seconds) {
        let mut current = self.bits.load(Ordering::SeqCst);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Moves the reading forward by `duration`.
    pub fn advance_by(&self, duration: Duration) {
        self.advance(duration.as_secs_f64());
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Seconds {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
