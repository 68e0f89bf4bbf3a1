use tracing::{debug, trace, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::error::{ensure_finite, ensure_non_negative, GuardResult};
use crate::types::{Seconds, Tokens};

/// Continuously refilling token bucket with per-call rate and burst.
///
/// Tokens accrue at `avg_rate` per second of elapsed time and are capped at
/// `burst_size` whenever a request is evaluated. A request for `take` tokens is
/// admitted if that many are available; the remainder stays in the bucket.
///
/// # Algorithm Behavior
///
/// - The bucket starts with an initial amount (0 by default)
/// - Refill is `elapsed * avg_rate`, where elapsed is measured from the last
///   admitted request, so refill is banked only when a request succeeds
/// - The refilled amount is capped at `burst_size` before the comparison
/// - A rejected request leaves the bucket untouched
/// - Rate and burst are supplied with each request, so a caller can retune the
///   policy without creating a new bucket
///
/// The bucket is not synchronized. Use one bucket per owner, or wrap it in a
/// [`SharedTokenBucket`](crate::shared::SharedTokenBucket).
///
/// # Example
///
/// ```rust
/// use flow_guard_core::clock::ManualClock;
/// use flow_guard_core::primitives::TokenBucket;
///
/// let clock = ManualClock::new(0.0);
/// let mut bucket = TokenBucket::with_clock(clock.clone(), 0.0)?;
///
/// // Empty bucket, no time has passed
/// assert_eq!(bucket.consume(1.0, 10.0, 5.0)?, false);
///
/// // One second refills 10 tokens, capped at a burst of 5
/// clock.advance(1.0);
/// assert_eq!(bucket.consume(1.0, 10.0, 5.0)?, true);
/// assert_eq!(bucket.amount(), 4.0);
/// # Ok::<(), flow_guard_core::GuardError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket<C = MonotonicClock> {
    /// Time source used by `consume`
    clock: C,
    /// Tokens left after the last admitted request
    amount: Tokens,
    /// Timestamp of the last admitted request
    last_consume_time: Seconds,
}

/// Outcome of a token bucket decision, with diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// The request was admitted.
    Admitted {
        /// Tokens left in the bucket afterwards.
        remaining: Tokens,
    },
    /// The request was rejected and the bucket is unchanged.
    Rejected {
        /// Tokens the request asked for.
        requested: Tokens,
        /// Tokens that were available after refill and cap.
        available: Tokens,
        /// Seconds until the same request would be admitted at the same rate,
        /// or `None` if it cannot be admitted under this rate and burst size.
        retry_after: Option<Seconds>,
    },
}

impl Admission {
    /// Returns `true` for [`Admission::Admitted`].
    #[inline]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

impl TokenBucket<MonotonicClock> {
    /// Creates an empty bucket driven by a [`MonotonicClock`].
    pub fn new() -> Self {
        Self::from_parts(MonotonicClock::new(), 0.0)
    }

    /// Creates a bucket holding `amount` tokens, driven by a [`MonotonicClock`].
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidArgument`](crate::GuardError::InvalidArgument)
    /// if `amount` is negative or not finite.
    pub fn with_initial_amount(amount: Tokens) -> GuardResult<Self> {
        Self::with_clock(MonotonicClock::new(), amount)
    }
}

impl Default for TokenBucket<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Creates a bucket holding `initial_amount` tokens, driven by `clock`.
    ///
    /// The creation time is read from `clock` and serves as the reference for
    /// the first refill.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidArgument`](crate::GuardError::InvalidArgument)
    /// if `initial_amount` is negative or not finite, or if `clock` reads a
    /// non-finite time.
    pub fn with_clock(clock: C, initial_amount: Tokens) -> GuardResult<Self> {
        ensure_non_negative("initial_amount", initial_amount)?;
        ensure_finite("now", clock.now())?;
        Ok(Self::from_parts(clock, initial_amount))
    }

    fn from_parts(clock: C, amount: Tokens) -> Self {
        let last_consume_time = clock.now();
        debug!(amount, last_consume_time, "creating token bucket");
        TokenBucket {
            clock,
            amount,
            last_consume_time,
        }
    }

    /// Tokens left after the last admitted request, before any refill.
    #[inline]
    pub fn amount(&self) -> Tokens {
        self.amount
    }

    /// Timestamp of the last admitted request (or of creation).
    #[inline]
    pub fn last_consume_time(&self) -> Seconds {
        self.last_consume_time
    }

    /// Returns the clock driving this bucket.
    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Attempts to take `take` tokens now.
    ///
    /// Returns `Ok(true)` if admitted, `Ok(false)` if there are not enough
    /// tokens. A rejection does not change the bucket, so refill keeps
    /// accumulating from the last admitted request.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidArgument`](crate::GuardError::InvalidArgument)
    /// if any argument is negative or not finite, or if the clock reads a
    /// non-finite time. The bucket is unchanged in that case.
    #[inline]
    pub fn consume(
        &mut self,
        take: Tokens,
        avg_rate: Tokens,
        burst_size: Tokens,
    ) -> GuardResult<bool> {
        self.consume_verbose(take, avg_rate, burst_size)
            .map(|admission| admission.is_admitted())
    }

    /// Same as [`consume`](TokenBucket::consume) but evaluated at `now`
    /// instead of the clock's reading. A non-finite `now` is rejected as
    /// [`GuardError::InvalidArgument`](crate::GuardError::InvalidArgument).
    #[inline]
    pub fn consume_at(
        &mut self,
        now: Seconds,
        take: Tokens,
        avg_rate: Tokens,
        burst_size: Tokens,
    ) -> GuardResult<bool> {
        self.consume_verbose_at(now, take, avg_rate, burst_size)
            .map(|admission| admission.is_admitted())
    }

    /// Attempts to take `take` tokens now, returning diagnostics.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flow_guard_core::clock::ManualClock;
    /// use flow_guard_core::primitives::{Admission, TokenBucket};
    ///
    /// let clock = ManualClock::new(0.0);
    /// let mut bucket = TokenBucket::with_clock(clock.clone(), 1.0)?;
    ///
    /// match bucket.consume_verbose(3.0, 4.0, 10.0)? {
    ///     Admission::Admitted { remaining } => println!("admitted, {} left", remaining),
    ///     Admission::Rejected { retry_after: Some(wait), .. } => {
    ///         // 2 tokens short at 4 tokens per second
    ///         assert_eq!(wait, 0.5);
    ///     }
    ///     Admission::Rejected { retry_after: None, .. } => println!("never admissible"),
    /// }
    /// # Ok::<(), flow_guard_core::GuardError>(())
    /// ```
    pub fn consume_verbose(
        &mut self,
        take: Tokens,
        avg_rate: Tokens,
        burst_size: Tokens,
    ) -> GuardResult<Admission> {
        validate(take, avg_rate, burst_size)?;
        let now = ensure_finite("now", self.clock.now())?;
        Ok(self.decide(now, take, avg_rate, burst_size))
    }

    /// Same as [`consume_verbose`](TokenBucket::consume_verbose) but evaluated
    /// at `now` instead of the clock's reading.
    pub fn consume_verbose_at(
        &mut self,
        now: Seconds,
        take: Tokens,
        avg_rate: Tokens,
        burst_size: Tokens,
    ) -> GuardResult<Admission> {
        validate(take, avg_rate, burst_size)?;
        ensure_finite("now", now)?;
        Ok(self.decide(now, take, avg_rate, burst_size))
    }

    /// Attempts to take `take` tokens now under `policy`.
    #[inline]
    pub fn consume_with(&mut self, take: Tokens, policy: &TokenBucketPolicy) -> GuardResult<bool> {
        self.consume(take, policy.avg_rate, policy.burst_size)
    }

    /// Attempts to take `take` tokens at `now` under `policy`.
    #[inline]
    pub fn consume_with_at(
        &mut self,
        now: Seconds,
        take: Tokens,
        policy: &TokenBucketPolicy,
    ) -> GuardResult<bool> {
        self.consume_at(now, take, policy.avg_rate, policy.burst_size)
    }

    #[inline(always)]
    fn refilled(&self, now: Seconds, avg_rate: Tokens, burst_size: Tokens) -> Tokens {
        let elapsed = now - self.last_consume_time;
        (self.amount + elapsed * avg_rate).min(burst_size)
    }

    /// Wait, starting from `(take - current) / avg_rate` and raised as needed, such
    /// that a request evaluated at `now + wait` sees at least `take` tokens.
    ///
    /// Requires `avg_rate > 0` and `take <= burst_size`.
    fn wait_until_admissible(
        &self,
        now: Seconds,
        take: Tokens,
        current: Tokens,
        avg_rate: Tokens,
        burst_size: Tokens,
    ) -> Seconds {
        let mut wait = (take - current) / avg_rate;
        let mut step = ulp(wait);
        // Rounding in `now + wait` and in the refill can leave the estimate a
        // few ulps short; the step doubles so this ends within a few rounds.
        while self.refilled(now + wait, avg_rate, burst_size) < take {
            wait += step;
            step *= 2.0;
        }
        wait
    }

    fn decide(
        &mut self,
        now: Seconds,
        take: Tokens,
        avg_rate: Tokens,
        burst_size: Tokens,
    ) -> Admission {
        if now < self.last_consume_time {
            warn!(
                now,
                last_consume_time = self.last_consume_time,
                "clock went backwards, refill is negative"
            );
        }

        let current = self.refilled(now, avg_rate, burst_size);
        if take > current {
            let retry_after = if take > burst_size || avg_rate == 0.0 {
                None
            } else {
                Some(self.wait_until_admissible(now, take, current, avg_rate, burst_size))
            };
            trace!(take, available = current, "token bucket rejected request");
            return Admission::Rejected {
                requested: take,
                available: current,
                retry_after,
            };
        }

        self.amount = current - take;
        self.last_consume_time = now;
        trace!(take, remaining = self.amount, "token bucket admitted request");
        Admission::Admitted {
            remaining: self.amount,
        }
    }
}

/// Distance from a non-negative finite `value` to the next larger `f64`.
fn ulp(value: f64) -> f64 {
    f64::from_bits(value.to_bits() + 1) - value
}

fn validate(take: Tokens, avg_rate: Tokens, burst_size: Tokens) -> GuardResult<()> {
    ensure_non_negative("take", take)?;
    ensure_non_negative("avg_rate", avg_rate)?;
    ensure_non_negative("burst_size", burst_size)?;
    Ok(())
}

/// Rate and burst settings for a [`TokenBucket`].
///
/// The bucket itself does not store a policy; this type lets a caller keep
/// one per tenant or route and pass it with each request.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenBucketPolicy {
    /// Tokens added per second.
    pub avg_rate: Tokens,
    /// Maximum tokens available to a single evaluation.
    pub burst_size: Tokens,
}

impl TokenBucketPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidArgument`](crate::GuardError::InvalidArgument)
    /// if either value is negative or not finite.
    ///
    /// # Example
    ///
    /// ```
    /// use flow_guard_core::primitives::{TokenBucket, TokenBucketPolicy};
    ///
    /// let policy = TokenBucketPolicy::new(100.0, 20.0)?;
    /// let mut bucket = TokenBucket::with_initial_amount(20.0)?;
    /// assert!(bucket.consume_with(5.0, &policy)?);
    ///
    /// assert!(TokenBucketPolicy::new(-1.0, 20.0).is_err());
    /// # Ok::<(), flow_guard_core::GuardError>(())
    /// ```
    pub fn new(avg_rate: Tokens, burst_size: Tokens) -> GuardResult<Self> {
        ensure_non_negative("avg_rate", avg_rate)?;
        ensure_non_negative("burst_size", burst_size)?;
        Ok(Self {
            avg_rate,
            burst_size,
        })
    }
}
