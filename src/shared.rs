//! Mutex-guarded wrappers for sharing one primitive between threads.
//!
//! [`RingBuffer`] and [`TokenBucket`] take `&mut self` and do no locking of
//! their own. When several threads must feed the same instance, wrap it here
//! (or put it behind an `Arc` of one of these types) instead of sharding it.
//!
//! Every operation takes the lock for its whole duration, so two concurrent
//! `consume` calls can never both spend the same tokens. A poisoned lock is
//! recovered: both primitives update their state in a single step after all
//! checks have passed.

use std::ops::RangeBounds;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::clock::{Clock, MonotonicClock};
use crate::error::GuardResult;
use crate::primitives::{Admission, RingBuffer, TokenBucket, TokenBucketPolicy};
use crate::types::{Seconds, Tokens};

/// A [`TokenBucket`] usable through a shared reference.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
/// use flow_guard_core::clock::ManualClock;
/// use flow_guard_core::primitives::TokenBucket;
/// use flow_guard_core::shared::SharedTokenBucket;
///
/// let bucket = TokenBucket::with_clock(ManualClock::new(0.0), 10.0)?;
/// let shared = Arc::new(SharedTokenBucket::new(bucket));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let shared = Arc::clone(&shared);
///         thread::spawn(move || shared.consume(2.0, 0.0, 10.0))
///     })
///     .collect();
///
/// for handle in handles {
///     assert_eq!(handle.join().unwrap(), Ok(true));
/// }
/// assert_eq!(shared.amount(), 2.0);
/// # Ok::<(), flow_guard_core::GuardError>(())
/// ```
#[derive(Debug)]
pub struct SharedTokenBucket<C = MonotonicClock> {
    inner: Mutex<TokenBucket<C>>,
}

impl<C: Clock> SharedTokenBucket<C> {
    /// Wraps `bucket` for shared use.
    pub fn new(bucket: TokenBucket<C>) -> Self {
        SharedTokenBucket {
            inner: Mutex::new(bucket),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, TokenBucket<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`TokenBucket::consume`].
    pub fn consume(&self, take: Tokens, avg_rate: Tokens, burst_size: Tokens) -> GuardResult<bool> {
        self.lock().consume(take, avg_rate, burst_size)
    }

    /// See [`TokenBucket::consume_at`].
    pub fn consume_at(
        &self,
        now: Seconds,
        take: Tokens,
        avg_rate: Tokens,
        burst_size: Tokens,
    ) -> GuardResult<bool> {
        self.lock().consume_at(now, take, avg_rate, burst_size)
    }

    /// See [`TokenBucket::consume_verbose`].
    pub fn consume_verbose(
        &self,
        take: Tokens,
        avg_rate: Tokens,
        burst_size: Tokens,
    ) -> GuardResult<Admission> {
        self.lock().consume_verbose(take, avg_rate, burst_size)
    }

    /// See [`TokenBucket::consume_with`].
    pub fn consume_with(&self, take: Tokens, policy: &TokenBucketPolicy) -> GuardResult<bool> {
        self.lock().consume_with(take, policy)
    }

    /// See [`TokenBucket::amount`].
    pub fn amount(&self) -> Tokens {
        self.lock().amount()
    }

    /// See [`TokenBucket::last_consume_time`].
    pub fn last_consume_time(&self) -> Seconds {
        self.lock().last_consume_time()
    }

    /// Unwraps the bucket.
    pub fn into_inner(self) -> TokenBucket<C> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock> From<TokenBucket<C>> for SharedTokenBucket<C> {
    fn from(bucket: TokenBucket<C>) -> Self {
        SharedTokenBucket::new(bucket)
    }
}

/// A [`RingBuffer`] usable through a shared reference.
#[derive(Debug)]
pub struct SharedRingBuffer<T> {
    inner: Mutex<RingBuffer<T>>,
}

impl<T> SharedRingBuffer<T> {
    /// Wraps `buffer` for shared use.
    pub fn new(buffer: RingBuffer<T>) -> Self {
        SharedRingBuffer {
            inner: Mutex::new(buffer),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, RingBuffer<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`RingBuffer::put`].
    pub fn put(&self, value: T) {
        self.lock().put(value)
    }

    /// See [`RingBuffer::len`].
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// See [`RingBuffer::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// See [`RingBuffer::capacity`].
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Unwraps the buffer.
    pub fn into_inner(self) -> RingBuffer<T> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> SharedRingBuffer<T> {
    /// See [`RingBuffer::snapshot`].
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().snapshot()
    }

    /// See [`RingBuffer::slice`].
    pub fn slice<R: RangeBounds<isize>>(&self, range: R) -> Vec<T> {
        self.lock().slice(range)
    }

    /// See [`RingBuffer::latest`].
    pub fn latest(&self) -> Option<T> {
        self.lock().latest().cloned()
    }
}

impl<T> From<RingBuffer<T>> for SharedRingBuffer<T> {
    fn from(buffer: RingBuffer<T>) -> Self {
        SharedRingBuffer::new(buffer)
    }
}
