use std::iter::FusedIterator;
use std::ops::{Bound, Range, RangeBounds};
use std::slice;

use tracing::{debug, trace};

use crate::error::{GuardError, GuardResult};

/// Fixed-capacity FIFO history buffer.
///
/// The buffer keeps the most recent `capacity` values pushed into it. Once it
/// is full, every [`put`](RingBuffer::put) silently evicts the oldest value.
/// Storage is allocated once at construction and never grows.
///
/// # Algorithm Behavior
///
/// - Values are written at a cursor that wraps around to slot 0
/// - Once the cursor has wrapped, the buffer stays full forever
/// - Reads see values in logical order, oldest first, regardless of which
///   physical slot holds them
///
/// # Example
///
/// ```rust
/// use flow_guard_core::primitives::RingBuffer;
///
/// let mut history = RingBuffer::new(3)?;
/// for sample in [1, 2, 3, 4] {
///     history.put(sample);
/// }
///
/// // The first sample has been evicted
/// assert_eq!(history.snapshot(), vec![2, 3, 4]);
/// assert_eq!(history.len(), 3);
///
/// // Negative indices count from the newest end
/// assert_eq!(history.slice(-2..), vec![3, 4]);
/// # Ok::<(), flow_guard_core::GuardError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Physical slots; a slot is `None` only until it is first written
    storage: Box<[Option<T>]>,
    /// Index of the next slot to overwrite
    cursor: usize,
    /// Set once the cursor has wrapped around
    full: bool,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` values.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidArgument`] if `capacity` is zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flow_guard_core::primitives::RingBuffer;
    ///
    /// let history: RingBuffer<f64> = RingBuffer::new(128)?;
    /// assert!(history.is_empty());
    /// assert!(RingBuffer::<f64>::new(0).is_err());
    /// # Ok::<(), flow_guard_core::GuardError>(())
    /// ```
    pub fn new(capacity: usize) -> GuardResult<Self> {
        if capacity == 0 {
            return Err(GuardError::invalid("capacity", "must be greater than 0"));
        }

        debug!(capacity, "creating ring buffer");
        Ok(RingBuffer {
            storage: (0..capacity).map(|_| None).collect(),
            cursor: 0,
            full: false,
        })
    }

    /// Appends a value, evicting the oldest one if the buffer is full.
    #[inline]
    pub fn put(&mut self, value: T) {
        self.storage[self.cursor] = Some(value);
        self.cursor += 1;
        if self.cursor == self.storage.len() {
            self.cursor = 0;
            if !self.full {
                trace!(capacity = self.storage.len(), "ring buffer is full, evicting from now on");
                self.full = true;
            }
        }
    }

    /// Returns the number of values currently retained.
    ///
    /// Grows with each `put` until it reaches the capacity, then stays there.
    #[inline]
    pub fn len(&self) -> usize {
        if self.full {
            self.storage.len()
        } else {
            self.cursor
        }
    }

    /// Returns `true` if nothing has been put yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the buffer has wrapped and started evicting.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the value at logical `index` (0 is the oldest).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        let physical = if self.full {
            (self.cursor + index) % self.storage.len()
        } else {
            index
        };
        self.storage[physical].as_ref()
    }

    /// Returns the oldest retained value.
    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the most recently put value.
    pub fn latest(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|last| self.get(last))
    }

    /// Iterates over the retained values, oldest first.
    pub fn iter(&self) -> Iter<'_, T> {
        let (older, newer) = self.segments();
        Iter {
            inner: older.iter().chain(newer.iter()),
        }
    }

    /// The logical order as two physical runs: the run after the cursor (only
    /// once full) followed by the run before it.
    fn segments(&self) -> (&[Option<T>], &[Option<T>]) {
        if self.full {
            let (head, tail) = self.storage.split_at(self.cursor);
            (tail, head)
        } else {
            (&self.storage[..self.cursor], &[])
        }
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies out all retained values, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Copies out a sub-range of the logical order.
    ///
    /// Indices follow the usual sequence slicing rules: negative indices count
    /// back from the newest value, bounds past either end are clamped, and an
    /// empty or inverted range yields an empty vector.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flow_guard_core::primitives::RingBuffer;
    ///
    /// let mut history = RingBuffer::new(5)?;
    /// history.extend(1..=7);
    ///
    /// assert_eq!(history.snapshot(), vec![3, 4, 5, 6, 7]);
    /// assert_eq!(history.slice(1..3), vec![4, 5]);
    /// assert_eq!(history.slice(..-3), vec![3, 4]);
    /// assert_eq!(history.slice(-10..100), vec![3, 4, 5, 6, 7]);
    /// assert_eq!(history.slice(3..1), Vec::<i32>::new());
    /// # Ok::<(), flow_guard_core::GuardError>(())
    /// ```
    pub fn slice<R: RangeBounds<isize>>(&self, range: R) -> Vec<T> {
        let Range { start, end } = resolve_range(&range, self.len());
        if start >= end {
            return Vec::new();
        }
        self.iter().skip(start).take(end - start).cloned().collect()
    }

    /// Copies out every `step`-th value of a sub-range of the logical order.
    ///
    /// With a negative `step` the walk goes from newer to older values, and
    /// the range is read in walking order: `range.start` is where the walk
    /// begins. Unbounded ends default to the matching end of the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidArgument`] if `step` is zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flow_guard_core::primitives::RingBuffer;
    ///
    /// let mut history = RingBuffer::new(4)?;
    /// history.extend([10, 20, 30, 40, 50]);
    ///
    /// assert_eq!(history.slice_step(.., 2)?, vec![20, 40]);
    /// assert_eq!(history.slice_step(.., -1)?, vec![50, 40, 30, 20]);
    /// assert_eq!(history.slice_step(2..0, -1)?, vec![40, 30]);
    /// assert!(history.slice_step(.., 0).is_err());
    /// # Ok::<(), flow_guard_core::GuardError>(())
    /// ```
    pub fn slice_step<R: RangeBounds<isize>>(&self, range: R, step: isize) -> GuardResult<Vec<T>> {
        if step == 0 {
            return Err(GuardError::invalid("step", "must not be zero"));
        }
        if step == 1 {
            return Ok(self.slice(range));
        }

        let len = self.len() as i128;
        let step = step as i128;
        let (start, stop) = resolve_stepped(&range, len, step);

        let mut values = Vec::new();
        let mut index = start;
        while (step > 0 && index < stop) || (step < 0 && index > stop) {
            // `index` stays within [0, len) while the loop condition holds
            if let Some(value) = self.get(index as usize) {
                values.push(value.clone());
            }
            index += step;
        }
        Ok(values)
    }
}

impl<T> Extend<T> for RingBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) {
        for value in values {
            self.put(value);
        }
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a [`RingBuffer`], oldest value first.
#[derive(Debug, Clone)]
pub struct Iter<'a, T> {
    inner: std::iter::Chain<slice::Iter<'a, Option<T>>, slice::Iter<'a, Option<T>>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().and_then(Option::as_ref)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().and_then(Option::as_ref)
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> FusedIterator for Iter<'a, T> {}

/// Counts a negative index back from the end of a sequence of `len` values.
fn absolute(index: isize, len: usize) -> i128 {
    if index < 0 {
        index as i128 + len as i128
    } else {
        index as i128
    }
}

/// Resolves a unit-step range against a sequence of `len` values, clamping
/// both ends into `[0, len]`.
fn resolve_range<R: RangeBounds<isize>>(range: &R, len: usize) -> Range<usize> {
    let upper = len as i128;
    let start = match range.start_bound() {
        Bound::Included(&s) => absolute(s, len),
        Bound::Excluded(&s) => absolute(s, len) + 1,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => absolute(e, len) + 1,
        Bound::Excluded(&e) => absolute(e, len),
        Bound::Unbounded => upper,
    };
    (start.clamp(0, upper) as usize)..(end.clamp(0, upper) as usize)
}

/// Resolves a range for a non-unit step into a `(start, stop)` pair of
/// positions to walk, following the standard extended slicing rules.
///
/// For negative steps `-1` is used as the "before the first value" sentinel.
fn resolve_stepped<R: RangeBounds<isize>>(range: &R, len: i128, step: i128) -> (i128, i128) {
    let direction = step.signum();
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };

    let count = len as usize;

    let start = match range.start_bound() {
        Bound::Included(&s) => absolute(s, count).clamp(lower, upper),
        Bound::Excluded(&s) => (absolute(s, count) + direction).clamp(lower, upper),
        Bound::Unbounded => {
            if step > 0 {
                0
            } else {
                len - 1
            }
        }
    };
    let stop = match range.end_bound() {
        Bound::Included(&e) => (absolute(e, count) + direction).clamp(lower, upper),
        Bound::Excluded(&e) => absolute(e, count).clamp(lower, upper),
        Bound::Unbounded => {
            if step > 0 {
                len
            } else {
                -1
            }
        }
    };
    (start, stop)
}

/// Configuration for creating a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RingBufferConfig {
    /// Number of values the buffer retains.
    pub capacity: usize,
}

impl RingBufferConfig {
    /// Creates a new configuration instance.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl<T> TryFrom<RingBufferConfig> for RingBuffer<T> {
    type Error = GuardError;

    /// Builds a buffer from its configuration.
    ///
    /// ```
    /// use flow_guard_core::primitives::{RingBuffer, RingBufferConfig};
    ///
    /// let history = RingBuffer::<u64>::try_from(RingBufferConfig { capacity: 16 })?;
    /// assert_eq!(history.capacity(), 16);
    ///
    /// let invalid: Result<RingBuffer<u64>, _> = RingBufferConfig::new(0).try_into();
    /// assert!(invalid.is_err());
    /// # Ok::<(), flow_guard_core::GuardError>(())
    /// ```
    fn try_from(config: RingBufferConfig) -> GuardResult<Self> {
        RingBuffer::new(config.capacity)
    }
}
