//! Primitives for bounding and smoothing resource consumption in a serving system.
//!
//! This library provides two small, independent building blocks for a
//! throttling or monitoring layer:
//!
//! - a fixed-capacity history buffer that keeps the most recent observations
//!   (latency samples, event markers) and evicts the oldest when full;
//! - a token bucket that admits work only when enough tokens have accrued at
//!   an average rate, while tolerating bursts up to a ceiling.
//!
//! # Quick Start
//!
//! ```rust
//! use flow_guard_core::primitives::{RingBuffer, TokenBucket};
//!
//! // Keep the last 100 latency samples
//! let mut latencies = RingBuffer::new(100)?;
//! latencies.put(12.5_f64);
//!
//! // Admit up to 50 requests per second, with bursts of 10
//! let mut bucket = TokenBucket::with_initial_amount(10.0)?;
//! if bucket.consume(1.0, 50.0, 10.0)? {
//!     println!("request admitted");
//! }
//! # Ok::<(), flow_guard_core::GuardError>(())
//! ```
//!
//! # Core Concepts
//!
//! ## Time Representation
//! Token buckets read time in seconds from a [`Clock`](clock::Clock). The
//! default is a [`MonotonicClock`](clock::MonotonicClock); tests and
//! simulations use a [`ManualClock`](clock::ManualClock), or pass timestamps
//! explicitly through the `*_at` methods.
//!
//! ## Per-call Policy
//! A token bucket does not store its rate or burst size. Both are passed to
//! every `consume`, so the caller can retune limits on the fly. Keep a
//! [`TokenBucketPolicy`](primitives::TokenBucketPolicy) per tenant to pass
//! consistent values.
//!
//! ## Error Handling
//! Only precondition violations are errors ([`GuardError::InvalidArgument`]):
//! a zero ring buffer capacity, or a negative or non-finite token amount, rate
//! or burst size. A token bucket rejecting a request is reported as `Ok(false)`.
//!
//! ## Thread Safety
//! The primitives are single-owner. For shared access use the mutex wrappers
//! in [`shared`].
//!
//! ## Logging
//! Construction is logged at `debug`, every bucket decision at `trace`, and a
//! clock going backwards at `warn`, through [`tracing`]. Install a subscriber
//! in the application to see them.

pub mod clock;
pub mod error;
pub mod primitives;
pub mod shared;
pub mod types;

pub use error::{GuardError, GuardResult};
