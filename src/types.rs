//! Scalar aliases for token amounts and timestamps.
//!
//! Token buckets refill continuously, so both amounts and times are real
//! valued. The aliases document which of the two a given `f64` carries.

/// Alias for a (possibly fractional) number of tokens.
pub type Tokens = f64;

/// Alias for a timestamp or a duration, in seconds.
///
/// Timestamps are only meaningful relative to the [`Clock`](crate::clock::Clock)
/// that produced them.
pub type Seconds = f64;
