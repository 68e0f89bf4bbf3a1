//! The two flow guard primitives.
//!
//! - **[`RingBuffer`]** - Fixed-capacity FIFO history that evicts the oldest value
//! - **[`TokenBucket`]** - Continuously refilling admission control with burst tolerance
//!
//! # Thread Safety
//!
//! Neither primitive locks internally; operations that change state take
//! `&mut self`. See [`crate::shared`] for mutex-guarded wrappers.

pub mod ring_buffer;
pub use ring_buffer::Iter;
pub use ring_buffer::RingBuffer;
pub use ring_buffer::RingBufferConfig;

pub mod token_bucket;
pub use token_bucket::Admission;
pub use token_bucket::TokenBucket;
pub use token_bucket::TokenBucketPolicy;
