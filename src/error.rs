//! error.rs
//! Defines the error and result types shared by the ring buffer and the token bucket.

use thiserror::Error;

/// Error type for flow guard operations.
///
/// Only precondition violations are errors. A token bucket refusing a request
/// is a normal outcome and is reported through the return value instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// An argument violated the operation's precondition.
    ///
    /// Raised before any state is touched, so the receiver is unchanged.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// Human readable description of what was wrong.
        reason: String,
    },
}

impl GuardError {
    pub(crate) fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        GuardError::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    /// Returns the name of the argument that caused the error.
    pub fn argument(&self) -> &'static str {
        match self {
            GuardError::InvalidArgument { argument, .. } => argument,
        }
    }
}

/// Result type for flow guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

/// Checks that a real-valued argument is finite.
pub(crate) fn ensure_finite(argument: &'static str, value: f64) -> GuardResult<f64> {
    if !value.is_finite() {
        return Err(GuardError::invalid(
            argument,
            format!("must be a finite number, got {}", value),
        ));
    }
    Ok(value)
}

/// Checks that a real-valued argument is finite and not negative.
pub(crate) fn ensure_non_negative(argument: &'static str, value: f64) -> GuardResult<f64> {
    ensure_finite(argument, value)?;
    if value < 0.0 {
        return Err(GuardError::invalid(
            argument,
            format!("must not be negative, got {}", value),
        ));
    }
    Ok(value)
}
