//! Error types for band construction and ensemble control.

use thiserror::Error;

/// Errors raised by the simulation core.
///
/// All of these are raised synchronously at the call that violates a
/// precondition. Nothing is retried or defaulted internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A constructor or setter was given a value outside its allowed range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The ensemble has already been torn down.
    #[error("ensemble has been shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Require `value > 0` and finite.
pub(crate) fn ensure_positive(name: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::invalid(name, format!("must be finite, got {}", value)));
    }
    if value <= 0.0 {
        return Err(Error::invalid(name, format!("must be > 0, got {}", value)));
    }
    Ok(())
}

/// Require `value >= 0` and finite.
pub(crate) fn ensure_non_negative(name: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::invalid(name, format!("must be finite, got {}", value)));
    }
    if value < 0.0 {
        return Err(Error::invalid(name, format!("must be >= 0, got {}", value)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_rejects_zero_and_nan() {
        assert!(ensure_positive("length", 1.0).is_ok());
        assert!(ensure_positive("length", 0.0).is_err());
        assert!(ensure_positive("length", f32::NAN).is_err());
        assert!(ensure_positive("length", f32::INFINITY).is_err());
    }

    #[test]
    fn test_non_negative_accepts_zero() {
        assert!(ensure_non_negative("amplitude", 0.0).is_ok());
        assert!(ensure_non_negative("amplitude", -0.01).is_err());
    }

    #[test]
    fn test_error_message_names_parameter() {
        let err = ensure_positive("frequency", -1.0).unwrap_err();
        assert!(err.to_string().contains("frequency"));
        assert!(matches!(err, Error::InvalidParameter { name: "frequency", .. }));
    }
}
