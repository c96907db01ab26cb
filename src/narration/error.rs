use thiserror::Error;

use super::compositor::MeasureError;

/// Contract violations and fatal conditions that abort a generation run.
///
/// Recoverable media conditions (missing audio, empty text, oversized
/// segments) never surface here; they are reported as log events.
#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("slide index {0} is invalid (slide indices start at 1)")]
    InvalidSlideIndex(u32),

    #[error("slide index {0} appears more than once")]
    DuplicateSlide(u32),

    #[error("{what} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { what: String, value: f64 },

    #[error("no timeline entry for slide {0}")]
    MissingTimeline(u32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("text measurement failed: {0}")]
    Measurement(#[from] MeasureError),
}

impl NarrationError {
    pub fn invalid_duration(what: impl Into<String>, value: f64) -> Self {
        NarrationError::InvalidDuration {
            what: what.into(),
            value,
        }
    }
}

/// Reject negative, NaN and infinite durations.
pub fn ensure_duration(what: impl FnOnce() -> String, value: f64) -> Result<f64, NarrationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(NarrationError::invalid_duration(what(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_duration_rejects_negative_and_nan() {
        assert!(ensure_duration(|| "padding".into(), 0.0).is_ok());
        assert!(ensure_duration(|| "padding".into(), 2.5).is_ok());
        assert!(matches!(
            ensure_duration(|| "padding".into(), -0.1),
            Err(NarrationError::InvalidDuration { .. })
        ));
        assert!(ensure_duration(|| "audio".into(), f64::NAN).is_err());
        assert!(ensure_duration(|| "audio".into(), f64::INFINITY).is_err());
    }

    #[test]
    fn messages_name_the_offending_value() {
        let err = NarrationError::invalid_duration("slide 3 audio duration", -1.0);
        assert_eq!(
            err.to_string(),
            "slide 3 audio duration must be a finite, non-negative number of seconds (got -1)"
        );
        assert_eq!(
            NarrationError::DuplicateSlide(4).to_string(),
            "slide index 4 appears more than once"
        );
    }
}
