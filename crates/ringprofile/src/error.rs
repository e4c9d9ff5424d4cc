//! Error type shared by geometry generation and aggregation.

/// Coarse classification of a [`ProfileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A numeric parameter (radius, width, calibration, center) is unusable.
    InvalidParameter,
    /// The image grid handed to the aggregator is unusable.
    InvalidInput,
}

/// Errors raised before any ring is accumulated.
///
/// An empty ring is not an error; it is reported as a NaN mean in
/// [`crate::RingResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// A parameter that must be strictly positive and finite was not.
    NonPositive {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A coordinate that must be finite was NaN or infinite.
    NonFinite {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// `floor(max_radius / ring_width)` is zero.
    NoRings {
        /// Requested maximum radius (physical units).
        max_radius: f64,
        /// Requested ring width (physical units).
        ring_width: f64,
    },
    /// `floor(max_radius / ring_width)` exceeds the supported ring count.
    TooManyRings {
        /// Requested ring count.
        count: f64,
        /// Largest supported ring count.
        limit: usize,
    },
    /// The image has no pixels.
    EmptyImage {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
    /// Backing buffer length does not match `width * height`.
    GridSizeMismatch {
        /// Expected sample count.
        expected: usize,
        /// Provided sample count.
        got: usize,
    },
}

impl ProfileError {
    /// Which of the two error classes this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositive { .. }
            | Self::NonFinite { .. }
            | Self::NoRings { .. }
            | Self::TooManyRings { .. } => ErrorKind::InvalidParameter,
            Self::EmptyImage { .. } | Self::GridSizeMismatch { .. } => ErrorKind::InvalidInput,
        }
    }
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositive { name, value } => {
                write!(f, "invalid parameter: {} must be positive, got {}", name, value)
            }
            Self::NonFinite { name, value } => {
                write!(f, "invalid parameter: {} must be finite, got {}", name, value)
            }
            Self::NoRings {
                max_radius,
                ring_width,
            } => write!(
                f,
                "invalid parameter: max radius {} is smaller than one ring width {}",
                max_radius, ring_width
            ),
            Self::TooManyRings { count, limit } => write!(
                f,
                "invalid parameter: {} rings requested, at most {} supported",
                count, limit
            ),
            Self::EmptyImage { width, height } => {
                write!(f, "invalid input: image is empty ({}x{})", width, height)
            }
            Self::GridSizeMismatch { expected, got } => write!(
                f,
                "invalid input: grid needs {} samples, got {}",
                expected, got
            ),
        }
    }
}

impl std::error::Error for ProfileError {}

/// Check that `value` is finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64, ProfileError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ProfileError::NonPositive { name, value })
    }
}

/// Check that `value` is finite.
pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64, ProfileError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProfileError::NonFinite { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_split_parameters_from_inputs() {
        let p = ProfileError::NoRings {
            max_radius: 5.0,
            ring_width: 10.0,
        };
        assert_eq!(p.kind(), ErrorKind::InvalidParameter);
        let i = ProfileError::EmptyImage {
            width: 0,
            height: 4,
        };
        assert_eq!(i.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn positivity_rejects_zero_negative_and_nan() {
        assert!(require_positive("w", 1.5).is_ok());
        assert!(require_positive("w", 0.0).is_err());
        assert!(require_positive("w", -2.0).is_err());
        assert!(require_positive("w", f64::NAN).is_err());
        assert!(require_positive("w", f64::INFINITY).is_err());
    }

    #[test]
    fn display_names_the_parameter() {
        let e = ProfileError::NonPositive {
            name: "ring_width",
            value: -1.0,
        };
        assert!(e.to_string().contains("ring_width"));
    }
}
