//! Star rating attached to a review.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum RatingError {
    /// The value is NaN or infinite.
    #[error("rating must be a finite number")]
    NotFinite,
    /// The value lies outside the accepted range.
    #[error("rating must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// Offending value.
        value: f64,
        /// Lowest accepted value.
        min: f64,
        /// Highest accepted value.
        max: f64,
    },
}

/// A review rating between 0 and 5 stars inclusive.
///
/// The backend rejects anything outside this range with a 400; validating
/// locally lets the caller report the problem without a round trip.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: f64 = 0.0;
    /// Highest accepted rating.
    pub const MAX: f64 = 5.0;

    /// Create a validated rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] when the value is not finite or out of range.
    pub fn new(value: f64) -> Result<Self, RatingError> {
        if !value.is_finite() {
            return Err(RatingError::NotFinite);
        }
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(RatingError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    /// The numeric value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Number of filled stars when rendered on a five-star scale.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to 0..=5
    pub fn filled_stars(self) -> u8 {
        self.0.round().clamp(Self::MIN, Self::MAX) as u8
    }
}

impl TryFrom<f64> for Rating {
    type Error = RatingError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(Rating::new(0.0).is_ok());
        assert!(Rating::new(5.0).is_ok());
        assert!(Rating::new(4.5).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            Rating::new(5.5),
            Err(RatingError::OutOfRange { .. })
        ));
        assert!(matches!(
            Rating::new(-0.1),
            Err(RatingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        assert_eq!(Rating::new(f64::NAN), Err(RatingError::NotFinite));
    }

    #[test]
    fn test_filled_stars_rounds() {
        assert_eq!(Rating::new(4.5).unwrap().filled_stars(), 5);
        assert_eq!(Rating::new(3.2).unwrap().filled_stars(), 3);
    }

    #[test]
    fn test_display_one_decimal() {
        assert_eq!(Rating::new(4.0).unwrap().to_string(), "4.0");
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        let bad: Result<Rating, _> = serde_json::from_str("7");
        assert!(bad.is_err());
    }
}
