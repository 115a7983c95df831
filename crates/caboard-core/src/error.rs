//! # Error Types
//!
//! Errors shared by every caboard crate. Domain crates wrap
//! [`ValidationError`] in their own `thiserror` enums.

use thiserror::Error;

/// Top-level error type for foundational operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A caller supplied a malformed value: an unknown feature or dimension
/// name, an impossible month, a zero increment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Feature name not present in the feature table.
    #[error("unknown feature: {0:?}")]
    UnknownFeature(String),

    /// Limit dimension name not recognised.
    #[error("unknown limit dimension: {0:?}")]
    UnknownDimension(String),

    /// Plan tier name not recognised.
    #[error("unknown plan tier: {0:?}")]
    UnknownTier(String),

    /// Month outside 1..=12 or year outside the supported range.
    #[error("invalid period {year}-{month:02}")]
    InvalidPeriod {
        /// Calendar year.
        year: i32,
        /// Calendar month.
        month: u32,
    },

    /// A prospective action must consume at least one unit.
    #[error("increment for {dimension} must be greater than zero")]
    ZeroIncrement {
        /// Dimension the increment was requested for.
        dimension: String,
    },

    /// Free-form validation failure.
    #[error("{0}")]
    Invalid(String),
}
