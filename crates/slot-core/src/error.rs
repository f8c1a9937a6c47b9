//! Error types for the slot capability.
//!
//! Two families live here:
//!
//! - **`CapabilityError`**: operational failures of a client request (bad
//!   field, out-of-range target, hardware refusal, missing label support,
//!   label persistence failure). These are *not* transport errors. The
//!   controller reports them to remote clients by moving the affected
//!   property to `Alert` and notifying observers; the error value itself is
//!   only handed back in [`crate::controller::Outcome`] for logging and tests.
//! - **`ConfigError`**: problems detected while building a controller from
//!   configuration (empty device name, inverted range, non-positive step).
//!   These abort instrument initialization.

use thiserror::Error;

/// Failure of a request addressed to the position or label property.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    /// The request named a field that does not exist on the property.
    #[error("{field} is not a member of {property} property")]
    UnknownField {
        /// Property the request was addressed to.
        property: String,
        /// Offending field name as received.
        field: String,
    },

    /// The requested position is outside the declared range.
    #[error("requested position {requested} is outside the valid range {min} to {max}")]
    OutOfRange {
        /// Raw value received from the client.
        requested: f64,
        /// Inclusive lower bound.
        min: i32,
        /// Inclusive upper bound.
        max: i32,
    },

    /// `begin_move` refused the move synchronously.
    #[error("hardware rejected move to position {target}")]
    HardwareRejected {
        /// Position that was refused.
        target: i32,
    },

    /// The instrument never enabled position labels.
    #[error("position labels are not supported by this device")]
    Unsupported,

    /// `persist_labels` reported failure. Applied labels are kept.
    #[error("error updating names of positions")]
    PersistFailed,
}

/// Invalid controller or driver configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Device names scope every property and must not be empty.
    #[error("device name must not be empty")]
    EmptyDeviceName,

    /// `min` is greater than `max`.
    #[error("invalid position range: min {min} is greater than max {max}")]
    InvalidRange {
        /// Requested lower bound.
        min: i32,
        /// Requested upper bound.
        max: i32,
    },

    /// One label is allocated per position up to `max`.
    #[error("position range max {max} exceeds the supported {limit} positions")]
    TooManyPositions {
        /// Requested upper bound.
        max: i32,
        /// Largest supported upper bound.
        limit: i32,
    },

    /// Step must be strictly positive.
    #[error("position step must be positive, got {0}")]
    InvalidStep(i32),

    /// Semantic validation failure not covered above.
    #[error("Configuration validation error: {0}")]
    Invalid(String),
}
