//! Payment error types.

use thiserror::Error;

/// Errors that can occur while charging a booking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    /// Gateway refused the charge.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// No answer within the configured timeout.
    #[error("Timeout waiting for payment confirmation")]
    Timeout,

    /// Transport failure or unexpected gateway response.
    #[error("Gateway error: {0}")]
    Gateway(String),
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
