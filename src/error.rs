//! Error types and handling.

use crate::config::ConfigError;
use crate::payment::PaymentError;
use crate::wizard::Step;
use thiserror::Error;

/// Booking-wide error type
#[derive(Error, Debug)]
pub enum BookingError {
    /// Step input is incomplete or invalid; the wizard stays where it is
    #[error("Validation error: {0}")]
    Validation(String),

    /// Action not allowed from the current step
    #[error("Cannot {action} from step {step}")]
    InvalidTransition { action: &'static str, step: Step },

    /// Service id not present in the directory
    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// Staff id not present in the roster
    #[error("Unknown staff member: {0}")]
    UnknownStaff(String),

    /// AUTO match found nobody to assign
    #[error("No staff member is eligible for automatic assignment")]
    NoEligibleStaff,

    /// Chosen date/slot was taken between steps
    #[error("Time slot {slot} on {date} is no longer available")]
    SlotUnavailable { date: chrono::NaiveDate, slot: String },

    /// Payment gateway failure
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// A charge is already running for this session
    #[error("A payment is already being processed")]
    PaymentInFlight,

    /// Operation on a wizard that is not open
    #[error("Booking wizard is closed")]
    Closed,

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory fixture could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for BookingError
pub type Result<T> = std::result::Result<T, BookingError>;

impl BookingError {
    /// Create a validation error with message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a parse error with message
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether the user can fix this at the current step and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::SlotUnavailable { .. } | Self::NoEligibleStaff | Self::UnknownStaff(_)
        )
    }
}
