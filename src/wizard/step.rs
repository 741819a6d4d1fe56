//! Wizard steps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the customer is in the booking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Services,
    DateTime,
    Customization,
    Staff,
    Summary,
    /// Charge in flight; nothing else is accepted.
    Processing,
    /// Charge failed; retry or go back to Summary.
    PaymentFailed,
    Success,
}

impl Step {
    /// Number of steps shown in the progress header.
    pub const TOTAL_STEPS: usize = 6;

    /// Position in the progress header (1-based).
    pub fn number(self) -> usize {
        match self {
            Self::Services => 1,
            Self::DateTime => 2,
            Self::Customization => 3,
            Self::Staff => 4,
            Self::Summary | Self::Processing | Self::PaymentFailed => 5,
            Self::Success => 6,
        }
    }

    /// Step title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Services => "Select Services",
            Self::DateTime => "Date & Time",
            Self::Customization => "Customization",
            Self::Staff => "Choose Staff",
            Self::Summary => "Review & Pay",
            Self::Processing => "Processing Payment",
            Self::PaymentFailed => "Payment Failed",
            Self::Success => "Booking Confirmed",
        }
    }

    /// Step reached by `next` when the current step's checks pass.
    pub fn following(self) -> Option<Self> {
        match self {
            Self::Services => Some(Self::DateTime),
            Self::DateTime => Some(Self::Customization),
            Self::Customization => Some(Self::Staff),
            Self::Staff => Some(Self::Summary),
            Self::Summary | Self::Processing | Self::PaymentFailed | Self::Success => None,
        }
    }

    /// Step reached by `back`, ignoring mode-specific limits.
    pub fn preceding(self) -> Option<Self> {
        match self {
            Self::DateTime => Some(Self::Services),
            Self::Customization => Some(Self::DateTime),
            Self::Staff => Some(Self::Customization),
            Self::Summary => Some(Self::Staff),
            Self::PaymentFailed => Some(Self::Summary),
            Self::Services | Self::Processing | Self::Success => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain() {
        let mut step = Step::Services;
        let mut seen = vec![step];
        while let Some(next) = step.following() {
            step = next;
            seen.push(step);
        }
        assert_eq!(
            seen,
            vec![Step::Services, Step::DateTime, Step::Customization, Step::Staff, Step::Summary]
        );
    }

    #[test]
    fn test_backward_links() {
        assert_eq!(Step::Summary.preceding(), Some(Step::Staff));
        assert_eq!(Step::PaymentFailed.preceding(), Some(Step::Summary));
        assert_eq!(Step::Services.preceding(), None);
        assert_eq!(Step::Processing.preceding(), None);
        assert_eq!(Step::Success.preceding(), None);
    }

    #[test]
    fn test_numbers_within_total() {
        for step in [Step::Services, Step::Summary, Step::PaymentFailed, Step::Success] {
            assert!(step.number() >= 1 && step.number() <= Step::TOTAL_STEPS);
        }
    }
}
