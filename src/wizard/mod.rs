//! Customer booking wizard.
//!
//! Steps run `Services -> DateTime -> Customization -> Staff -> Summary`,
//! then `Processing` while the escrow charge is in flight, ending in
//! `Success` or `PaymentFailed`.

mod machine;
mod step;


pub use machine::{BookingWizard, WizardSettings};
pub use step::Step;
