pub mod config;
pub mod directory;
pub mod error;
pub mod matching;
pub mod models;
pub mod payment;
pub mod pricing;
pub mod session;
pub mod wizard;

pub use error::{BookingError, Result};
