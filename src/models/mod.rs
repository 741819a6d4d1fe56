//! Data models for the service catalog, staff roster, and booking record.

pub mod booking;
pub mod catalog;
pub mod staff;

pub use booking::{BookingMode, BookingState, InitialData, OpenOptions, TicketId};
pub use catalog::{ServiceEntry, SubService};
pub use staff::{StaffChoice, StaffId, StaffMember};
