//! Service catalog and staff roster lookup.
//!
//! Screens never reach into a global data store; the wizard is handed a
//! [`Directory`] and asks it for the catalog entry, the roster, and slot
//! availability.

pub mod in_memory;

use crate::models::{ServiceEntry, StaffId, StaffMember};
use chrono::NaiveDate;

pub use in_memory::InMemoryDirectory;

/// Read access to catalog, roster, and calendar.
pub trait Directory: Send + Sync {
    /// All catalog entries.
    fn services(&self) -> Vec<ServiceEntry>;

    /// Catalog entry by id.
    fn service(&self, id: &str) -> Option<ServiceEntry>;

    /// Staff who can deliver the given service.
    fn roster(&self, service_id: &str) -> Vec<StaffMember>;

    /// Staff member by id.
    fn staff(&self, id: &StaffId) -> Option<StaffMember>;

    /// Whether the slot can still be booked. `None` asks about the business
    /// as a whole; per-member blocks only apply when `staff` names them.
    fn is_slot_open(&self, date: NaiveDate, slot: &str, staff: Option<&StaffId>) -> bool;
}
