//! Booking record accumulated by the wizard.

use super::staff::{StaffChoice, StaffId};
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Display-only booking reference shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    pub const PREFIX: &'static str = "GLD-";

    /// Draw a new ticket number.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let number: u32 = rng.random_range(100_000..=999_999);
        Self(format!("{}{number}", Self::PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the wizard was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingMode {
    #[default]
    Book,
    Reschedule,
}

/// Seed for reschedule mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialData {
    #[serde(default)]
    pub selected_services: Vec<String>,
    pub staff: Option<StaffChoice>,
}

/// Parameters supplied by the screen that opens the wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenOptions {
    pub service_id: String,
    #[serde(default)]
    pub mode: BookingMode,
    /// Pre-selects a staff member instead of AUTO.
    pub initial_staff: Option<StaffId>,
    /// Only read in reschedule mode.
    pub initial_data: Option<InitialData>,
}

impl OpenOptions {
    pub fn book(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            ..Default::default()
        }
    }

    pub fn reschedule(service_id: impl Into<String>, initial_data: InitialData) -> Self {
        Self {
            service_id: service_id.into(),
            mode: BookingMode::Reschedule,
            initial_data: Some(initial_data),
            ..Default::default()
        }
    }

    pub fn with_initial_staff(mut self, staff: impl Into<StaffId>) -> Self {
        self.initial_staff = Some(staff.into());
        self
    }
}

/// The in-progress booking. Replaced on every (re)open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingState {
    pub selected_services: BTreeSet<String>,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<String>,
    pub staff: StaffChoice,
    pub custom_image: Option<String>,
    pub special_note: Option<String>,
    /// Set only while `staff` is AUTO and the Staff step has been left.
    pub assigned_staff: Option<StaffId>,
    pub ticket_id: TicketId,
}

impl BookingState {
    /// Build the starting record for the given open options.
    pub fn initial(options: &OpenOptions, ticket_id: TicketId) -> Self {
        let default_staff = options
            .initial_staff
            .clone()
            .map(StaffChoice::Specific)
            .unwrap_or_default();

        let mut state = Self {
            selected_services: BTreeSet::new(),
            date: None,
            time_slot: None,
            staff: default_staff,
            custom_image: None,
            special_note: None,
            assigned_staff: None,
            ticket_id,
        };

        if options.mode == BookingMode::Reschedule
            && let Some(seed) = &options.initial_data
        {
            state.selected_services = seed.selected_services.iter().cloned().collect();
            if let Some(staff) = &seed.staff {
                state.staff = staff.clone();
            }
        }

        state
    }

    /// Staff member whose rate applies: the chosen one, or the AUTO assignee.
    pub fn resolved_staff(&self) -> Option<&StaffId> {
        match &self.staff {
            StaffChoice::Specific(id) => Some(id),
            StaffChoice::Auto => self.assigned_staff.as_ref(),
        }
    }
}
