//! Directory backed by vectors, loaded from a TOML fixture.

use super::Directory;
use crate::error::{BookingError, Result};
use crate::models::{ServiceEntry, StaffId, StaffMember};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Roster entry as stored in the fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRecord {
    #[serde(flatten)]
    pub member: StaffMember,
    /// Service ids this member delivers. Empty means all services.
    #[serde(default)]
    pub services: Vec<String>,
}

/// A slot that can no longer be booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedSlot {
    pub date: NaiveDate,
    pub slot: String,
    /// Blocks only this member; `None` blocks the whole business.
    pub staff: Option<StaffId>,
}

/// Fixture file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    services: Vec<ServiceEntry>,
    #[serde(default)]
    staff: Vec<StaffRecord>,
    #[serde(default)]
    blocked_slots: Vec<BlockedSlot>,
}

/// In-memory directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    services: Vec<ServiceEntry>,
    staff: Vec<StaffRecord>,
    blocked: Vec<BlockedSlot>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let directory = Self::from_toml_str(&content)?;
        debug!(
            "Loaded directory from {:?}: {} services, {} staff",
            path,
            directory.services.len(),
            directory.staff.len()
        );
        Ok(directory)
    }

    /// Parse a fixture document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: DirectoryFile = toml::from_str(content).map_err(|e| BookingError::parse(e.to_string()))?;

        for service in &file.services {
            if service.id.trim().is_empty() {
                return Err(BookingError::parse("Service id cannot be empty"));
            }
            if let Some(sub) = service.sub_services.iter().find(|s| s.price.is_sign_negative()) {
                return Err(BookingError::parse(format!(
                    "Sub-service '{}' of '{}' has a negative price",
                    sub.name, service.id
                )));
            }
        }

        Ok(Self {
            services: file.services,
            staff: file.staff,
            blocked: file.blocked_slots,
        })
    }

    /// Add a catalog entry.
    pub fn with_service(mut self, service: ServiceEntry) -> Self {
        self.services.push(service);
        self
    }

    /// Add a member who delivers every service.
    pub fn with_staff(mut self, member: StaffMember) -> Self {
        self.staff.push(StaffRecord {
            member,
            services: Vec::new(),
        });
        self
    }

    /// Mark a slot as taken.
    pub fn block_slot(&mut self, date: NaiveDate, slot: impl Into<String>, staff: Option<StaffId>) {
        self.blocked.push(BlockedSlot {
            date,
            slot: slot.into(),
            staff,
        });
    }
}

impl Directory for InMemoryDirectory {
    fn services(&self) -> Vec<ServiceEntry> {
        self.services.clone()
    }

    fn service(&self, id: &str) -> Option<ServiceEntry> {
        self.services.iter().find(|s| s.id == id).cloned()
    }

    fn roster(&self, service_id: &str) -> Vec<StaffMember> {
        self.staff
            .iter()
            .filter(|r| r.services.is_empty() || r.services.iter().any(|s| s == service_id))
            .map(|r| r.member.clone())
            .collect()
    }

    fn staff(&self, id: &StaffId) -> Option<StaffMember> {
        self.staff.iter().find(|r| &r.member.id == id).map(|r| r.member.clone())
    }

    fn is_slot_open(&self, date: NaiveDate, slot: &str, staff: Option<&StaffId>) -> bool {
        !self.blocked.iter().any(|b| {
            b.date == date
                && b.slot == slot
                && match (&b.staff, staff) {
                    (None, _) => true,
                    (Some(blocked), Some(wanted)) => blocked == wanted,
                    (Some(_), None) => false,
                }
        })
    }
}
