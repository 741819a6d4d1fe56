//! Staff roster types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Staff identifier as issued by the business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub String);

impl StaffId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StaffId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A member of a business's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    #[serde(default)]
    pub role: String,
    /// Business owner; bookings with them are billed at the director rate.
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub rating: f32,
}

fn default_available() -> bool {
    true
}

/// Who the customer wants to be served by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffChoice {
    /// Let the platform pick ("Maestro match").
    #[default]
    Auto,
    Specific(StaffId),
}

impl StaffChoice {
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Parse the CLI/caller form: `auto` or a staff id.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Specific(StaffId::new(input))
        }
    }
}

impl fmt::Display for StaffChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("AUTO"),
            Self::Specific(id) => write!(f, "{id}"),
        }
    }
}
