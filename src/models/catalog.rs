//! Service catalog entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bookable sub-service and its base price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubService {
    pub name: String,
    pub price: Decimal,
}

/// A catalog entry offered by a business.
///
/// Owned by the directory; the wizard only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sub_services: Vec<SubService>,
}

impl ServiceEntry {
    /// Look up a sub-service by name.
    pub fn sub_service(&self, name: &str) -> Option<&SubService> {
        self.sub_services.iter().find(|s| s.name == name)
    }

    /// Base price of a sub-service, if it is offered.
    pub fn price_of(&self, name: &str) -> Option<Decimal> {
        self.sub_service(name).map(|s| s.price)
    }
}
