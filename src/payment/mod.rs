//! Escrow payment gateways.
//!
//! # Example
//!
//! ```ignore
//! use guild_booking::payment::{PaymentGateway, SimulatedGateway};
//!
//! let gateway = SimulatedGateway::approving(std::time::Duration::from_secs(2));
//! let receipt = gateway.charge(&request).await?;
//! ```

mod error;
mod http;
mod simulated;

use crate::models::{StaffId, TicketId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use error::{PaymentError, Result};
pub use http::HttpGateway;
pub use simulated::SimulatedGateway;

/// Charge sent to the gateway when the customer confirms the Summary step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub ticket_id: TicketId,
    pub service_id: String,
    /// Grand total including the escrow fee.
    pub amount: Decimal,
    pub escrow_fee: Decimal,
    pub currency: String,
    /// Staff member the funds are held for.
    pub payee: Option<StaffId>,
}

/// Proof that funds are held in escrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub ticket_id: TicketId,
    pub amount: Decimal,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
}

/// Something that can take the customer's money into escrow.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the request. Implementations do not retry.
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
