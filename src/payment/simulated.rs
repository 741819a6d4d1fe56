//! Gateway that approves after a fixed delay.

use super::{PaymentGateway, PaymentReceipt, PaymentRequest, Result};
use crate::payment::PaymentError;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Offline gateway for demos and tests.
#[derive(Debug)]
pub struct SimulatedGateway {
    delay: Duration,
    /// Number of upcoming charges to decline before approving.
    declines_left: AtomicUsize,
    decline_reason: String,
}

impl SimulatedGateway {
    /// Default processing time.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

    /// Approve every charge after `delay`.
    pub fn approving(delay: Duration) -> Self {
        Self {
            delay,
            declines_left: AtomicUsize::new(0),
            decline_reason: String::new(),
        }
    }

    /// Decline the next `count` charges, then approve.
    pub fn declining_first(delay: Duration, count: usize, reason: impl Into<String>) -> Self {
        Self {
            delay,
            declines_left: AtomicUsize::new(count),
            decline_reason: reason.into(),
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::approving(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt> {
        debug!("Simulating charge for {} ({:?})", request.ticket_id, self.delay);
        tokio::time::sleep(self.delay).await;

        let declined = self
            .declines_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if declined {
            return Err(PaymentError::Declined(self.decline_reason.clone()));
        }

        Ok(PaymentReceipt {
            reference: format!("SIM-{}", request.ticket_id.as_str().trim_start_matches("GLD-")),
            ticket_id: request.ticket_id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            paid_at: Utc::now(),
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
