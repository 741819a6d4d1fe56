//! HTTP payment gateway client.

use super::{PaymentGateway, PaymentReceipt, PaymentRequest, Result};
use crate::payment::PaymentError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Gateway response body.
#[derive(Debug, Deserialize)]
struct ChargeResponse {
    reference: String,
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Escrow gateway reached over HTTPS.
///
/// Posts the [`PaymentRequest`] as JSON to `{endpoint}/charges` with a bearer key.
pub struct HttpGateway {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpGateway {
    /// Create a new gateway client.
    ///
    /// # Arguments
    /// * `endpoint` - Gateway base URL (e.g., "https://pay.example.com/v1")
    /// * `api_key` - Secret key sent as a bearer token
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Gateway(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn map_transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::Timeout
    } else {
        PaymentError::Gateway(e.to_string())
    }
}

/// Turn a gateway reply into a receipt or a payment error.
///
/// `402` is a decline carrying the body as the reason; any other non-2xx is
/// a gateway fault. A 2xx body must be a [`ChargeResponse`].
fn charge_outcome(status: StatusCode, body: &str, request: &PaymentRequest) -> Result<PaymentReceipt> {
    if status == StatusCode::PAYMENT_REQUIRED {
        return Err(PaymentError::Declined(body.trim().to_string()));
    }
    if !status.is_success() {
        warn!("Gateway returned {status} for {}", request.ticket_id);
        return Err(PaymentError::Gateway(format!("Unexpected status {status}")));
    }

    let body: ChargeResponse =
        serde_json::from_str(body).map_err(|e| PaymentError::Gateway(format!("Invalid charge response: {e}")))?;

    match body.status.to_lowercase().as_str() {
        "approved" | "held" | "succeeded" => Ok(PaymentReceipt {
            reference: body.reference,
            ticket_id: request.ticket_id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            paid_at: Utc::now(),
        }),
        "declined" | "failed" => Err(PaymentError::Declined(
            body.message.unwrap_or_else(|| "declined by gateway".to_string()),
        )),
        other => Err(PaymentError::Gateway(format!("Unknown charge status: {other}"))),
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt> {
        let url = format!("{base}/charges", base = self.endpoint);
        debug!("POST {url} for {}", request.ticket_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        charge_outcome(status, &body, request)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
