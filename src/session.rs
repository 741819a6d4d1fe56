//! Booking session: runs the wizard's escrow charge in the background.

use crate::config::{AppConfig, GatewayKind, SelectionStrategy};
use crate::directory::Directory;
use crate::error::{BookingError, Result};
use crate::matching::{RandomSelector, RankedSelector, StaffSelector};
use crate::models::{BookingMode, OpenOptions, StaffChoice};
use crate::payment::{HttpGateway, PaymentError, PaymentGateway, PaymentReceipt, SimulatedGateway};
use crate::pricing::PriceBreakdown;
use crate::wizard::{BookingWizard, Step, WizardSettings};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{error, info};

type PaymentOutcome = std::result::Result<PaymentReceipt, PaymentError>;

/// Why the wizard was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Closed before the booking was paid.
    Dismissed,
    /// Closed from the Success step.
    Completed,
}

/// Callback fired when the session closes.
pub type OnClose = Box<dyn FnMut(CloseReason) + Send>;

/// Snapshot of a booking for display and `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSummary {
    pub ticket_id: String,
    pub mode: BookingMode,
    pub step: Step,
    pub service: String,
    pub selected_services: Vec<String>,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<String>,
    pub staff_choice: String,
    pub staff_name: Option<String>,
    pub special_note: Option<String>,
    pub pricing: PriceBreakdown,
    pub payment_reference: Option<String>,
}

impl BookingSummary {
    /// One line with the ticket, service, staff and appointment time.
    pub fn headline(&self) -> String {
        let when = match (&self.date, &self.time_slot) {
            (Some(date), Some(slot)) => format!("{date} at {slot}"),
            _ => "unscheduled".to_string(),
        };
        let who = self.staff_name.as_deref().unwrap_or("to be assigned");
        format!("{} - {} with {who}, {when}", self.ticket_id, self.service)
    }
}

/// Owns a wizard plus the gateway that pays for it.
///
/// The charge runs as a tokio task; [`poll_payment`](Self::poll_payment)
/// picks up the result without blocking, [`pay`](Self::pay) waits for it.
pub struct BookingSession {
    wizard: BookingWizard,
    gateway: Arc<dyn PaymentGateway>,
    timeout: Duration,
    handle: Handle,
    payment_rx: Option<oneshot::Receiver<PaymentOutcome>>,
    on_close: Option<OnClose>,
}

impl BookingSession {
    pub fn new(wizard: BookingWizard, gateway: Arc<dyn PaymentGateway>, timeout: Duration, handle: Handle) -> Self {
        Self {
            wizard,
            gateway,
            timeout,
            handle,
            payment_rx: None,
            on_close: None,
        }
    }

    /// Build the wizard, selector and gateway described by `config`.
    pub fn from_config(config: &AppConfig, directory: Arc<dyn Directory>, handle: Handle) -> Result<Self> {
        config.validate()?;

        let selector: Box<dyn StaffSelector> = match config.booking.selection {
            SelectionStrategy::Random => Box::new(RandomSelector::new()),
            SelectionStrategy::Ranked => Box::new(RankedSelector),
        };
        let timeout = Duration::from_secs(config.payment.timeout_secs);

        let gateway: Arc<dyn PaymentGateway> = match config.payment.gateway {
            GatewayKind::Simulated => Arc::new(SimulatedGateway::approving(Duration::from_millis(
                config.payment.simulated_delay_ms,
            ))),
            GatewayKind::Http => Arc::new(HttpGateway::new(
                &config.payment.endpoint,
                &config.payment.api_key,
                timeout,
            )?),
        };
        info!("Using {} payment gateway", gateway.name());

        let wizard = BookingWizard::new(directory, selector, WizardSettings::from_config(config));
        Ok(Self::new(wizard, gateway, timeout, handle))
    }

    /// Register the dismissal callback.
    pub fn on_close(mut self, callback: impl FnMut(CloseReason) + Send + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    pub fn wizard(&self) -> &BookingWizard {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut BookingWizard {
        &mut self.wizard
    }

    /// Open or reopen the wizard.
    pub fn open(&mut self, options: OpenOptions) -> Result<()> {
        if self.payment_rx.is_some() {
            return Err(BookingError::PaymentInFlight);
        }
        self.wizard.open(options)
    }

    pub fn is_processing(&self) -> bool {
        self.payment_rx.is_some()
    }

    /// Advance the wizard. From Summary (or PaymentFailed) this starts the
    /// charge and returns `Processing`.
    pub fn next(&mut self) -> Result<Step> {
        match self.wizard.step() {
            Some(Step::Summary) | Some(Step::PaymentFailed) => {
                self.submit_payment()?;
                Ok(Step::Processing)
            }
            _ => self.wizard.next(),
        }
    }

    /// Start the charge in the background.
    pub fn submit_payment(&mut self) -> Result<()> {
        if self.payment_rx.is_some() {
            return Err(BookingError::PaymentInFlight);
        }
        let request = self.wizard.begin_payment()?;

        let (tx, rx) = oneshot::channel();
        self.payment_rx = Some(rx);

        let gateway = Arc::clone(&self.gateway);
        let timeout = self.timeout;
        self.handle.spawn(async move {
            let outcome = match tokio::time::timeout(timeout, gateway.charge(&request)).await {
                Ok(result) => result,
                Err(_) => Err(PaymentError::Timeout),
            };
            let _ = tx.send(outcome);
        });

        Ok(())
    }

    /// Check for a finished charge. Returns the new step once it lands.
    pub fn poll_payment(&mut self) -> Result<Option<Step>> {
        let Some(rx) = self.payment_rx.as_mut() else {
            return Ok(None);
        };

        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => {
                error!("Payment task ended without a result");
                Err(PaymentError::Gateway("payment task ended unexpectedly".to_string()))
            }
        };

        self.payment_rx = None;
        self.wizard.complete_payment(outcome).map(Some)
    }

    /// Start the charge if needed and wait for its outcome.
    pub async fn pay(&mut self) -> Result<Step> {
        if self.payment_rx.is_none() {
            self.submit_payment()?;
        }
        let Some(rx) = self.payment_rx.take() else {
            return Err(BookingError::InvalidTransition {
                action: "pay",
                step: self.wizard.step().unwrap_or(Step::Summary),
            });
        };

        let outcome = rx
            .await
            .unwrap_or_else(|_| Err(PaymentError::Gateway("payment task ended unexpectedly".to_string())));
        self.wizard.complete_payment(outcome)
    }

    /// Dismiss the wizard and notify the caller.
    pub fn close(&mut self) -> Result<CloseReason> {
        if self.payment_rx.is_some() {
            return Err(BookingError::PaymentInFlight);
        }
        let reason = if self.wizard.step().is_some_and(Step::is_terminal) {
            CloseReason::Completed
        } else {
            CloseReason::Dismissed
        };

        self.wizard.close()?;
        if let Some(callback) = self.on_close.as_mut() {
            callback(reason);
        }
        Ok(reason)
    }

    /// Current booking as a display snapshot.
    pub fn summary(&self) -> Option<BookingSummary> {
        let wizard = &self.wizard;
        let state = wizard.state()?;
        let service = wizard.service()?;

        Some(BookingSummary {
            ticket_id: state.ticket_id.to_string(),
            mode: wizard.mode().unwrap_or_default(),
            step: wizard.step()?,
            service: service.name.clone(),
            selected_services: state.selected_services.iter().cloned().collect(),
            date: state.date,
            time_slot: state.time_slot.clone(),
            staff_choice: match &state.staff {
                StaffChoice::Auto => "AUTO".to_string(),
                StaffChoice::Specific(id) => id.to_string(),
            },
            staff_name: wizard.resolved_staff().map(|m| m.name.clone()),
            special_note: state.special_note.clone(),
            pricing: wizard.quote()?,
            payment_reference: wizard.receipt().map(|r| r.reference.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::models::{InitialData, ServiceEntry, StaffId, StaffMember, SubService};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    fn directory() -> Arc<dyn Directory> {
        Arc::new(
            InMemoryDirectory::new()
                .with_service(ServiceEntry {
                    id: "spa".to_string(),
                    name: "Lagos Spa".to_string(),
                    sub_services: vec![SubService {
                        name: "Massage".to_string(),
                        price: dec!(10000),
                    }],
                })
                .with_staff(StaffMember {
                    id: StaffId::new("s-1"),
                    name: "Ngozi".to_string(),
                    role: "Therapist".to_string(),
                    is_owner: false,
                    available: true,
                    rating: 4.5,
                }),
        )
    }

    fn session(gateway: Arc<dyn PaymentGateway>, timeout: Duration) -> BookingSession {
        let wizard = BookingWizard::new(
            directory(),
            Box::new(RandomSelector::seeded(4)),
            WizardSettings::default(),
        );
        BookingSession::new(wizard, gateway, timeout, Handle::current())
    }

    fn to_summary(session: &mut BookingSession) {
        session.open(OpenOptions::book("spa")).unwrap();
        let wizard = session.wizard_mut();
        wizard.select_service("Massage").unwrap();
        wizard.next().unwrap();
        wizard.set_date(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()).unwrap();
        wizard.set_time_slot("01:30 PM").unwrap();
        wizard.next().unwrap();
        wizard.next().unwrap();
        assert_eq!(session.next().unwrap(), Step::Summary);
    }

    /// Gateway that never answers.
    struct HangingGateway;

    #[async_trait]
    impl PaymentGateway for HangingGateway {
        async fn charge(&self, _request: &crate::payment::PaymentRequest) -> crate::payment::Result<PaymentReceipt> {
            std::future::pending().await
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pay_with_simulated_gateway() {
        let mut s = session(Arc::new(SimulatedGateway::default()), Duration::from_secs(30));
        to_summary(&mut s);

        let start = tokio::time::Instant::now();
        assert_eq!(s.pay().await.unwrap(), Step::Success);
        assert!(start.elapsed() >= Duration::from_secs(2));

        let summary = s.summary().unwrap();
        assert_eq!(summary.pricing.grand_total, dec!(10200));
        assert_eq!(summary.staff_name.as_deref(), Some("Ngozi"));
        assert!(summary.payment_reference.unwrap().starts_with("SIM-"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_reports_pending_then_success() {
        let mut s = session(Arc::new(SimulatedGateway::default()), Duration::from_secs(30));
        to_summary(&mut s);

        assert_eq!(s.next().unwrap(), Step::Processing);
        assert!(s.is_processing());
        assert_eq!(s.poll_payment().unwrap(), None);
        assert!(matches!(s.close(), Err(BookingError::PaymentInFlight)));
        assert!(matches!(s.submit_payment(), Err(BookingError::PaymentInFlight)));

        tokio::time::sleep(Duration::from_millis(2100)).await;

        assert_eq!(s.poll_payment().unwrap(), Some(Step::Success));
        assert!(!s.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_lands_in_payment_failed() {
        let mut s = session(Arc::new(HangingGateway), Duration::from_secs(5));
        to_summary(&mut s);

        assert_eq!(s.pay().await.unwrap(), Step::PaymentFailed);
        assert_eq!(s.wizard().payment_error(), Some(&PaymentError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decline_then_retry() {
        let gateway = SimulatedGateway::declining_first(Duration::from_millis(100), 1, "card declined");
        let mut s = session(Arc::new(gateway), Duration::from_secs(5));
        to_summary(&mut s);

        assert_eq!(s.pay().await.unwrap(), Step::PaymentFailed);
        assert_eq!(s.next().unwrap(), Step::Processing);
        assert_eq!(s.pay().await.unwrap(), Step::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_reasons_reach_callback() {
        let reasons = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reasons);
        let mut s = session(Arc::new(SimulatedGateway::default()), Duration::from_secs(30))
            .on_close(move |reason| sink.lock().unwrap().push(reason));

        s.open(OpenOptions::book("spa")).unwrap();
        assert_eq!(s.close().unwrap(), CloseReason::Dismissed);

        to_summary(&mut s);
        s.pay().await.unwrap();
        assert_eq!(s.close().unwrap(), CloseReason::Completed);

        assert_eq!(*reasons.lock().unwrap(), vec![CloseReason::Dismissed, CloseReason::Completed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_through_payment() {
        let mut s = session(Arc::new(SimulatedGateway::default()), Duration::from_secs(30));
        s.open(OpenOptions::reschedule(
            "spa",
            InitialData {
                selected_services: vec!["Massage".to_string()],
                staff: Some(StaffChoice::Specific(StaffId::new("s-1"))),
            },
        ))
        .unwrap();
        assert_eq!(s.wizard().step(), Some(Step::DateTime));

        let wizard = s.wizard_mut();
        wizard.set_date(NaiveDate::from_ymd_opt(2027, 1, 8).unwrap()).unwrap();
        wizard.set_time_slot("04:30 PM").unwrap();
        assert_eq!(s.next().unwrap(), Step::Customization);
        assert_eq!(s.next().unwrap(), Step::Staff);
        assert_eq!(s.next().unwrap(), Step::Summary);
        assert_eq!(s.next().unwrap(), Step::Processing);
        assert_eq!(s.pay().await.unwrap(), Step::Success);

        let summary = s.summary().unwrap();
        assert_eq!(summary.mode, BookingMode::Reschedule);
        assert_eq!(summary.selected_services, vec!["Massage".to_string()]);
        assert_eq!(summary.staff_choice, "s-1");
        assert_eq!(summary.pricing.grand_total, dec!(10200));
        assert!(summary.headline().ends_with("with Ngozi, 2027-01-08 at 04:30 PM"));
        assert_eq!(s.close().unwrap(), CloseReason::Completed);
    }

    #[tokio::test]
    async fn test_from_config_uses_simulated_gateway() {
        let mut config = AppConfig::default();
        config.payment.simulated_delay_ms = 0;
        let mut s = BookingSession::from_config(&config, directory(), Handle::current()).unwrap();
        to_summary(&mut s);
        assert_eq!(s.pay().await.unwrap(), Step::Success);
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.booking.time_slots.clear();
        let result = BookingSession::from_config(&config, directory(), Handle::current());
        assert!(matches!(result, Err(BookingError::Config(_))));
    }
}
