//! Booking wizard state machine.

use super::Step;
use crate::config::AppConfig;
use crate::directory::Directory;
use crate::error::{BookingError, Result};
use crate::matching::{StaffSelector, eligible_staff};
use crate::models::{
    BookingMode, BookingState, OpenOptions, ServiceEntry, StaffChoice, StaffId, StaffMember, TicketId,
};
use crate::payment::{PaymentError, PaymentReceipt, PaymentRequest};
use crate::pricing::{PriceBreakdown, PricingRules, quote};
use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Settings the wizard reads from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct WizardSettings {
    pub time_slots: Vec<String>,
    pub include_unavailable_staff: bool,
    pub pricing: PricingRules,
}

impl WizardSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            time_slots: config.booking.time_slots.clone(),
            include_unavailable_staff: config.booking.include_unavailable_staff,
            pricing: config.pricing.clone(),
        }
    }
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Everything that lives only while the wizard is open.
#[derive(Debug)]
struct ActiveBooking {
    mode: BookingMode,
    service: ServiceEntry,
    roster: Vec<StaffMember>,
    state: BookingState,
    step: Step,
    /// User-visible message for the current step.
    last_error: Option<String>,
    payment_error: Option<PaymentError>,
    receipt: Option<PaymentReceipt>,
}

impl ActiveBooking {
    fn initial_step(&self) -> Step {
        match self.mode {
            BookingMode::Book => Step::Services,
            BookingMode::Reschedule => Step::DateTime,
        }
    }

    fn member(&self, id: &StaffId) -> Option<&StaffMember> {
        self.roster.iter().find(|m| &m.id == id)
    }
}

/// Drives a customer through service selection, scheduling, staff choice
/// and payment.
///
/// The wizard is closed until [`open`](Self::open) is called and discards
/// its booking on [`close`](Self::close).
pub struct BookingWizard {
    directory: Arc<dyn Directory>,
    selector: Box<dyn StaffSelector>,
    settings: WizardSettings,
    ticket_rng: StdRng,
    active: Option<ActiveBooking>,
}

impl BookingWizard {
    pub fn new(directory: Arc<dyn Directory>, selector: Box<dyn StaffSelector>, settings: WizardSettings) -> Self {
        Self {
            directory,
            selector,
            settings,
            ticket_rng: StdRng::from_os_rng(),
            active: None,
        }
    }

    /// Use a fixed seed for ticket numbers.
    pub fn with_ticket_seed(mut self, seed: u64) -> Self {
        self.ticket_rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Open (or reopen) the wizard. Any previous booking is discarded.
    pub fn open(&mut self, options: OpenOptions) -> Result<()> {
        if self.active.as_ref().is_some_and(|a| a.step == Step::Processing) {
            return Err(BookingError::PaymentInFlight);
        }

        let service = self
            .directory
            .service(&options.service_id)
            .ok_or_else(|| BookingError::UnknownService(options.service_id.clone()))?;
        let roster = self.directory.roster(&service.id);

        let ticket_id = TicketId::generate(&mut self.ticket_rng);
        let mut state = BookingState::initial(&options, ticket_id);

        if let StaffChoice::Specific(id) = &state.staff
            && !roster.iter().any(|m| &m.id == id)
        {
            return Err(off_roster(self.directory.as_ref(), id, &service));
        }

        let before = state.selected_services.len();
        state.selected_services.retain(|name| service.sub_service(name).is_some());
        if state.selected_services.len() < before {
            warn!(
                "Dropped {} seeded services not offered by {}",
                before - state.selected_services.len(),
                service.id
            );
        }
        if options.mode == BookingMode::Reschedule && state.selected_services.is_empty() {
            return Err(BookingError::validation(format!(
                "None of the booked services are still offered by {}",
                service.name
            )));
        }

        let mut active = ActiveBooking {
            mode: options.mode,
            service,
            roster,
            state,
            step: Step::Services,
            last_error: None,
            payment_error: None,
            receipt: None,
        };
        active.step = active.initial_step();

        info!(
            "Booking wizard opened for {} ({:?}), ticket {}",
            active.service.id, active.mode, active.state.ticket_id
        );
        self.active = Some(active);
        Ok(())
    }

    /// Dismiss the wizard. Rejected while a charge is in flight.
    pub fn close(&mut self) -> Result<()> {
        match &self.active {
            None => Err(BookingError::Closed),
            Some(active) if active.step == Step::Processing => Err(BookingError::PaymentInFlight),
            Some(active) => {
                info!("Booking wizard closed at step {}", active.step);
                self.active = None;
                Ok(())
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn step(&self) -> Option<Step> {
        self.active.as_ref().map(|a| a.step)
    }

    pub fn mode(&self) -> Option<BookingMode> {
        self.active.as_ref().map(|a| a.mode)
    }

    pub fn state(&self) -> Option<&BookingState> {
        self.active.as_ref().map(|a| &a.state)
    }

    pub fn service(&self) -> Option<&ServiceEntry> {
        self.active.as_ref().map(|a| &a.service)
    }

    pub fn roster(&self) -> &[StaffMember] {
        self.active.as_ref().map(|a| a.roster.as_slice()).unwrap_or_default()
    }

    pub fn ticket_id(&self) -> Option<&TicketId> {
        self.state().map(|s| &s.ticket_id)
    }

    /// Message to show on the current step, if the last action failed.
    pub fn last_error(&self) -> Option<&str> {
        self.active.as_ref().and_then(|a| a.last_error.as_deref())
    }

    pub fn payment_error(&self) -> Option<&PaymentError> {
        self.active.as_ref().and_then(|a| a.payment_error.as_ref())
    }

    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        self.active.as_ref().and_then(|a| a.receipt.as_ref())
    }

    /// Slot labels offered on the DateTime step.
    pub fn time_slots(&self) -> &[String] {
        &self.settings.time_slots
    }

    /// Staff member whose rate applies right now.
    pub fn resolved_staff(&self) -> Option<&StaffMember> {
        let active = self.active.as_ref()?;
        active.state.resolved_staff().and_then(|id| active.member(id))
    }

    /// Current price breakdown.
    pub fn quote(&self) -> Option<PriceBreakdown> {
        let active = self.active.as_ref()?;
        Some(quote(
            &active.service,
            &active.state.selected_services,
            self.resolved_staff(),
            &self.settings.pricing,
        ))
    }

    /// The open booking, if `action` belongs to the current step.
    fn editable_at(&mut self, owner: Step, action: &'static str) -> Result<&mut ActiveBooking> {
        let active = self.active.as_mut().ok_or(BookingError::Closed)?;
        match active.step {
            Step::Processing => Err(BookingError::PaymentInFlight),
            step if step != owner => Err(BookingError::InvalidTransition { action, step }),
            _ => Ok(active),
        }
    }

    /// Add or remove a sub-service. Returns whether it is now selected.
    ///
    /// Only on the Services step; later steps were validated against the
    /// selection that was current when they were reached.
    pub fn toggle_service(&mut self, name: &str) -> Result<bool> {
        let active = self.editable_at(Step::Services, "change services")?;
        if active.service.sub_service(name).is_none() {
            return Err(BookingError::validation(format!(
                "'{name}' is not offered by {}",
                active.service.name
            )));
        }
        let selected = if active.state.selected_services.remove(name) {
            false
        } else {
            active.state.selected_services.insert(name.to_string());
            true
        };
        debug!("Service '{name}' selected: {selected}");
        Ok(selected)
    }

    /// Select a sub-service (no-op if already selected).
    pub fn select_service(&mut self, name: &str) -> Result<()> {
        if !self.state().is_some_and(|s| s.selected_services.contains(name)) {
            self.toggle_service(name)?;
        }
        Ok(())
    }

    pub fn set_date(&mut self, date: NaiveDate) -> Result<()> {
        self.editable_at(Step::DateTime, "change date")?.state.date = Some(date);
        Ok(())
    }

    /// Pick a slot from the configured set.
    pub fn set_time_slot(&mut self, slot: &str) -> Result<()> {
        if !self.settings.time_slots.iter().any(|s| s == slot) {
            return Err(BookingError::validation(format!("'{slot}' is not an offered time slot")));
        }
        self.editable_at(Step::DateTime, "change time slot")?.state.time_slot = Some(slot.to_string());
        Ok(())
    }

    pub fn set_custom_image(&mut self, image: Option<String>) -> Result<()> {
        self.editable_at(Step::Customization, "change reference image")?.state.custom_image = image;
        Ok(())
    }

    pub fn set_special_note(&mut self, note: Option<String>) -> Result<()> {
        self.editable_at(Step::Customization, "change special note")?.state.special_note = note;
        Ok(())
    }

    /// Choose AUTO or a specific roster member. Only on the Staff step;
    /// leaving it resolves the choice.
    pub fn choose_staff(&mut self, choice: StaffChoice) -> Result<()> {
        let directory = Arc::clone(&self.directory);
        let active = self.editable_at(Step::Staff, "choose staff")?;
        if let StaffChoice::Specific(id) = &choice
            && active.member(id).is_none()
        {
            return Err(off_roster(directory.as_ref(), id, &active.service));
        }
        active.state.assigned_staff = None;
        active.state.staff = choice;
        Ok(())
    }

    /// Advance one step if the current step's input is complete.
    ///
    /// Recoverable failures keep the step and are recorded in
    /// [`last_error`](Self::last_error). Payment is started with
    /// [`begin_payment`](Self::begin_payment), not here.
    pub fn next(&mut self) -> Result<Step> {
        let result = self.try_advance();
        if let Some(active) = self.active.as_mut() {
            match &result {
                Ok(_) => active.last_error = None,
                Err(e) if e.is_recoverable() => {
                    debug!("Step {} rejected: {e}", active.step);
                    active.last_error = Some(e.to_string());
                }
                Err(_) => {}
            }
        }
        result
    }

    fn try_advance(&mut self) -> Result<Step> {
        let Self {
            directory,
            selector,
            settings,
            active,
            ..
        } = self;
        let active = active.as_mut().ok_or(BookingError::Closed)?;
        let step = active.step;

        match step {
            Step::Services => {
                if active.state.selected_services.is_empty() {
                    return Err(BookingError::validation("Select at least one service"));
                }
            }
            Step::DateTime => {
                let (Some(date), Some(slot)) = (active.state.date, active.state.time_slot.as_deref()) else {
                    return Err(BookingError::validation("Pick a date and a time slot"));
                };
                let staff = match &active.state.staff {
                    StaffChoice::Specific(id) => Some(id),
                    StaffChoice::Auto => None,
                };
                if !directory.is_slot_open(date, slot, staff) {
                    return Err(BookingError::SlotUnavailable {
                        date,
                        slot: slot.to_string(),
                    });
                }
            }
            Step::Customization => {}
            Step::Staff => {
                let (Some(date), Some(slot)) = (active.state.date, active.state.time_slot.clone()) else {
                    return Err(BookingError::validation("Pick a date and a time slot"));
                };
                match &active.state.staff {
                    StaffChoice::Auto => {
                        let mut eligible = eligible_staff(&active.roster, settings.include_unavailable_staff);
                        eligible.retain(|m| directory.is_slot_open(date, &slot, Some(&m.id)));
                        let assigned = selector.select(&eligible).ok_or(BookingError::NoEligibleStaff)?;
                        info!("AUTO match assigned {assigned} to ticket {}", active.state.ticket_id);
                        active.state.assigned_staff = Some(assigned);
                    }
                    StaffChoice::Specific(id) => {
                        if !directory.is_slot_open(date, &slot, Some(id)) {
                            return Err(BookingError::SlotUnavailable { date, slot });
                        }
                        active.state.assigned_staff = None;
                    }
                }
            }
            Step::Summary | Step::Processing | Step::PaymentFailed | Step::Success => {
                return Err(BookingError::InvalidTransition { action: "next", step });
            }
        }

        let next = step
            .following()
            .ok_or(BookingError::InvalidTransition { action: "next", step })?;
        debug!("Step {step} -> {next}");
        active.step = next;
        Ok(next)
    }

    /// Go back one step, keeping everything entered so far.
    pub fn back(&mut self) -> Result<Step> {
        let active = self.active.as_mut().ok_or(BookingError::Closed)?;
        let step = active.step;

        if step == active.initial_step() {
            return Err(BookingError::InvalidTransition { action: "go back", step });
        }
        let previous = step
            .preceding()
            .ok_or(BookingError::InvalidTransition { action: "go back", step })?;

        debug!("Step {step} -> {previous}");
        active.step = previous;
        active.last_error = None;
        Ok(previous)
    }

    /// Confirm the Summary (or retry from PaymentFailed) and move to
    /// Processing. The caller must run the returned charge and report it
    /// through [`complete_payment`](Self::complete_payment).
    pub fn begin_payment(&mut self) -> Result<PaymentRequest> {
        let breakdown = self.quote().ok_or(BookingError::Closed)?;
        let active = self.active.as_mut().ok_or(BookingError::Closed)?;

        match active.step {
            Step::Summary | Step::PaymentFailed => {}
            Step::Processing => return Err(BookingError::PaymentInFlight),
            step => {
                return Err(BookingError::InvalidTransition {
                    action: "start payment",
                    step,
                });
            }
        }

        if active.state.selected_services.is_empty() {
            return Err(BookingError::validation("Select at least one service"));
        }
        let Some(payee) = active.state.resolved_staff().cloned() else {
            return Err(BookingError::validation("Staff has not been assigned yet"));
        };

        let request = PaymentRequest {
            ticket_id: active.state.ticket_id.clone(),
            service_id: active.service.id.clone(),
            amount: breakdown.grand_total,
            escrow_fee: breakdown.escrow_fee,
            currency: breakdown.currency,
            payee: Some(payee),
        };

        info!(
            "Payment started for ticket {}: {} {}",
            request.ticket_id, request.amount, request.currency
        );
        active.step = Step::Processing;
        active.last_error = None;
        active.payment_error = None;
        Ok(request)
    }

    /// Retry a failed charge.
    pub fn retry_payment(&mut self) -> Result<PaymentRequest> {
        match self.step() {
            Some(Step::PaymentFailed) => self.begin_payment(),
            Some(step) => Err(BookingError::InvalidTransition {
                action: "retry payment",
                step,
            }),
            None => Err(BookingError::Closed),
        }
    }

    /// Apply the gateway outcome: Success on approval, PaymentFailed otherwise.
    pub fn complete_payment(&mut self, outcome: std::result::Result<PaymentReceipt, PaymentError>) -> Result<Step> {
        let active = self.active.as_mut().ok_or(BookingError::Closed)?;
        if active.step != Step::Processing {
            return Err(BookingError::InvalidTransition {
                action: "complete payment",
                step: active.step,
            });
        }

        match outcome {
            Ok(receipt) => {
                info!(
                    "Booking {} confirmed, payment reference {}",
                    active.state.ticket_id, receipt.reference
                );
                active.receipt = Some(receipt);
                active.step = Step::Success;
            }
            Err(e) => {
                warn!("Payment for {} failed: {e}", active.state.ticket_id);
                active.last_error = Some(e.to_string());
                active.payment_error = Some(e);
                active.step = Step::PaymentFailed;
            }
        }
        Ok(active.step)
    }
}

/// Error for a staff id that is not on this service's roster.
fn off_roster(directory: &dyn Directory, id: &StaffId, service: &ServiceEntry) -> BookingError {
    match directory.staff(id) {
        Some(member) => BookingError::validation(format!("{} does not offer {}", member.name, service.name)),
        None => BookingError::UnknownStaff(id.to_string()),
    }
}
