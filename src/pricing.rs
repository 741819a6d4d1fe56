//! Derived booking prices.
//!
//! Nothing here is stored on the booking: the breakdown is recomputed from
//! the selected sub-services and the resolved staff member every time it is
//! shown.

use crate::models::{ServiceEntry, StaffMember};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Multiplier and fee applied on top of catalog prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRules {
    /// Applied when the business owner serves the booking.
    #[serde(default = "default_director_multiplier")]
    pub director_multiplier: Decimal,
    /// Fraction of the total charged for holding funds in escrow.
    #[serde(default = "default_escrow_fee_rate")]
    pub escrow_fee_rate: Decimal,
    /// ISO 4217 code used in receipts and gateway requests.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_director_multiplier() -> Decimal {
    dec!(1.5)
}

fn default_escrow_fee_rate() -> Decimal {
    dec!(0.02)
}

fn default_currency() -> String {
    "NGN".to_string()
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            director_multiplier: default_director_multiplier(),
            escrow_fee_rate: default_escrow_fee_rate(),
            currency: default_currency(),
        }
    }
}

/// One selected sub-service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceLine {
    pub name: String,
    pub base: Decimal,
    /// Base price after the staff-tier multiplier.
    pub charged: Decimal,
}

/// Full price breakdown for the Summary step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub lines: Vec<PriceLine>,
    pub director_rate: bool,
    pub multiplier: Decimal,
    pub total: Decimal,
    pub escrow_fee: Decimal,
    pub grand_total: Decimal,
    pub currency: String,
}

impl PriceBreakdown {
    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        let base = format!(
            "Total: {}, Escrow fee: {}, Grand total: {}",
            format_amount(self.total, &self.currency),
            format_amount(self.escrow_fee, &self.currency),
            format_amount(self.grand_total, &self.currency)
        );
        if self.director_rate {
            format!("{base} (director rate x{})", self.multiplier.normalize())
        } else {
            base
        }
    }
}

/// Price the selected sub-services of `service`.
///
/// Names that the catalog entry does not offer are ignored.
pub fn quote(
    service: &ServiceEntry,
    selected: &BTreeSet<String>,
    resolved_staff: Option<&StaffMember>,
    rules: &PricingRules,
) -> PriceBreakdown {
    let director_rate = resolved_staff.is_some_and(|m| m.is_owner);
    let multiplier = if director_rate { rules.director_multiplier } else { Decimal::ONE };

    let lines: Vec<PriceLine> = selected
        .iter()
        .filter_map(|name| {
            service.price_of(name).map(|base| PriceLine {
                name: name.clone(),
                base,
                charged: base * multiplier,
            })
        })
        .collect();

    let total: Decimal = lines.iter().map(|l| l.charged).sum();
    let escrow_fee = (total * rules.escrow_fee_rate).round_dp(2);

    PriceBreakdown {
        lines,
        director_rate,
        multiplier,
        total,
        escrow_fee,
        grand_total: total + escrow_fee,
        currency: rules.currency.clone(),
    }
}

/// Render an amount as `NGN 10,200.00`.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{currency} {sign}{grouped}.{frac}")
}
