//! Stay pricing. All amounts are integer cents.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The rate card of a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRate {
  pub id:                 Uuid,
  pub nightly_rate_cents: i64,
  #[serde(default)]
  pub cleaning_fee_cents: i64,
}

/// The computed price of a stay, frozen onto the reservation at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quote {
  pub nights:            u32,
  pub base_cents:        i64,
  pub cleaning_cents:    i64,
  /// `base + cleaning`.
  pub subtotal_cents:    i64,
  pub tourist_tax_cents: i64,
  pub total_cents:       i64,
}

impl Quote {
  /// Price `nights` at `rate`. Tourist tax applies to the subtotal, cleaning
  /// included, and is rounded to the nearest cent.
  pub fn compute(
    rate: &UnitRate,
    nights: u32,
    with_cleaning: bool,
    tourist_tax_percent: f64,
  ) -> Self {
    let base_cents = rate.nightly_rate_cents * i64::from(nights);
    let cleaning_cents = if with_cleaning { rate.cleaning_fee_cents } else { 0 };
    let subtotal_cents = base_cents + cleaning_cents;
    let tourist_tax_cents =
      (subtotal_cents as f64 * tourist_tax_percent / 100.0).round() as i64;
    Self {
      nights,
      base_cents,
      cleaning_cents,
      subtotal_cents,
      tourist_tax_cents,
      total_cents: subtotal_cents + tourist_tax_cents,
    }
  }
}
