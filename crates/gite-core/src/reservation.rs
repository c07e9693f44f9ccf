//! Reservations: a guest's booking request and its payment lifecycle.
//!
//! A reservation is distinct from the occupancy it causes: while `Pending` it
//! is backed by an expiring hold, once `Paid` by a confirmed booking record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DateRange, Error, Result, pricing::Quote};

/// Payment lifecycle of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
  Pending,
  Paid,
  Cancelled,
}

impl ReservationStatus {
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Paid => "paid",
      Self::Cancelled => "cancelled",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "paid" => Ok(Self::Paid),
      "cancelled" => Ok(Self::Cancelled),
      other => Err(Error::UnknownDiscriminant {
        kind:  "reservation status",
        value: other.to_owned(),
      }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
  pub reservation_id:     Uuid,
  pub unit_id:            Uuid,
  pub guest_id:           String,
  pub range:              DateRange,
  pub guest_count:        u32,
  pub quote:              Quote,
  pub status:             ReservationStatus,
  /// Token of the hold taken at checkout; the hold itself may be long gone.
  pub hold_token:         Option<String>,
  /// Set once checkout with the payment provider has begun.
  pub payment_session_id: Option<String>,
  /// Set once payment has settled.
  pub payment_reference:  Option<String>,
  pub created_at:         DateTime<Utc>,
  pub paid_at:            Option<DateTime<Utc>>,
}

/// Input to [`crate::store::AvailabilityStore::open_reservation`].
/// `reservation_id`, `status` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewReservation {
  pub unit_id:     Uuid,
  pub guest_id:    String,
  pub range:       DateRange,
  pub guest_count: u32,
  pub quote:       Quote,
}

/// Filters for [`crate::store::AvailabilityStore::list_reservations`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationQuery {
  pub status:  Option<ReservationStatus>,
  pub unit_id: Option<Uuid>,
}
