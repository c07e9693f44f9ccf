//! Checkout initiation: a pending reservation and its hold, written together.

use chrono::Utc;
use gite_core::{
  DateRange, Error, Result,
  occupancy::NewHold,
  pricing::Quote,
  reservation::{NewReservation, Reservation, ReservationQuery},
  store::{AvailabilityStore, Checkout, Placement, SessionAttachment},
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::BookingService;

/// A guest's request to start paying for a stay.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCheckout {
  pub unit_id:       Uuid,
  pub guest_id:      String,
  pub range:         DateRange,
  pub guest_count:   u32,
  #[serde(default)]
  pub with_cleaning: bool,
}

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Price a stay on `unit_id`.
  pub fn quote(&self, unit_id: Uuid, range: DateRange, with_cleaning: bool) -> Result<Quote> {
    let rate = self.rate(unit_id)?;
    Ok(Quote::compute(
      rate,
      range.nights(),
      with_cleaning,
      self.settings.tourist_tax_percent,
    ))
  }

  /// Create a `PENDING` reservation and the hold that protects its dates.
  ///
  /// Fails with [`Error::SlotNoLongerAvailable`] if the dates were taken,
  /// in which case nothing is written.
  pub async fn begin_checkout(&self, req: NewCheckout) -> Result<Checkout> {
    if req.guest_count == 0 {
      return Err(Error::InvalidGuestCount(req.guest_count));
    }
    let quote = self.quote(req.unit_id, req.range, req.with_cleaning)?;
    let hold = NewHold::new(req.unit_id, req.range, Utc::now(), self.settings.hold_ttl)?;
    let reservation = NewReservation {
      unit_id: req.unit_id,
      guest_id: req.guest_id,
      range: req.range,
      guest_count: req.guest_count,
      quote,
    };

    match self
      .store
      .open_reservation(reservation, hold)
      .await
      .map_err(Error::storage)?
    {
      Placement::Placed(checkout) => {
        info!(
          reservation_id = %checkout.reservation.reservation_id,
          hold_id = %checkout.hold.id,
          unit_id = %req.unit_id,
          range = %req.range,
          total_cents = quote.total_cents,
          "checkout started"
        );
        self.schedule_release(checkout.hold.id, self.settings.hold_ttl);
        Ok(checkout)
      }
      Placement::Conflict(blocking) => {
        debug!(unit_id = %req.unit_id, range = %req.range, %blocking, "checkout rejected");
        Err(Error::SlotNoLongerAvailable)
      }
    }
  }

  /// Record the payment provider's checkout session on a reservation.
  ///
  /// Only a `PENDING` reservation accepts one; any other status fails with
  /// [`Error::ReservationNotPending`] and leaves the reservation unchanged.
  pub async fn attach_payment_session(
    &self,
    reservation_id: Uuid,
    session_id: String,
  ) -> Result<Reservation> {
    let attached = self
      .store
      .attach_payment_session(reservation_id, session_id)
      .await
      .map_err(Error::storage)?;
    match attached {
      SessionAttachment::Attached(reservation) => Ok(reservation),
      SessionAttachment::NotPending(reservation) => {
        debug!(%reservation_id, status = reservation.status.discriminant(), "session not attached");
        Err(Error::ReservationNotPending { reservation_id, status: reservation.status })
      }
      SessionAttachment::NotFound => Err(Error::ReservationNotFound(reservation_id.to_string())),
    }
  }

  pub async fn get_reservation(&self, reservation_id: Uuid) -> Result<Option<Reservation>> {
    self
      .store
      .get_reservation(reservation_id)
      .await
      .map_err(Error::storage)
  }

  pub async fn list_reservations(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
    self
      .store
      .list_reservations(query)
      .await
      .map_err(Error::storage)
  }
}
