//! Booking finalization coordinator.
//!
//! Invoked on every delivery of a payment-completion signal. The
//! `PENDING → PAID` transition is one store transaction; the invoice is a
//! separate side effect made idempotent by the store's one-invoice-per-
//! reservation constraint, and is attempted on duplicate deliveries too so a
//! crash between the two steps heals on the provider's retry.

use chrono::Utc;
use gite_core::{
  Error, Result,
  feed::Invoice,
  reservation::Reservation,
  store::{AvailabilityStore, Finalization, InvoiceOutcome},
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::BookingService;

#[derive(Debug, Clone, Serialize)]
pub struct FinalizeOutcome {
  /// `true` if an earlier delivery already performed the transition.
  pub already_finalized: bool,
  pub reservation:       Reservation,
  /// `None` only if issuing the invoice failed; it is retried on the next
  /// delivery.
  pub invoice:           Option<Invoice>,
}

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Mark the reservation behind `session_id` as paid, exactly once.
  ///
  /// Fails with [`Error::ReservationNotFound`] for an unknown session.
  pub async fn finalize(
    &self,
    session_id: &str,
    payment_reference: &str,
  ) -> Result<FinalizeOutcome> {
    let outcome = self
      .store
      .finalize_payment(session_id.to_owned(), payment_reference.to_owned(), Utc::now())
      .await
      .map_err(Error::storage)?;

    let (reservation, already_finalized) = match outcome {
      Finalization::NotFound => {
        return Err(Error::ReservationNotFound(session_id.to_owned()));
      }
      Finalization::AlreadyPaid(reservation) => {
        debug!(
          reservation_id = %reservation.reservation_id,
          session_id,
          "payment already finalized"
        );
        (reservation, true)
      }
      Finalization::Finalized { reservation, booking, overlapping } => {
        if !overlapping.is_empty() {
          warn!(
            reservation_id = %reservation.reservation_id,
            booking_id = %booking.id,
            ?overlapping,
            "paid booking overlaps other commitments; the hold lapsed before payment"
          );
        }
        info!(
          reservation_id = %reservation.reservation_id,
          booking_id = %booking.id,
          payment_reference,
          "payment finalized"
        );
        (reservation, false)
      }
    };

    let invoice = self.ensure_invoice(&reservation).await;
    Ok(FinalizeOutcome { already_finalized, reservation, invoice })
  }

  /// Issue the reservation's invoice, or fetch it if it already exists.
  async fn ensure_invoice(&self, reservation: &Reservation) -> Option<Invoice> {
    let id = reservation.reservation_id;
    let issued = self
      .store
      .issue_invoice(id, self.settings.invoice_prefix.clone(), Utc::now())
      .await;

    let result = match issued {
      Ok(InvoiceOutcome::Issued(invoice)) => {
        info!(reservation_id = %id, number = %invoice.number, "invoice issued");
        return Some(invoice);
      }
      Ok(InvoiceOutcome::AlreadyIssued) => {
        debug!(reservation_id = %id, "invoice already issued");
        self.store.get_invoice(id).await
      }
      Err(e) => Err(e),
    };

    match result {
      Ok(invoice) => invoice,
      Err(e) => {
        warn!(reservation_id = %id, "invoice issuance failed: {e}");
        None
      }
    }
  }
}
