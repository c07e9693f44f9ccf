//! The `AvailabilityStore` trait and the outcome types of its writes.
//!
//! The trait is implemented by storage backends (e.g. `gite-store-sqlite`).
//! `gite-booking` depends on this abstraction, not on any concrete backend.
//! Every write that must be atomic is a single trait method, so a backend
//! can run it as one transaction.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  DateRange,
  feed::{FeedSubscription, Invoice, NewFeedSubscription},
  occupancy::{ImportedInterval, NewHold, OccupancyRecord},
  reservation::{NewReservation, Reservation, ReservationQuery},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of a write that is only allowed if the interval is still free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement<T> {
  Placed(T),
  /// The write was rejected; carries the id of a record in the way.
  Conflict(Uuid),
}

/// What [`AvailabilityStore::open_reservation`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
  pub reservation: Reservation,
  pub hold:        OccupancyRecord,
}

/// Outcome of [`AvailabilityStore::attach_payment_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAttachment {
  Attached(Reservation),
  /// The reservation has left `PENDING`; its session was left untouched.
  NotPending(Reservation),
  NotFound,
}

/// Outcome of [`AvailabilityStore::finalize_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalization {
  /// This call performed the `PENDING → PAID` transition.
  Finalized {
    reservation: Reservation,
    booking:     OccupancyRecord,
    /// Live records the new booking overlaps. Normally empty; non-empty
    /// when the hold lapsed and the dates were taken before payment landed.
    overlapping: Vec<Uuid>,
  },
  /// An earlier call already did; nothing was written.
  AlreadyPaid(Reservation),
  /// No reservation carries this payment session.
  NotFound,
}

/// Outcome of [`AvailabilityStore::issue_invoice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceOutcome {
  Issued(Invoice),
  /// The one-invoice-per-reservation constraint fired.
  AlreadyIssued,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the Interval Store.
///
/// Reads take an explicit `now` so that expired holds can be ignored before
/// they are physically swept.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AvailabilityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Occupancy ─────────────────────────────────────────────────────────

  /// Ids of live records on `unit_id` overlapping `range`, skipping those
  /// that belong to `exclude_reservation`.
  fn find_conflicts(
    &self,
    unit_id: Uuid,
    range: DateRange,
    exclude_reservation: Option<Uuid>,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Insert an `INTERNAL_HOLD`, re-checking overlap inside the same
  /// transaction as the insert.
  fn place_hold(
    &self,
    hold: NewHold,
  ) -> impl Future<Output = Result<Placement<OccupancyRecord>, Self::Error>>
  + Send
  + '_;

  /// Delete a hold. Returns `false` if it was already gone.
  fn release_hold(
    &self,
    hold_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete every hold with `expires_at <= now`; returns their ids.
  fn sweep_expired_holds(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Every record of a unit, expired holds included, ordered by start date.
  fn list_occupancy(
    &self,
    unit_id: Uuid,
  ) -> impl Future<Output = Result<Vec<OccupancyRecord>, Self::Error>> + Send + '_;

  /// Confirmed bookings and live holds of a unit; never imported events.
  fn export_records(
    &self,
    unit_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<OccupancyRecord>, Self::Error>> + Send + '_;

  // ── Reservations ──────────────────────────────────────────────────────

  /// Atomically re-check overlap, insert `hold` and insert a `PENDING`
  /// reservation linked to it.
  fn open_reservation(
    &self,
    reservation: NewReservation,
    hold: NewHold,
  ) -> impl Future<Output = Result<Placement<Checkout>, Self::Error>> + Send + '_;

  /// Record the payment provider's session id on a `PENDING` reservation.
  fn attach_payment_session(
    &self,
    reservation_id: Uuid,
    session_id: String,
  ) -> impl Future<Output = Result<SessionAttachment, Self::Error>> + Send + '_;

  fn get_reservation(
    &self,
    reservation_id: Uuid,
  ) -> impl Future<Output = Result<Option<Reservation>, Self::Error>> + Send + '_;

  fn list_reservations(
    &self,
    query: ReservationQuery,
  ) -> impl Future<Output = Result<Vec<Reservation>, Self::Error>> + Send + '_;

  /// In one transaction: mark the reservation behind `session_id` as paid,
  /// record `payment_reference`, delete its hold if still present and insert
  /// a `CONFIRMED_BOOKING` record. Exactly one concurrent caller observes
  /// [`Finalization::Finalized`].
  fn finalize_payment(
    &self,
    session_id: String,
    payment_reference: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Finalization, Self::Error>> + Send + '_;

  // ── Invoices ──────────────────────────────────────────────────────────

  /// Allocate the next `<prefix>-<year>-<seq>` number and insert the
  /// invoice, relying on the UNIQUE constraint on `reservation_id`.
  fn issue_invoice(
    &self,
    reservation_id: Uuid,
    prefix: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<InvoiceOutcome, Self::Error>> + Send + '_;

  fn get_invoice(
    &self,
    reservation_id: Uuid,
  ) -> impl Future<Output = Result<Option<Invoice>, Self::Error>> + Send + '_;

  // ── External calendars ────────────────────────────────────────────────

  /// Replace every `EXTERNAL_IMPORT` record of `unit_id` with `intervals` and
  /// stamp `last_synced_at` on the unit's subscriptions for `feed_urls`, all
  /// in one transaction.
  fn replace_imported(
    &self,
    unit_id: Uuid,
    feed_urls: Vec<String>,
    intervals: Vec<ImportedInterval>,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn add_subscription(
    &self,
    input: NewFeedSubscription,
    export_token: String,
  ) -> impl Future<Output = Result<FeedSubscription, Self::Error>> + Send + '_;

  fn list_subscriptions(
    &self,
  ) -> impl Future<Output = Result<Vec<FeedSubscription>, Self::Error>> + Send + '_;

  fn subscription_by_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<FeedSubscription>, Self::Error>> + Send + 'a;
}
