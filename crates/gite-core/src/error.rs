//! Error types for `gite-core`.
//!
//! These are the errors callers of the availability subsystem are expected to
//! tell apart. Storage backends keep their own error type; the service layer
//! folds it into [`Error::Storage`].

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::reservation::ReservationStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid interval: [{start}, {end}) must span at least one night")]
  InvalidInterval { start: NaiveDate, end: NaiveDate },

  #[error("invalid hold lifetime: {0:?}")]
  InvalidTtl(std::time::Duration),

  #[error("invalid guest count: {0}")]
  InvalidGuestCount(u32),

  #[error("the requested dates are no longer available")]
  SlotNoLongerAvailable,

  #[error("no reservation for payment session {0:?}")]
  ReservationNotFound(String),

  #[error("reservation {reservation_id} is {}, not pending", .status.discriminant())]
  ReservationNotPending {
    reservation_id: Uuid,
    status:         ReservationStatus,
  },

  #[error("unknown unit: {0}")]
  UnknownUnit(Uuid),

  #[error("hold not found: {0}")]
  HoldNotFound(Uuid),

  #[error("feed subscription not found: {0}")]
  SubscriptionNotFound(String),

  #[error("feed unreachable: {url}: {reason}")]
  FeedUnreachable { url: String, reason: String },

  #[error("feed could not be parsed: {0}")]
  FeedParseError(String),

  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownDiscriminant { kind: &'static str, value: String },

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error as an infrastructure failure.
  pub fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
