//! Occupancy records: every reason a unit is unavailable on some nights.
//!
//! Confirmed bookings, checkout holds and externally imported calendar events
//! all share one shape so a single overlap query answers "is this free?".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DateRange, Error, Result};

// ─── Source ──────────────────────────────────────────────────────────────────

/// Why an interval is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancySource {
  /// A paid reservation.
  ConfirmedBooking,
  /// A short-lived lock held while a guest completes payment.
  InternalHold,
  /// An event imported from a third-party calendar feed.
  ExternalImport,
}

impl OccupancySource {
  /// The discriminant string stored in the `source` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::ConfirmedBooking => "confirmed_booking",
      Self::InternalHold => "internal_hold",
      Self::ExternalImport => "external_import",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "confirmed_booking" => Ok(Self::ConfirmedBooking),
      "internal_hold" => Ok(Self::InternalHold),
      "external_import" => Ok(Self::ExternalImport),
      other => Err(Error::UnknownDiscriminant {
        kind:  "occupancy source",
        value: other.to_owned(),
      }),
    }
  }

  /// Sources published to third-party calendars. Imported events are never
  /// re-exported.
  pub fn is_exported(self) -> bool { !matches!(self, Self::ExternalImport) }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored interval marking a unit unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyRecord {
  pub id:             Uuid,
  pub unit_id:        Uuid,
  pub range:          DateRange,
  pub source:         OccupancySource,
  /// Opaque external identifier: the remote event UID for imports, the hold
  /// token for holds, the reservation id for confirmed bookings.
  pub source_ref:     Option<String>,
  /// The reservation this record belongs to, if any.
  pub reservation_id: Option<Uuid>,
  pub created_at:     DateTime<Utc>,
  /// Only set for holds.
  pub expires_at:     Option<DateTime<Utc>>,
}

impl OccupancyRecord {
  /// Whether the record still blocks availability at `now`. Holds stop
  /// blocking the instant they expire, whether or not they were swept yet.
  pub fn is_live(&self, now: DateTime<Utc>) -> bool {
    match self.expires_at {
      Some(at) => at > now,
      None => true,
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::AvailabilityStore::place_hold`].
#[derive(Debug, Clone)]
pub struct NewHold {
  pub unit_id:        Uuid,
  pub range:          DateRange,
  /// Generated token stored as the record's `source_ref`.
  pub token:          String,
  pub reservation_id: Option<Uuid>,
  pub created_at:     DateTime<Utc>,
  pub expires_at:     DateTime<Utc>,
}

impl NewHold {
  /// A hold starting at `now` that expires after `ttl`.
  ///
  /// Fails with [`Error::InvalidTtl`] if `ttl` is zero or the expiry falls
  /// outside the representable date range.
  pub fn new(
    unit_id: Uuid,
    range: DateRange,
    now: DateTime<Utc>,
    ttl: std::time::Duration,
  ) -> Result<Self> {
    let expires_at = chrono::Duration::from_std(ttl)
      .ok()
      .filter(|d| *d > chrono::Duration::zero())
      .and_then(|d| now.checked_add_signed(d))
      .ok_or(Error::InvalidTtl(ttl))?;
    Ok(Self {
      unit_id,
      range,
      token: format!("hold-{}", Uuid::new_v4()),
      reservation_id: None,
      created_at: now,
      expires_at,
    })
  }
}

/// One event parsed from a remote calendar feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedInterval {
  pub range: DateRange,
  /// The remote event's `UID`, if it carried one.
  pub uid:   Option<String>,
}
