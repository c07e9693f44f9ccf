//! Overlap checker.

use chrono::Utc;
use gite_core::{DateRange, Error, Result, store::AvailabilityStore};
use uuid::Uuid;

use crate::BookingService;

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Whether `range` is free on `unit_id`.
  ///
  /// Confirmed bookings, live holds and imported events all block equally.
  /// Records of `exclude_reservation` are skipped so a reservation being
  /// re-checked does not conflict with itself. `DateRange` already rules out
  /// zero-night and inverted intervals.
  pub async fn is_free(
    &self,
    unit_id: Uuid,
    range: DateRange,
    exclude_reservation: Option<Uuid>,
  ) -> Result<bool> {
    Ok(self.conflicts(unit_id, range, exclude_reservation).await?.is_empty())
  }

  /// Ids of the records that make `range` unavailable.
  pub async fn conflicts(
    &self,
    unit_id: Uuid,
    range: DateRange,
    exclude_reservation: Option<Uuid>,
  ) -> Result<Vec<Uuid>> {
    self
      .store
      .find_conflicts(unit_id, range, exclude_reservation, Utc::now())
      .await
      .map_err(Error::storage)
  }
}
