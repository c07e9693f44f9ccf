//! Temporary lock manager: checkout holds.
//!
//! A hold is durable: its `expires_at` is persisted and the store ignores it
//! once passed, and the sweeper deletes it later. The in-process timer only
//! shortens how long an expired row lingers.

use std::time::Duration;

use chrono::Utc;
use gite_core::{
  DateRange, Error, Result,
  occupancy::{NewHold, OccupancyRecord},
  store::{AvailabilityStore, Placement},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::BookingService;

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Lock `range` on `unit_id` for `ttl` (the configured default if `None`).
  ///
  /// The store re-checks overlap in the same transaction as the insert, so
  /// of two racing callers exactly one gets the hold and the other
  /// [`Error::SlotNoLongerAvailable`].
  pub async fn create_hold(
    &self,
    unit_id: Uuid,
    range: DateRange,
    ttl: Option<Duration>,
  ) -> Result<OccupancyRecord> {
    let ttl = ttl.unwrap_or(self.settings.hold_ttl);
    let hold = NewHold::new(unit_id, range, Utc::now(), ttl)?;

    match self.store.place_hold(hold).await.map_err(Error::storage)? {
      Placement::Placed(record) => {
        info!(hold_id = %record.id, %unit_id, %range, "hold placed");
        self.schedule_release(record.id, ttl);
        Ok(record)
      }
      Placement::Conflict(blocking) => {
        debug!(%unit_id, %range, %blocking, "hold rejected");
        Err(Error::SlotNoLongerAvailable)
      }
    }
  }

  /// Remove a hold. Succeeds whether or not it still existed.
  pub async fn release_hold(&self, hold_id: Uuid) -> Result<()> {
    let removed = self.store.release_hold(hold_id).await.map_err(Error::storage)?;
    if removed {
      info!(%hold_id, "hold released");
    } else {
      debug!(%hold_id, "hold already gone");
    }
    Ok(())
  }

  /// Fast-path expiry for a freshly placed hold.
  pub(crate) fn schedule_release(&self, hold_id: Uuid, ttl: Duration) {
    if !self.settings.hold_timer {
      return;
    }
    let store = self.store.clone();
    tokio::spawn(async move {
      tokio::time::sleep(ttl).await;
      match store.release_hold(hold_id).await {
        Ok(true) => info!(%hold_id, "hold expired"),
        Ok(false) => debug!(%hold_id, "expired hold already gone"),
        // The sweeper will get it.
        Err(e) => warn!(%hold_id, "hold timer failed: {e}"),
      }
    });
  }
}
