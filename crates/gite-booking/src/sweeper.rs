//! Periodic background work: durable hold expiry and calendar refresh.

use std::time::Duration;

use chrono::Utc;
use gite_core::{Error, Result, store::AvailabilityStore};
use tracing::{info, warn};
use uuid::Uuid;

use crate::BookingService;

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Delete every hold whose expiry has passed.
  pub async fn sweep_expired_holds(&self) -> Result<Vec<Uuid>> {
    self
      .store
      .sweep_expired_holds(Utc::now())
      .await
      .map_err(Error::storage)
  }

  /// Background task that sweeps expired holds every `every`. Survives
  /// restarts because expiry lives in the store, not in this task.
  pub async fn run_sweeper(self, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
      interval.tick().await;
      match self.sweep_expired_holds().await {
        Ok(swept) if !swept.is_empty() => info!(count = swept.len(), "swept expired holds"),
        Ok(_) => {}
        Err(e) => warn!("hold sweep failed: {e}"),
      }
    }
  }

  /// Background task that re-imports every subscribed feed every `every`.
  /// The first round runs immediately.
  pub async fn run_feed_sync(self, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
      interval.tick().await;
      match self.sync_all().await {
        Ok(units) => {
          let failed = units.iter().filter(|u| u.error.is_some()).count();
          info!(units = units.len(), failed, "calendar sync round finished");
        }
        Err(e) => warn!("calendar sync round failed: {e}"),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use gite_core::store::AvailabilityStore;

  use crate::test_helpers::{UNIT, range, service};

  #[tokio::test]
  async fn sweep_deletes_only_expired_holds() {
    let svc = service().await;
    let short = svc
      .create_hold(UNIT, range((2025, 8, 1), (2025, 8, 3)), Some(Duration::from_millis(10)))
      .await
      .unwrap();
    svc.create_hold(UNIT, range((2025, 9, 1), (2025, 9, 3)), None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(svc.sweep_expired_holds().await.unwrap(), vec![short.id]);
    assert_eq!(svc.store().list_occupancy(UNIT).await.unwrap().len(), 1);

    // A second sweep, or a late release, finds nothing to do.
    assert!(svc.sweep_expired_holds().await.unwrap().is_empty());
    svc.release_hold(short.id).await.unwrap();
  }

  #[tokio::test]
  async fn background_sweeper_runs() {
    let svc = service().await;
    let r = range((2025, 8, 1), (2025, 8, 3));
    svc.create_hold(UNIT, r, Some(Duration::from_millis(10))).await.unwrap();

    let task = tokio::spawn(svc.clone().run_sweeper(Duration::from_millis(20)));
    tokio::time::sleep(Duration::from_millis(150)).await;
    task.abort();

    assert!(svc.store().list_occupancy(UNIT).await.unwrap().is_empty());
  }
}
