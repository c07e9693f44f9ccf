//! Calendar feed subscriptions and occupancy reads for the back-office.

use gite_core::{
  Error, Result,
  feed::{FeedSubscription, NewFeedSubscription},
  occupancy::OccupancyRecord,
  store::AvailabilityStore,
};
use rand_core::{OsRng, RngCore};
use tracing::info;
use uuid::Uuid;

use crate::BookingService;

/// 32 random bytes, hex-encoded.
fn generate_export_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Register a unit's calendar link with a fresh secret export token.
  pub async fn add_subscription(&self, input: NewFeedSubscription) -> Result<FeedSubscription> {
    let subscription = self
      .store
      .add_subscription(input, generate_export_token())
      .await
      .map_err(Error::storage)?;
    info!(
      subscription_id = %subscription.subscription_id,
      unit_id = %subscription.unit_id,
      import_url = subscription.import_url.as_deref().unwrap_or("-"),
      "feed subscription added"
    );
    Ok(subscription)
  }

  /// Every subscription with its last successful import time.
  pub async fn list_subscriptions(&self) -> Result<Vec<FeedSubscription>> {
    self.store.list_subscriptions().await.map_err(Error::storage)
  }

  /// Every stored record of `unit_id`, expired holds included.
  pub async fn occupancy(&self, unit_id: Uuid) -> Result<Vec<OccupancyRecord>> {
    self.store.list_occupancy(unit_id).await.map_err(Error::storage)
  }
}
