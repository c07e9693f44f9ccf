//! External calendar exporter.

use chrono::Utc;
use gite_core::{Error, Result, feed::FeedSubscription, store::AvailabilityStore};
use uuid::Uuid;

use crate::BookingService;

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Render the confirmed bookings and live holds of `unit_id` as an
  /// iCalendar document. Imported events are never re-exported.
  ///
  /// Unchanged data renders to identical bytes.
  pub async fn export_feed(&self, unit_id: Uuid) -> Result<String> {
    let records = self
      .store
      .export_records(unit_id, Utc::now())
      .await
      .map_err(Error::storage)?;
    Ok(gite_ical::serialize(&records, &self.settings.export))
  }

  /// Resolve a secret export token and render its unit's feed.
  pub async fn export_by_token(&self, token: &str) -> Result<(FeedSubscription, String)> {
    let subscription = self
      .store
      .subscription_by_token(token)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::SubscriptionNotFound(token.to_owned()))?;
    let body = self.export_feed(subscription.unit_id).await?;
    Ok((subscription, body))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use gite_core::{Error, occupancy::ImportedInterval, store::AvailabilityStore};

  use crate::{
    NewCheckout,
    test_helpers::{UNIT, range, service},
  };

  #[tokio::test]
  async fn export_includes_bookings_and_holds_but_not_imports() {
    let svc = service().await;
    svc
      .store()
      .replace_imported(
        UNIT,
        vec![],
        vec![ImportedInterval { range: range((2025, 6, 1), (2025, 6, 5)), uid: Some("ext".into()) }],
        Utc::now(),
      )
      .await
      .unwrap();
    let c = svc
      .begin_checkout(NewCheckout {
        unit_id:       UNIT,
        guest_id:      "g".into(),
        range:         range((2025, 7, 10), (2025, 7, 15)),
        guest_count:   1,
        with_cleaning: false,
      })
      .await
      .unwrap();
    svc
      .attach_payment_session(c.reservation.reservation_id, "cs".into())
      .await
      .unwrap();
    svc.finalize("cs", "pi").await.unwrap();
    svc.create_hold(UNIT, range((2025, 8, 1), (2025, 8, 3)), None).await.unwrap();

    let ics = svc.export_feed(UNIT).await.unwrap();
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
    assert!(ics.contains("DTSTART;VALUE=DATE:20250710\r\n"));
    assert!(ics.contains("DTSTART;VALUE=DATE:20250801\r\n"));
    assert!(!ics.contains("20250601"));
    assert!(!ics.contains("ext"));
  }

  #[tokio::test]
  async fn export_is_byte_stable() {
    let svc = service().await;
    svc.create_hold(UNIT, range((2025, 8, 1), (2025, 8, 3)), None).await.unwrap();
    svc.create_hold(UNIT, range((2025, 7, 1), (2025, 7, 3)), None).await.unwrap();

    let first = svc.export_feed(UNIT).await.unwrap();
    let second = svc.export_feed(UNIT).await.unwrap();
    assert_eq!(first, second);
  }

  #[tokio::test]
  async fn unknown_token_is_rejected() {
    let svc = service().await;
    let err = svc.export_by_token("nope").await.unwrap_err();
    assert!(matches!(err, Error::SubscriptionNotFound(_)));
  }
}
