//! Calendar feed subscriptions and invoices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links a unit to a third-party calendar: where to import from, and the
/// secret token third parties use to subscribe to our export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSubscription {
  pub subscription_id: Uuid,
  pub unit_id:         Uuid,
  pub import_url:      Option<String>,
  pub export_token:    String,
  pub last_synced_at:  Option<DateTime<Utc>>,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::AvailabilityStore::add_subscription`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedSubscription {
  pub unit_id:    Uuid,
  pub import_url: Option<String>,
}

/// One invoice per paid reservation (enforced by a UNIQUE constraint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
  pub invoice_id:     Uuid,
  pub reservation_id: Uuid,
  /// Sequential per calendar year, e.g. `GC-2025-000042`.
  pub number:         String,
  pub issued_at:      DateTime<Utc>,
}
