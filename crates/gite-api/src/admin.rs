//! Back-office handlers, mounted under an authenticated prefix.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/feeds` | All subscriptions with `last_synced_at` |
//! | `POST` | `/feeds` | Body: `{"unit_id":..,"import_url":..}`; returns the export token |
//! | `POST` | `/feeds/sync` | Body: `{"unit_id":..,"import_url":..}`; omit the URL to sync every subscribed feed |
//! | `POST` | `/feeds/sync-all` | Per-unit results, failures included |
//! | `POST` | `/units/:id/sync` | Import every feed subscribed for the unit |
//! | `GET`  | `/units/:id/occupancy` | Stored records, expired holds included |
//! | `POST` | `/holds/sweep` | Delete expired holds now |
//! | `GET`  | `/reservations` | Optional `?status=pending\|paid\|cancelled&unit_id=..` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gite_booking::{BookingService, ImportReport, UnitSync};
use gite_core::{
  feed::{FeedSubscription, NewFeedSubscription},
  occupancy::OccupancyRecord,
  reservation::{Reservation, ReservationQuery},
  store::AvailabilityStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Feeds ────────────────────────────────────────────────────────────────────

/// `GET /feeds`
pub async fn list_feeds<S>(
  State(service): State<BookingService<S>>,
) -> Result<Json<Vec<FeedSubscription>>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  Ok(Json(service.list_subscriptions().await?))
}

/// `POST /feeds`
pub async fn add_feed<S>(
  State(service): State<BookingService<S>>,
  Json(body): Json<NewFeedSubscription>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AvailabilityStore + 'static,
{
  if let Some(url) = &body.import_url
    && !(url.starts_with("http://") || url.starts_with("https://"))
  {
    return Err(ApiError::BadRequest(format!("unsupported feed url: {url}")));
  }
  let subscription = service.add_subscription(body).await?;
  Ok((StatusCode::CREATED, Json(subscription)))
}

#[derive(Debug, Deserialize)]
pub struct SyncBody {
  pub unit_id:    Uuid,
  pub import_url: Option<String>,
}

/// `POST /feeds/sync`
pub async fn sync_feed<S>(
  State(service): State<BookingService<S>>,
  Json(body): Json<SyncBody>,
) -> Result<Json<ImportReport>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  let report = match body.import_url.as_deref() {
    Some(url) => service.import_feed(body.unit_id, url).await?,
    None => service.sync_unit(body.unit_id).await?,
  };
  Ok(Json(report))
}

/// `POST /feeds/sync-all`
pub async fn sync_all<S>(
  State(service): State<BookingService<S>>,
) -> Result<Json<Vec<UnitSync>>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  Ok(Json(service.sync_all().await?))
}

// ─── Units ────────────────────────────────────────────────────────────────────

/// `POST /units/:id/sync`
pub async fn sync_unit<S>(
  State(service): State<BookingService<S>>,
  Path(unit_id): Path<Uuid>,
) -> Result<Json<ImportReport>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  Ok(Json(service.sync_unit(unit_id).await?))
}

/// `GET /units/:id/occupancy`
pub async fn occupancy<S>(
  State(service): State<BookingService<S>>,
  Path(unit_id): Path<Uuid>,
) -> Result<Json<Vec<OccupancyRecord>>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  Ok(Json(service.occupancy(unit_id).await?))
}

// ─── Holds ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SweepReport {
  pub released: Vec<Uuid>,
}

/// `POST /holds/sweep`
pub async fn sweep<S>(
  State(service): State<BookingService<S>>,
) -> Result<Json<SweepReport>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  let released = service.sweep_expired_holds().await?;
  Ok(Json(SweepReport { released }))
}

// ─── Reservations ─────────────────────────────────────────────────────────────

/// `GET /reservations[?status=..&unit_id=..]`
pub async fn list_reservations<S>(
  State(service): State<BookingService<S>>,
  Query(query): Query<ReservationQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  Ok(Json(service.list_reservations(query).await?))
}
