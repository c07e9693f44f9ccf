//! Handlers for `/availability`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/availability` | `?unit_id=<uuid>&start=<date>&end=<date>`; `end` is the departure day |

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use gite_booking::BookingService;
use gite_core::{DateRange, pricing::Quote, store::AvailabilityStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
  pub unit_id:       Uuid,
  pub start:         NaiveDate,
  pub end:           NaiveDate,
  #[serde(default)]
  pub with_cleaning: bool,
}

#[derive(Debug, Serialize)]
pub struct Availability {
  pub unit_id: Uuid,
  pub range:   DateRange,
  pub free:    bool,
  /// Present only when the dates are free.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quote:   Option<Quote>,
}

/// `GET /availability?unit_id=..&start=..&end=..`
pub async fn check<S>(
  State(service): State<BookingService<S>>,
  Query(params): Query<AvailabilityParams>,
) -> Result<Json<Availability>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  let range = DateRange::new(params.start, params.end)?;
  let free = service.is_free(params.unit_id, range, None).await?;
  let quote = if free {
    Some(service.quote(params.unit_id, range, params.with_cleaning)?)
  } else {
    None
  };
  Ok(Json(Availability { unit_id: params.unit_id, range, free, quote }))
}
