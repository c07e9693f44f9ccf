//! Handlers for `/holds`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/holds` | Body: `{"unit_id":..,"start":..,"end":..,"ttl_secs":600}`; 409 if taken, 400 if `ttl_secs` is 0 or over a day |
//! | `DELETE` | `/holds/:id` | Always 204, even if the hold already expired |

use std::time::Duration;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use gite_booking::BookingService;
use gite_core::{DateRange, store::AvailabilityStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Longest lifetime a caller may ask for on a single hold.
pub const MAX_HOLD_TTL_SECS: u64 = 24 * 60 * 60;

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub unit_id:  Uuid,
  pub start:    NaiveDate,
  pub end:      NaiveDate,
  /// Overrides the configured hold lifetime.
  pub ttl_secs: Option<u64>,
}

/// `POST /holds`
pub async fn create<S>(
  State(service): State<BookingService<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AvailabilityStore + 'static,
{
  let range = DateRange::new(body.start, body.end)?;
  if body.ttl_secs.is_some_and(|secs| !(1..=MAX_HOLD_TTL_SECS).contains(&secs)) {
    return Err(ApiError::BadRequest(format!(
      "ttl_secs must be between 1 and {MAX_HOLD_TTL_SECS}"
    )));
  }
  let ttl = body.ttl_secs.map(Duration::from_secs);
  let hold = service.create_hold(body.unit_id, range, ttl).await?;
  Ok((StatusCode::CREATED, Json(hold)))
}

// ─── Release ──────────────────────────────────────────────────────────────────

/// `DELETE /holds/:id`
pub async fn release<S>(
  State(service): State<BookingService<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AvailabilityStore + 'static,
{
  service.release_hold(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
