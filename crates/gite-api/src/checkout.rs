//! Handlers for the guest checkout flow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/checkout` | Creates a pending reservation and its hold; 409 if taken |
//! | `GET`  | `/reservations/:id` | 404 if not found |
//! | `PUT`  | `/reservations/:id/payment-session` | Body: `{"session_id":"cs_.."}`; 409 unless pending |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use gite_booking::{BookingService, NewCheckout};
use gite_core::{
  DateRange,
  occupancy::OccupancyRecord,
  reservation::Reservation,
  store::AvailabilityStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Begin ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
  pub unit_id:       Uuid,
  pub guest_id:      String,
  pub start:         NaiveDate,
  pub end:           NaiveDate,
  pub guest_count:   u32,
  #[serde(default)]
  pub with_cleaning: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
  pub reservation: Reservation,
  pub hold:        OccupancyRecord,
}

/// `POST /checkout`
pub async fn begin<S>(
  State(service): State<BookingService<S>>,
  Json(body): Json<CheckoutBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AvailabilityStore + 'static,
{
  let req = NewCheckout {
    unit_id:       body.unit_id,
    guest_id:      body.guest_id,
    range:         DateRange::new(body.start, body.end)?,
    guest_count:   body.guest_count,
    with_cleaning: body.with_cleaning,
  };
  let checkout = service.begin_checkout(req).await?;
  Ok((
    StatusCode::CREATED,
    Json(CheckoutResponse { reservation: checkout.reservation, hold: checkout.hold }),
  ))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /reservations/:id`
pub async fn get_one<S>(
  State(service): State<BookingService<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  service
    .get_reservation(id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("reservation {id} not found")))
}

// ─── Payment session ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PaymentSessionBody {
  pub session_id: String,
}

/// `PUT /reservations/:id/payment-session`
pub async fn attach_session<S>(
  State(service): State<BookingService<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<PaymentSessionBody>,
) -> Result<Json<Reservation>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  if body.session_id.trim().is_empty() {
    return Err(ApiError::BadRequest("session_id must not be empty".into()));
  }
  let reservation = service.attach_payment_session(id, body.session_id).await?;
  Ok(Json(reservation))
}
