//! Payment-provider webhook.
//!
//! Providers redeliver on any non-2xx answer, so a duplicate completion is
//! answered with 200 and `"already_finalized": true`. Signature checking is
//! left to whatever sits in front of this router.

use axum::{Json, extract::State};
use gite_booking::{BookingService, FinalizeOutcome};
use gite_core::store::AvailabilityStore;
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CompletedBody {
  pub payment_session_id: String,
  pub payment_reference:  String,
}

/// `POST /payments/completed`
pub async fn completed<S>(
  State(service): State<BookingService<S>>,
  Json(body): Json<CompletedBody>,
) -> Result<Json<FinalizeOutcome>, ApiError>
where
  S: AvailabilityStore + 'static,
{
  let outcome = service
    .finalize(&body.payment_session_id, &body.payment_reference)
    .await?;
  Ok(Json(outcome))
}
