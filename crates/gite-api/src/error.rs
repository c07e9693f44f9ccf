//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gite_core::Error as BookingError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Booking(#[from] BookingError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Booking(e) => match e {
        BookingError::InvalidInterval { .. }
        | BookingError::InvalidTtl(_)
        | BookingError::InvalidGuestCount(_) => StatusCode::BAD_REQUEST,
        BookingError::SlotNoLongerAvailable | BookingError::ReservationNotPending { .. } => {
          StatusCode::CONFLICT
        }
        BookingError::ReservationNotFound(_)
        | BookingError::UnknownUnit(_)
        | BookingError::HoldNotFound(_)
        | BookingError::SubscriptionNotFound(_) => StatusCode::NOT_FOUND,
        BookingError::FeedUnreachable { .. } => StatusCode::BAD_GATEWAY,
        BookingError::FeedParseError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::UnknownDiscriminant { .. } | BookingError::Storage(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("request failed: {self}");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
