//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use gite_api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("password hashing failed: {0}")]
  Hash(String),
  #[error("response error: {0}")]
  Http(#[from] axum::http::Error),
  #[error(transparent)]
  Api(#[from] ApiError),
}

impl From<gite_core::Error> for Error {
  fn from(e: gite_core::Error) -> Self { Error::Api(e.into()) }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"gite-admin\""),
        );
        res
      }
      Error::Hash(_) | Error::Http(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
      }
      Error::Api(e) => e.into_response(),
    }
  }
}
