//! Public calendar export for third-party calendar apps.
//!
//! `GET /ical/{token}` (the `.ics` suffix is optional) resolves the secret
//! token to its unit and returns the unit's feed. No credentials are needed;
//! knowing the token is the authorisation.

use axum::{
  body::Body,
  extract::{Path, State},
  http::{HeaderMap, StatusCode, header},
  response::Response,
};
use gite_core::store::AvailabilityStore;

use crate::{
  AppState,
  error::Error,
  etag::{compute_etag, if_none_match},
};

pub async fn export<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: AvailabilityStore + 'static,
{
  let token = token.strip_suffix(".ics").unwrap_or(&token);
  let (subscription, body) = state.service.export_by_token(token).await?;
  let etag = compute_etag(&body);

  let not_modified = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| if_none_match(v, &etag));

  let builder = Response::builder()
    .header(header::ETAG, &etag)
    .header(header::CACHE_CONTROL, "no-cache");

  let response = if not_modified {
    builder.status(StatusCode::NOT_MODIFIED).body(Body::empty())
  } else {
    builder
      .status(StatusCode::OK)
      .header(header::CONTENT_TYPE, "text/calendar; charset=utf-8")
      .header(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"gite-{}.ics\"", subscription.unit_id),
      )
      .body(Body::from(body))
  };
  Ok(response?)
}
