//! HTTP Basic auth for the back-office routes.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;

use crate::error::Error;

/// Credentials accepted for the admin API.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify Basic credentials in `headers` against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

/// Middleware rejecting requests without valid admin credentials.
pub async fn require_admin(
  State(config): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  if let Err(e) = verify_auth(req.headers(), &config) {
    tracing::debug!(uri = %req.uri(), "admin request rejected");
    return Err(e);
  }
  Ok(next.run(req).await)
}

/// Argon2id PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderValue, header};

  use super::*;

  fn config(password: &str) -> AuthConfig {
    AuthConfig {
      username:      "owner".to_string(),
      password_hash: hash_password(password).unwrap(),
    }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  #[test]
  fn correct_credentials() {
    let config = config("secret");
    assert!(verify_auth(&headers(&basic("owner", "secret")), &config).is_ok());
  }

  #[test]
  fn wrong_password_or_user() {
    let config = config("secret");
    assert!(matches!(
      verify_auth(&headers(&basic("owner", "wrong")), &config),
      Err(Error::Unauthorized)
    ));
    assert!(matches!(
      verify_auth(&headers(&basic("guest", "secret")), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_or_malformed_header() {
    let config = config("secret");
    assert!(matches!(verify_auth(&HeaderMap::new(), &config), Err(Error::Unauthorized)));
    assert!(matches!(
      verify_auth(&headers("Basic !!!not-base64!!!"), &config),
      Err(Error::Unauthorized)
    ));
    assert!(matches!(
      verify_auth(&headers("Bearer abc"), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn hashes_are_salted() {
    let a = hash_password("secret").unwrap();
    let b = hash_password("secret").unwrap();
    assert_ne!(a, b);
    assert!(a.starts_with("$argon2id$"));
  }
}
