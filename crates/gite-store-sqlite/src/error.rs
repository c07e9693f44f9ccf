//! Error type for `gite-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] gite_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("column {column} out of range: {value}")]
  OutOfRange { column: &'static str, value: i64 },

  /// Another reservation already carries this payment session id.
  #[error("payment session {0:?} is already attached to another reservation")]
  DuplicatePaymentSession(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
