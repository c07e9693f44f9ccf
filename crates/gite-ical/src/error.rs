//! Error types for the gite-ical codec.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("document missing BEGIN/END:VCALENDAR envelope")]
  MissingEnvelope,

  #[error("VEVENT opened on line {line} is never closed")]
  UnterminatedEvent { line: usize },

  #[error("VEVENT {uid:?} has no DTSTART")]
  MissingStart { uid: Option<String> },

  #[error("invalid date in {property}: {value}")]
  InvalidDate { property: String, value: String },

  #[error("invalid DURATION: {0}")]
  InvalidDuration(String),

  #[error("VEVENT {uid:?} ends ({end}) before it starts ({start})")]
  EndBeforeStart {
    uid:   Option<String>,
    start: NaiveDate,
    end:   NaiveDate,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
