//! iCalendar (RFC 5545) codec for Gîte availability feeds.
//!
//! Converts between `text/calendar` documents and [`gite_core`] occupancy
//! types. Pure synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use gite_ical::parse;
//!
//! let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\n\
//!            BEGIN:VEVENT\r\nUID:a@b\r\nDTSTART;VALUE=DATE:20250710\r\n\
//!            DTEND;VALUE=DATE:20250715\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
//! let cal = parse(ics).unwrap();
//! println!("{} blocked intervals", cal.events.len());
//! ```

pub mod error;
mod parse;
mod serialize;

pub use error::{Error, Result};
use gite_core::occupancy::{ImportedInterval, OccupancyRecord};

// ─── Public types ────────────────────────────────────────────────────────────

/// The blocked intervals found in one remote calendar document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCalendar {
  /// The calendar's `PRODID`, if present.
  pub prodid:    Option<String>,
  pub events:    Vec<ImportedInterval>,
  /// Events dropped because they were `STATUS:CANCELLED`.
  pub cancelled: usize,
}

/// Calendar-level settings for an exported feed.
#[derive(Debug, Clone)]
pub struct ExportOptions {
  pub prodid:        String,
  pub calendar_name: String,
  /// Right-hand side of every event `UID`.
  pub uid_domain:    String,
}

impl Default for ExportOptions {
  fn default() -> Self {
    Self {
      prodid:        "-//Gite//Availability Calendar//EN".to_string(),
      calendar_name: "Gîte availability".to_string(),
      uid_domain:    "gite.invalid".to_string(),
    }
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse a whole `VCALENDAR` document.
///
/// Any event that cannot be understood fails the whole document, so a feed
/// is either taken as a unit or not at all.
pub fn parse(input: &str) -> Result<ParsedCalendar> { parse::parse_calendar(input) }

/// Render `records` as an all-day, opaque `VCALENDAR` (CRLF line endings,
/// folded at 75 octets). Identical input yields identical bytes regardless
/// of record order.
pub fn serialize(records: &[OccupancyRecord], options: &ExportOptions) -> String {
  serialize::serialize_calendar(records, options)
}

// ─── Round-trip test ─────────────────────────────────────────────────────────
