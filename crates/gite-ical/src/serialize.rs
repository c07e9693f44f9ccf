//! iCalendar serializer for exported availability feeds.
//!
//! Produces CRLF line endings and folds at 75 octets per RFC 5545 §3.1.

use gite_core::occupancy::{OccupancyRecord, OccupancySource};

use crate::ExportOptions;

// ─── RFC 5545 line folding ───────────────────────────────────────────────────

/// Emit `s` as one logical line, folding at 75 octets with CRLF + SP
/// continuation.
pub(crate) fn fold_line(s: &str) -> String {
  if s.len() <= 75 {
    return format!("{s}\r\n");
  }

  let mut result = String::new();
  let total = s.len();
  let mut pos = 0usize;
  let mut first = true;

  while pos < total {
    let limit = if first { 75 } else { 74 };
    let end = if pos + limit >= total {
      total
    } else {
      let mut e = pos + limit;
      while e > pos && !s.is_char_boundary(e) {
        e -= 1;
      }
      if e == pos { pos + 1 } else { e }
    };

    if !first {
      result.push(' ');
    }
    result.push_str(&s[pos..end]);
    result.push_str("\r\n");
    pos = end;
    first = false;
  }

  result
}

/// Escape a TEXT value: `\`, `,`, `;`, newline.
fn escape_text(s: &str) -> String {
  s.replace('\\', "\\\\")
    .replace(',', "\\,")
    .replace(';', "\\;")
    .replace('\n', "\\n")
}

fn summary(source: OccupancySource) -> &'static str {
  match source {
    OccupancySource::ConfirmedBooking => "Reserved",
    OccupancySource::InternalHold => "Reserved (pending)",
    OccupancySource::ExternalImport => "Unavailable",
  }
}

// ─── Serializer ──────────────────────────────────────────────────────────────

pub fn serialize_calendar(records: &[OccupancyRecord], options: &ExportOptions) -> String {
  let mut sorted: Vec<&OccupancyRecord> = records.iter().collect();
  sorted.sort_by_key(|r| (r.range.start(), r.id));

  let mut out = String::new();
  let mut line = |s: String| out.push_str(&fold_line(&s));

  line("BEGIN:VCALENDAR".into());
  line("VERSION:2.0".into());
  line(format!("PRODID:{}", escape_text(&options.prodid)));
  line("CALSCALE:GREGORIAN".into());
  line("METHOD:PUBLISH".into());
  line(format!("X-WR-CALNAME:{}", escape_text(&options.calendar_name)));

  for record in sorted {
    line("BEGIN:VEVENT".into());
    line(format!("UID:{}@{}", record.id, options.uid_domain));
    line(format!("DTSTAMP:{}", record.created_at.format("%Y%m%dT%H%M%SZ")));
    line(format!("DTSTART;VALUE=DATE:{}", record.range.start().format("%Y%m%d")));
    line(format!("DTEND;VALUE=DATE:{}", record.range.end().format("%Y%m%d")));
    line(format!("SUMMARY:{}", escape_text(summary(record.source))));
    line("TRANSP:OPAQUE".into());
    line("END:VEVENT".into());
  }

  line("END:VCALENDAR".into());
  out
}
