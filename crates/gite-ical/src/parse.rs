//! iCalendar content-line parser.
//!
//! Pipeline:
//!   raw &str
//!     └─ unfold_lines()         → Vec<String>
//!          └─ parse_content_line() → ContentLine
//!               └─ EventAccum       → one ImportedInterval per VEVENT

use chrono::{Days, NaiveDate, NaiveDateTime};
use gite_core::{DateRange, occupancy::ImportedInterval};

use crate::{
  ParsedCalendar,
  error::{Error, Result},
};

// ─── Content-line representation ─────────────────────────────────────────────

struct ContentLine {
  name:   String,
  params: Vec<Param>,
  value:  String,
}

struct Param {
  name:  String,
  value: String,
}

impl ContentLine {
  fn param(&self, name: &str) -> Option<&str> {
    self
      .params
      .iter()
      .find(|p| p.name.eq_ignore_ascii_case(name))
      .map(|p| p.value.as_str())
  }
}

// ─── Low-level helpers ───────────────────────────────────────────────────────

/// Join CRLF+SP (or LF+SP / LF+HT) continuation lines (RFC 5545 §3.1).
/// Tolerates bare LF line endings, which many exporters emit.
pub(crate) fn unfold_lines(s: &str) -> Vec<String> {
  let mut lines: Vec<String> = Vec::new();
  for raw in s.split('\n') {
    let line = raw.strip_suffix('\r').unwrap_or(raw);
    if line.starts_with(' ') || line.starts_with('\t') {
      if let Some(last) = lines.last_mut() {
        last.push_str(&line[1..]);
      }
    } else {
      lines.push(line.to_string());
    }
  }
  lines.retain(|l| !l.trim().is_empty());
  lines
}

/// Find the first `:` that is not inside a double-quoted parameter value.
fn find_unquoted_colon(s: &str) -> Option<usize> {
  let mut in_quotes = false;
  for (i, c) in s.char_indices() {
    match c {
      '"' => in_quotes = !in_quotes,
      ':' if !in_quotes => return Some(i),
      _ => {}
    }
  }
  None
}

/// Split on `;` while respecting double-quoted strings.
fn split_semicolons_respecting_quotes(s: &str) -> Vec<&str> {
  let mut result = Vec::new();
  let mut start = 0usize;
  let mut in_quotes = false;
  for (i, c) in s.char_indices() {
    match c {
      '"' => in_quotes = !in_quotes,
      ';' if !in_quotes => {
        result.push(&s[start..i]);
        start = i + 1;
      }
      _ => {}
    }
  }
  result.push(&s[start..]);
  result
}

fn parse_content_line(line: &str) -> Option<ContentLine> {
  let colon_pos = find_unquoted_colon(line)?;
  let tokens = split_semicolons_respecting_quotes(&line[..colon_pos]);
  let name = tokens.first()?.trim().to_uppercase();
  if name.is_empty() {
    return None;
  }

  let params = tokens[1..]
    .iter()
    .filter_map(|token| {
      let (n, v) = token.split_once('=')?;
      Some(Param {
        name:  n.trim().to_uppercase(),
        value: v.trim().trim_matches('"').to_string(),
      })
    })
    .collect();

  Some(ContentLine {
    name,
    params,
    value: line[colon_pos + 1..].trim().to_string(),
  })
}

fn unescape_text(s: &str) -> String {
  let mut result = String::with_capacity(s.len());
  let mut chars = s.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      result.push(c);
      continue;
    }
    match chars.next() {
      Some('n') | Some('N') => result.push('\n'),
      Some(other) => result.push(other),
      None => result.push('\\'),
    }
  }
  result
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Parse a `DATE` (`YYYYMMDD`) or `DATE-TIME` (`YYYYMMDDTHHMMSS[Z]`) value.
/// Date-times are truncated to their calendar date in the zone they were
/// written in; `TZID` is not resolved.
fn parse_date_value(cl: &ContentLine) -> Result<NaiveDate> {
  let invalid = || Error::InvalidDate {
    property: cl.name.clone(),
    value:    cl.value.clone(),
  };
  let value = cl.value.as_str();
  let is_date = cl
    .param("VALUE")
    .is_some_and(|v| v.eq_ignore_ascii_case("DATE"));

  if is_date || !value.contains('T') {
    return NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| invalid());
  }

  let naive = value.strip_suffix('Z').unwrap_or(value);
  NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S")
    .map(|dt| dt.date())
    .map_err(|_| invalid())
}

/// Whole days covered by a `DURATION` value (`P2D`, `P1W`, `P1DT12H`, …).
/// Time components are rounded down to whole days.
fn parse_duration_days(value: &str) -> Result<u64> {
  let invalid = || Error::InvalidDuration(value.to_string());
  let body = value.strip_prefix('+').unwrap_or(value);
  let body = body.strip_prefix('P').ok_or_else(invalid)?;

  let mut days = 0u64;
  let mut seconds = 0u64;
  let mut digits = String::new();
  let mut in_time = false;
  for c in body.chars() {
    match c {
      '0'..='9' => digits.push(c),
      'T' if !in_time && digits.is_empty() => in_time = true,
      'W' | 'D' | 'H' | 'M' | 'S' => {
        let n: u64 = digits.parse().map_err(|_| invalid())?;
        digits.clear();
        // Values come from remote feeds, so any overflow rejects the feed.
        let (total, unit) = match (c, in_time) {
          ('W', false) => (&mut days, 7),
          ('D', false) => (&mut days, 1),
          ('H', true) => (&mut seconds, 3600),
          ('M', true) => (&mut seconds, 60),
          ('S', true) => (&mut seconds, 1),
          _ => return Err(invalid()),
        };
        let current = *total;
        *total = n
          .checked_mul(unit)
          .and_then(|v| current.checked_add(v))
          .ok_or_else(invalid)?;
      }
      _ => return Err(invalid()),
    }
  }
  if !digits.is_empty() {
    return Err(invalid());
  }
  days.checked_add(seconds / 86_400).ok_or_else(invalid)
}

// ─── Accumulator ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct EventAccum {
  uid:       Option<String>,
  start:     Option<NaiveDate>,
  end:       Option<NaiveDate>,
  duration:  Option<u64>,
  cancelled: bool,
}

impl EventAccum {
  fn apply(&mut self, cl: &ContentLine) -> Result<()> {
    match cl.name.as_str() {
      "UID" => {
        let uid = unescape_text(&cl.value);
        if !uid.is_empty() {
          self.uid = Some(uid);
        }
      }
      "DTSTART" => self.start = Some(parse_date_value(cl)?),
      "DTEND" => self.end = Some(parse_date_value(cl)?),
      "DURATION" => self.duration = Some(parse_duration_days(&cl.value)?),
      "STATUS" => self.cancelled = cl.value.eq_ignore_ascii_case("CANCELLED"),
      _ => {}
    }
    Ok(())
  }

  /// `None` for cancelled events.
  fn finish(self) -> Result<Option<ImportedInterval>> {
    let start = self
      .start
      .ok_or_else(|| Error::MissingStart { uid: self.uid.clone() })?;

    let end = match (self.end, self.duration) {
      (Some(end), _) => end,
      (None, Some(days)) => start
        .checked_add_days(Days::new(days))
        .ok_or_else(|| Error::InvalidDuration(format!("P{days}D")))?,
      (None, None) => start,
    };

    if end < start {
      return Err(Error::EndBeforeStart { uid: self.uid, start, end });
    }
    if self.cancelled {
      return Ok(None);
    }

    // Same-day events (and all-day events without an end) still block the
    // night of their start date.
    let end = if end == start { start.succ_opt().unwrap_or(start) } else { end };
    let range = DateRange::new(start, end).map_err(|_| Error::InvalidDate {
      property: "DTSTART".to_string(),
      value:    start.to_string(),
    })?;

    Ok(Some(ImportedInterval { range, uid: self.uid }))
  }
}

// ─── Document parser ─────────────────────────────────────────────────────────

pub fn parse_calendar(input: &str) -> Result<ParsedCalendar> {
  let lines = unfold_lines(input);

  let start = lines
    .iter()
    .position(|l| l.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    .ok_or(Error::MissingEnvelope)?;
  let end = lines
    .iter()
    .rposition(|l| l.eq_ignore_ascii_case("END:VCALENDAR"))
    .ok_or(Error::MissingEnvelope)?;
  if end <= start {
    return Err(Error::MissingEnvelope);
  }

  let mut prodid = None;
  let mut events = Vec::new();
  let mut cancelled = 0usize;
  // The open VEVENT and the line it began on.
  let mut current: Option<(EventAccum, usize)> = None;
  // Names of open components other than VEVENT (VTIMEZONE, VALARM, …).
  let mut nested: Vec<String> = Vec::new();

  for (idx, line) in lines.iter().enumerate().take(end).skip(start + 1) {
    let Some(cl) = parse_content_line(line) else {
      continue;
    };

    match cl.name.as_str() {
      "BEGIN" if cl.value.eq_ignore_ascii_case("VEVENT") && nested.is_empty() => {
        if let Some((_, opened)) = current {
          return Err(Error::UnterminatedEvent { line: opened + 1 });
        }
        current = Some((EventAccum::default(), idx));
      }
      "BEGIN" => nested.push(cl.value.to_uppercase()),
      "END" if cl.value.eq_ignore_ascii_case("VEVENT") && nested.is_empty() => {
        if let Some((accum, _)) = current.take() {
          match accum.finish()? {
            Some(event) => events.push(event),
            None => cancelled += 1,
          }
        }
      }
      "END" => {
        if nested.last().is_some_and(|n| n.eq_ignore_ascii_case(&cl.value)) {
          nested.pop();
        }
      }
      _ if !nested.is_empty() => {}
      "PRODID" if current.is_none() => prodid = Some(unescape_text(&cl.value)),
      _ => {
        if let Some((accum, _)) = current.as_mut() {
          accum.apply(&cl)?;
        }
      }
    }
  }

  if let Some((_, opened)) = current {
    return Err(Error::UnterminatedEvent { line: opened + 1 });
  }

  Ok(ParsedCalendar { prodid, events, cancelled })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn calendar(body: &str) -> String {
    format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\n{body}END:VCALENDAR\r\n")
  }

  // ── Envelope ──────────────────────────────────────────────────────────

  #[test]
  fn missing_envelope_returns_error() {
    let r = parse_calendar("BEGIN:VEVENT\r\nDTSTART:20250710\r\nEND:VEVENT\r\n");
    assert!(matches!(r, Err(Error::MissingEnvelope)));
  }

  #[test]
  fn html_error_page_is_rejected() {
    let r = parse_calendar("<html><body>502 Bad Gateway</body></html>");
    assert!(matches!(r, Err(Error::MissingEnvelope)));
  }

  #[test]
  fn empty_calendar_has_no_events() {
    let cal = parse_calendar(&calendar("")).unwrap();
    assert!(cal.events.is_empty());
    assert_eq!(cal.prodid.as_deref(), Some("-//Test//EN"));
  }

  // ── Dates ─────────────────────────────────────────────────────────────

  #[test]
  fn all_day_event_is_taken_verbatim() {
    let cal = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nUID:abc@airbnb.com\r\nDTSTART;VALUE=DATE:20250710\r\n\
       DTEND;VALUE=DATE:20250715\r\nSUMMARY:Reserved\r\nEND:VEVENT\r\n",
    ))
    .unwrap();
    assert_eq!(cal.events.len(), 1);
    let ev = &cal.events[0];
    assert_eq!(ev.range.start(), d(2025, 7, 10));
    assert_eq!(ev.range.end(), d(2025, 7, 15));
    assert_eq!(ev.uid.as_deref(), Some("abc@airbnb.com"));
  }

  #[test]
  fn date_times_are_truncated_to_dates() {
    let cal = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nDTSTART;TZID=Europe/Paris:20250710T160000\r\n\
       DTEND:20250715T090000Z\r\nEND:VEVENT\r\n",
    ))
    .unwrap();
    assert_eq!(cal.events[0].range.start(), d(2025, 7, 10));
    assert_eq!(cal.events[0].range.end(), d(2025, 7, 15));
    assert_eq!(cal.events[0].uid, None);
  }

  #[test]
  fn missing_end_uses_duration() {
    let cal = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20250801\r\nDURATION:P1W\r\nEND:VEVENT\r\n",
    ))
    .unwrap();
    assert_eq!(cal.events[0].range.end(), d(2025, 8, 8));
  }

  #[test]
  fn missing_end_and_duration_blocks_one_night() {
    let cal = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20251231\r\nEND:VEVENT\r\n",
    ))
    .unwrap();
    assert_eq!(cal.events[0].range.end(), d(2026, 1, 1));
  }

  #[test]
  fn same_day_event_is_widened_to_one_night() {
    let cal = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nDTSTART:20250710T100000Z\r\nDTEND:20250710T120000Z\r\nEND:VEVENT\r\n",
    ))
    .unwrap();
    assert_eq!(cal.events[0].range.nights(), 1);
  }

  #[test]
  fn end_before_start_rejects_feed() {
    let r = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nUID:x\r\nDTSTART;VALUE=DATE:20250715\r\n\
       DTEND;VALUE=DATE:20250710\r\nEND:VEVENT\r\n",
    ));
    assert!(matches!(r, Err(Error::EndBeforeStart { .. })));
  }

  #[test]
  fn garbage_date_rejects_feed() {
    let r = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:2025-7-10\r\nEND:VEVENT\r\n",
    ));
    assert!(matches!(r, Err(Error::InvalidDate { .. })));
  }

  #[test]
  fn duration_parsing() {
    assert_eq!(parse_duration_days("P3D").unwrap(), 3);
    assert_eq!(parse_duration_days("P2W").unwrap(), 14);
    assert_eq!(parse_duration_days("P1DT36H").unwrap(), 2);
    assert_eq!(parse_duration_days("PT2H").unwrap(), 0);
    assert!(parse_duration_days("-P1D").is_err());
    assert!(parse_duration_days("P1Y").is_err());
  }

  #[test]
  fn overflowing_duration_is_rejected() {
    for value in [
      "P3000000000000000000W",
      "P18446744073709551615DT24H",
      "PT18446744073709551615H",
      "P99999999999999999999D",
    ] {
      assert!(
        matches!(parse_duration_days(value), Err(Error::InvalidDuration(v)) if v == value),
        "{value}"
      );
    }
  }

  #[test]
  fn overflowing_duration_rejects_feed() {
    let r = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nUID:a\r\nDTSTART;VALUE=DATE:20250701\r\nDTEND;VALUE=DATE:20250705\r\n\
       END:VEVENT\r\n\
       BEGIN:VEVENT\r\nUID:b\r\nDTSTART;VALUE=DATE:20250801\r\n\
       DURATION:P3000000000000000000W\r\nEND:VEVENT\r\n",
    ));
    assert!(matches!(r, Err(Error::InvalidDuration(_))));

    // Fits in the counter but not on the calendar.
    let r = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20250801\r\nDURATION:P1000000000000D\r\nEND:VEVENT\r\n",
    ));
    assert!(matches!(r, Err(Error::InvalidDuration(_))));
  }

  // ── Structure ─────────────────────────────────────────────────────────

  #[test]
  fn missing_dtstart_rejects_feed() {
    let r = parse_calendar(&calendar("BEGIN:VEVENT\r\nUID:x\r\nEND:VEVENT\r\n"));
    assert!(matches!(r, Err(Error::MissingStart { .. })));
  }

  #[test]
  fn unterminated_event_rejects_feed() {
    let r = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20250710\r\n",
    ));
    assert!(matches!(r, Err(Error::UnterminatedEvent { .. })));
  }

  #[test]
  fn cancelled_events_are_skipped() {
    let cal = parse_calendar(&calendar(
      "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20250710\r\nSTATUS:CANCELLED\r\nEND:VEVENT\r\n\
       BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20250720\r\nSTATUS:CONFIRMED\r\nEND:VEVENT\r\n",
    ))
    .unwrap();
    assert_eq!(cal.events.len(), 1);
    assert_eq!(cal.cancelled, 1);
    assert_eq!(cal.events[0].range.start(), d(2025, 7, 20));
  }

  #[test]
  fn timezone_and_alarm_components_are_ignored() {
    let cal = parse_calendar(&calendar(
      "BEGIN:VTIMEZONE\r\nTZID:Europe/Paris\r\nBEGIN:STANDARD\r\nDTSTART:19701025T030000\r\n\
       END:STANDARD\r\nEND:VTIMEZONE\r\n\
       BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20250710\r\nDTEND;VALUE=DATE:20250712\r\n\
       BEGIN:VALARM\r\nTRIGGER:-PT15M\r\nDTSTART:20000101T000000\r\nEND:VALARM\r\nEND:VEVENT\r\n",
    ))
    .unwrap();
    assert_eq!(cal.events.len(), 1);
    assert_eq!(cal.events[0].range.start(), d(2025, 7, 10));
    assert_eq!(cal.events[0].range.end(), d(2025, 7, 12));
  }

  #[test]
  fn folded_lines_and_bare_lf_are_accepted() {
    let input = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:very-long-\n identifier@example.com\n\
                 DTSTART;VALUE=DATE:20250710\nEND:VEVENT\nEND:VCALENDAR\n";
    let cal = parse_calendar(input).unwrap();
    assert_eq!(cal.events[0].uid.as_deref(), Some("very-long-identifier@example.com"));
  }

  #[test]
  fn quoted_params_may_contain_colons() {
    let cl = parse_content_line("DTSTART;TZID=\"GMT+01:00\":20250710T100000").unwrap();
    assert_eq!(cl.name, "DTSTART");
    assert_eq!(cl.param("tzid"), Some("GMT+01:00"));
    assert_eq!(cl.value, "20250710T100000");
  }
}
