//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC with a fixed microsecond precision
//! so that lexical and chronological order agree. Dates are `YYYY-MM-DD`.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use gite_core::{
  DateRange,
  feed::{FeedSubscription, Invoice},
  occupancy::{OccupancyRecord, OccupancySource},
  pricing::Quote,
  reservation::{Reservation, ReservationStatus},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_range(start: &str, end: &str) -> Result<DateRange> {
  Ok(DateRange::new(decode_date(start)?, decode_date(end)?)?)
}

fn decode_u32(column: &'static str, value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

// ─── Occupancy ───────────────────────────────────────────────────────────────

pub const OCCUPANCY_COLUMNS: &str = "id, unit_id, start_date, end_date, source, source_ref, \
   reservation_id, created_at, expires_at";

/// Raw strings read directly from an `occupancy` row.
pub struct RawOccupancy {
  pub id:             String,
  pub unit_id:        String,
  pub start_date:     String,
  pub end_date:       String,
  pub source:         String,
  pub source_ref:     Option<String>,
  pub reservation_id: Option<String>,
  pub created_at:     String,
  pub expires_at:     Option<String>,
}

impl RawOccupancy {
  /// Read a row selected with [`OCCUPANCY_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      unit_id:        row.get(1)?,
      start_date:     row.get(2)?,
      end_date:       row.get(3)?,
      source:         row.get(4)?,
      source_ref:     row.get(5)?,
      reservation_id: row.get(6)?,
      created_at:     row.get(7)?,
      expires_at:     row.get(8)?,
    })
  }

  /// The values an `INSERT` of `record` binds, in [`OCCUPANCY_COLUMNS`] order.
  pub fn from_record(record: &OccupancyRecord) -> Self {
    Self {
      id:             encode_uuid(record.id),
      unit_id:        encode_uuid(record.unit_id),
      start_date:     encode_date(record.range.start()),
      end_date:       encode_date(record.range.end()),
      source:         record.source.discriminant().to_owned(),
      source_ref:     record.source_ref.clone(),
      reservation_id: record.reservation_id.map(encode_uuid),
      created_at:     encode_dt(record.created_at),
      expires_at:     record.expires_at.map(encode_dt),
    }
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      &format!(
        "INSERT INTO occupancy ({OCCUPANCY_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
      ),
      rusqlite::params![
        self.id,
        self.unit_id,
        self.start_date,
        self.end_date,
        self.source,
        self.source_ref,
        self.reservation_id,
        self.created_at,
        self.expires_at,
      ],
    )?;
    Ok(())
  }

  pub fn into_record(self) -> Result<OccupancyRecord> {
    Ok(OccupancyRecord {
      id:             decode_uuid(&self.id)?,
      unit_id:        decode_uuid(&self.unit_id)?,
      range:          decode_range(&self.start_date, &self.end_date)?,
      source:         OccupancySource::from_discriminant(&self.source)?,
      source_ref:     self.source_ref,
      reservation_id: self.reservation_id.as_deref().map(decode_uuid).transpose()?,
      created_at:     decode_dt(&self.created_at)?,
      expires_at:     self.expires_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

// ─── Reservations ────────────────────────────────────────────────────────────

pub const RESERVATION_COLUMNS: &str = "reservation_id, unit_id, guest_id, start_date, end_date, \
   guest_count, nights, base_cents, cleaning_cents, subtotal_cents, tourist_tax_cents, \
   total_cents, status, hold_token, payment_session_id, payment_reference, created_at, paid_at";

/// Raw values read directly from a `reservations` row.
pub struct RawReservation {
  pub reservation_id:     String,
  pub unit_id:            String,
  pub guest_id:           String,
  pub start_date:         String,
  pub end_date:           String,
  pub guest_count:        i64,
  pub nights:             i64,
  pub base_cents:         i64,
  pub cleaning_cents:     i64,
  pub subtotal_cents:     i64,
  pub tourist_tax_cents:  i64,
  pub total_cents:        i64,
  pub status:             String,
  pub hold_token:         Option<String>,
  pub payment_session_id: Option<String>,
  pub payment_reference:  Option<String>,
  pub created_at:         String,
  pub paid_at:            Option<String>,
}

impl RawReservation {
  /// Read a row selected with [`RESERVATION_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reservation_id:     row.get(0)?,
      unit_id:            row.get(1)?,
      guest_id:           row.get(2)?,
      start_date:         row.get(3)?,
      end_date:           row.get(4)?,
      guest_count:        row.get(5)?,
      nights:             row.get(6)?,
      base_cents:         row.get(7)?,
      cleaning_cents:     row.get(8)?,
      subtotal_cents:     row.get(9)?,
      tourist_tax_cents:  row.get(10)?,
      total_cents:        row.get(11)?,
      status:             row.get(12)?,
      hold_token:         row.get(13)?,
      payment_session_id: row.get(14)?,
      payment_reference:  row.get(15)?,
      created_at:         row.get(16)?,
      paid_at:            row.get(17)?,
    })
  }

  pub fn from_reservation(r: &Reservation) -> Self {
    Self {
      reservation_id:     encode_uuid(r.reservation_id),
      unit_id:            encode_uuid(r.unit_id),
      guest_id:           r.guest_id.clone(),
      start_date:         encode_date(r.range.start()),
      end_date:           encode_date(r.range.end()),
      guest_count:        i64::from(r.guest_count),
      nights:             i64::from(r.quote.nights),
      base_cents:         r.quote.base_cents,
      cleaning_cents:     r.quote.cleaning_cents,
      subtotal_cents:     r.quote.subtotal_cents,
      tourist_tax_cents:  r.quote.tourist_tax_cents,
      total_cents:        r.quote.total_cents,
      status:             r.status.discriminant().to_owned(),
      hold_token:         r.hold_token.clone(),
      payment_session_id: r.payment_session_id.clone(),
      payment_reference:  r.payment_reference.clone(),
      created_at:         encode_dt(r.created_at),
      paid_at:            r.paid_at.map(encode_dt),
    }
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      &format!(
        "INSERT INTO reservations ({RESERVATION_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18)"
      ),
      rusqlite::params![
        self.reservation_id,
        self.unit_id,
        self.guest_id,
        self.start_date,
        self.end_date,
        self.guest_count,
        self.nights,
        self.base_cents,
        self.cleaning_cents,
        self.subtotal_cents,
        self.tourist_tax_cents,
        self.total_cents,
        self.status,
        self.hold_token,
        self.payment_session_id,
        self.payment_reference,
        self.created_at,
        self.paid_at,
      ],
    )?;
    Ok(())
  }

  pub fn into_reservation(self) -> Result<Reservation> {
    Ok(Reservation {
      reservation_id:     decode_uuid(&self.reservation_id)?,
      unit_id:            decode_uuid(&self.unit_id)?,
      guest_id:           self.guest_id,
      range:              decode_range(&self.start_date, &self.end_date)?,
      guest_count:        decode_u32("guest_count", self.guest_count)?,
      quote:              Quote {
        nights:            decode_u32("nights", self.nights)?,
        base_cents:        self.base_cents,
        cleaning_cents:    self.cleaning_cents,
        subtotal_cents:    self.subtotal_cents,
        tourist_tax_cents: self.tourist_tax_cents,
        total_cents:       self.total_cents,
      },
      status:             ReservationStatus::from_discriminant(&self.status)?,
      hold_token:         self.hold_token,
      payment_session_id: self.payment_session_id,
      payment_reference:  self.payment_reference,
      created_at:         decode_dt(&self.created_at)?,
      paid_at:            self.paid_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

// ─── Feed subscriptions ──────────────────────────────────────────────────────

pub const SUBSCRIPTION_COLUMNS: &str =
  "subscription_id, unit_id, import_url, export_token, last_synced_at, created_at";

pub struct RawSubscription {
  pub subscription_id: String,
  pub unit_id:         String,
  pub import_url:      Option<String>,
  pub export_token:    String,
  pub last_synced_at:  Option<String>,
  pub created_at:      String,
}

impl RawSubscription {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscription_id: row.get(0)?,
      unit_id:         row.get(1)?,
      import_url:      row.get(2)?,
      export_token:    row.get(3)?,
      last_synced_at:  row.get(4)?,
      created_at:      row.get(5)?,
    })
  }

  pub fn into_subscription(self) -> Result<FeedSubscription> {
    Ok(FeedSubscription {
      subscription_id: decode_uuid(&self.subscription_id)?,
      unit_id:         decode_uuid(&self.unit_id)?,
      import_url:      self.import_url,
      export_token:    self.export_token,
      last_synced_at:  self.last_synced_at.as_deref().map(decode_dt).transpose()?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

// ─── Invoices ────────────────────────────────────────────────────────────────

pub struct RawInvoice {
  pub invoice_id:     String,
  pub reservation_id: String,
  pub number:         String,
  pub issued_at:      String,
}

impl RawInvoice {
  pub fn into_invoice(self) -> Result<Invoice> {
    Ok(Invoice {
      invoice_id:     decode_uuid(&self.invoice_id)?,
      reservation_id: decode_uuid(&self.reservation_id)?,
      number:         self.number,
      issued_at:      decode_dt(&self.issued_at)?,
    })
  }
}
