//! [`SqliteStore`], the SQLite implementation of [`AvailabilityStore`].

use std::path::Path;

use chrono::{DateTime, Datelike, Utc};
use gite_core::{
  DateRange,
  feed::{FeedSubscription, Invoice, NewFeedSubscription},
  occupancy::{ImportedInterval, NewHold, OccupancyRecord, OccupancySource},
  reservation::{NewReservation, Reservation, ReservationQuery, ReservationStatus},
  store::{
    AvailabilityStore, Checkout, Finalization, InvoiceOutcome, Placement, SessionAttachment,
  },
};
use rusqlite::{ErrorCode, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    OCCUPANCY_COLUMNS, RESERVATION_COLUMNS, RawInvoice, RawOccupancy, RawReservation,
    RawSubscription, SUBSCRIPTION_COLUMNS, decode_uuid, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── SQL helpers ─────────────────────────────────────────────────────────────

/// Whether `e` is a UNIQUE / PRIMARY KEY violation.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  match e {
    rusqlite::Error::SqliteFailure(err, _) => {
      err.code == ErrorCode::ConstraintViolation
        && matches!(
          err.extended_code,
          rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }
    _ => false,
  }
}

/// Ids of live records on `unit_id` overlapping `[start, end)` (encoded
/// dates).
///
/// Half-open overlap: `start < existing.end AND existing.start < end`.
/// Holds whose `expires_at` has passed no longer count.
fn live_conflicts(
  conn: &rusqlite::Connection,
  unit_id: &str,
  (start, end): (&str, &str),
  exclude_reservation: Option<&str>,
  now: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare_cached(
    "SELECT id FROM occupancy
     WHERE unit_id = ?1
       AND start_date < ?3
       AND ?2 < end_date
       AND (expires_at IS NULL OR expires_at > ?4)
       AND (?5 IS NULL OR reservation_id IS NULL OR reservation_id != ?5)
     ORDER BY start_date, id",
  )?;
  stmt
    .query_map(
      rusqlite::params![unit_id, start, end, now, exclude_reservation],
      |row| row.get(0),
    )?
    .collect()
}

fn reservation_where(
  conn: &rusqlite::Connection,
  clause: &str,
  param: &str,
) -> rusqlite::Result<Option<RawReservation>> {
  conn
    .query_row(
      &format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE {clause}"),
      rusqlite::params![param],
      RawReservation::from_row,
    )
    .optional()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Gîte interval store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `SELECT <occupancy columns> <tail>` bound to the unit (and `now`,
  /// when given, as `?2`).
  async fn select_records(
    &self,
    tail: &'static str,
    unit_id: Uuid,
    now: Option<DateTime<Utc>>,
  ) -> Result<Vec<OccupancyRecord>> {
    let unit_str = encode_uuid(unit_id);
    let now_str = now.map(encode_dt);

    let raws: Vec<RawOccupancy> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&format!("SELECT {OCCUPANCY_COLUMNS} {tail}"))?;
        let rows = match now_str {
          Some(now) => stmt.query_map(rusqlite::params![unit_str, now], RawOccupancy::from_row)?,
          None => stmt.query_map(rusqlite::params![unit_str], RawOccupancy::from_row)?,
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOccupancy::into_record).collect()
  }
}

fn hold_record(hold: &NewHold) -> OccupancyRecord {
  OccupancyRecord {
    id:             Uuid::new_v4(),
    unit_id:        hold.unit_id,
    range:          hold.range,
    source:         OccupancySource::InternalHold,
    source_ref:     Some(hold.token.clone()),
    reservation_id: hold.reservation_id,
    created_at:     hold.created_at,
    expires_at:     Some(hold.expires_at),
  }
}

// ─── AvailabilityStore impl ──────────────────────────────────────────────────

impl AvailabilityStore for SqliteStore {
  type Error = Error;

  // ── Occupancy ─────────────────────────────────────────────────────────────

  async fn find_conflicts(
    &self,
    unit_id: Uuid,
    range: DateRange,
    exclude_reservation: Option<Uuid>,
    now: DateTime<Utc>,
  ) -> Result<Vec<Uuid>> {
    let unit_str = encode_uuid(unit_id);
    let (start, end) = (encode_date(range.start()), encode_date(range.end()));
    let exclude_str = exclude_reservation.map(encode_uuid);
    let now_str = encode_dt(now);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        Ok(live_conflicts(conn, &unit_str, (&start, &end), exclude_str.as_deref(), &now_str)?)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn place_hold(&self, hold: NewHold) -> Result<Placement<OccupancyRecord>> {
    let record = hold_record(&hold);
    let raw = RawOccupancy::from_record(&record);
    let now_str = encode_dt(hold.created_at);
    let exclude_str = hold.reservation_id.map(encode_uuid);

    let conflict: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let conflicts = live_conflicts(
          &tx,
          &raw.unit_id,
          (&raw.start_date, &raw.end_date),
          exclude_str.as_deref(),
          &now_str,
        )?;
        if let Some(first) = conflicts.into_iter().next() {
          return Ok(Some(first));
        }
        raw.insert(&tx)?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match conflict {
      Some(id) => Ok(Placement::Conflict(decode_uuid(&id)?)),
      None => Ok(Placement::Placed(record)),
    }
  }

  async fn release_hold(&self, hold_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(hold_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM occupancy WHERE id = ?1 AND source = 'internal_hold'",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn sweep_expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
    let now_str = encode_dt(now);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "DELETE FROM occupancy
           WHERE source = 'internal_hold' AND expires_at <= ?1
           RETURNING id",
        )?;
        let ids = stmt
          .query_map(rusqlite::params![now_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
      })
      .await?;

    if !ids.is_empty() {
      tracing::debug!(count = ids.len(), "deleted expired holds");
    }
    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn list_occupancy(&self, unit_id: Uuid) -> Result<Vec<OccupancyRecord>> {
    self
      .select_records("FROM occupancy WHERE unit_id = ?1 ORDER BY start_date, id", unit_id, None)
      .await
  }

  async fn export_records(
    &self,
    unit_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Vec<OccupancyRecord>> {
    self
      .select_records(
        "FROM occupancy
         WHERE unit_id = ?1
           AND source IN ('confirmed_booking', 'internal_hold')
           AND (expires_at IS NULL OR expires_at > ?2)
         ORDER BY start_date, id",
        unit_id,
        Some(now),
      )
      .await
  }

  // ── Reservations ──────────────────────────────────────────────────────────

  async fn open_reservation(
    &self,
    input: NewReservation,
    hold: NewHold,
  ) -> Result<Placement<Checkout>> {
    let reservation = Reservation {
      reservation_id:     Uuid::new_v4(),
      unit_id:            input.unit_id,
      guest_id:           input.guest_id,
      range:              input.range,
      guest_count:        input.guest_count,
      quote:              input.quote,
      status:             ReservationStatus::Pending,
      hold_token:         Some(hold.token.clone()),
      payment_session_id: None,
      payment_reference:  None,
      created_at:         hold.created_at,
      paid_at:            None,
    };
    let hold = NewHold {
      reservation_id: Some(reservation.reservation_id),
      ..hold
    };
    let record = hold_record(&hold);

    let raw_reservation = RawReservation::from_reservation(&reservation);
    let raw_hold = RawOccupancy::from_record(&record);
    let now_str = encode_dt(hold.created_at);

    let conflict: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let conflicts = live_conflicts(
          &tx,
          &raw_hold.unit_id,
          (&raw_hold.start_date, &raw_hold.end_date),
          None,
          &now_str,
        )?;
        if let Some(first) = conflicts.into_iter().next() {
          return Ok(Some(first));
        }
        raw_reservation.insert(&tx)?;
        raw_hold.insert(&tx)?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match conflict {
      Some(id) => Ok(Placement::Conflict(decode_uuid(&id)?)),
      None => Ok(Placement::Placed(Checkout { reservation, hold: record })),
    }
  }

  async fn attach_payment_session(
    &self,
    reservation_id: Uuid,
    session_id: String,
  ) -> Result<SessionAttachment> {
    let id_str = encode_uuid(reservation_id);
    let session = session_id.clone();

    // Inner `Err` flags a session id already used by another reservation.
    let outcome: std::result::Result<(usize, Option<RawReservation>), ()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = match tx.execute(
          "UPDATE reservations SET payment_session_id = ?2
           WHERE reservation_id = ?1 AND status = 'pending'",
          rusqlite::params![id_str, session],
        ) {
          Err(e) if is_unique_violation(&e) => return Ok(Err(())),
          other => other?,
        };
        let raw = reservation_where(&tx, "reservation_id = ?1", &id_str)?;
        tx.commit()?;
        Ok(Ok((updated, raw)))
      })
      .await?;

    match outcome {
      Ok((_, None)) => Ok(SessionAttachment::NotFound),
      Ok((0, Some(raw))) => Ok(SessionAttachment::NotPending(raw.into_reservation()?)),
      Ok((_, Some(raw))) => Ok(SessionAttachment::Attached(raw.into_reservation()?)),
      Err(()) => Err(Error::DuplicatePaymentSession(session_id)),
    }
  }

  async fn get_reservation(&self, reservation_id: Uuid) -> Result<Option<Reservation>> {
    let id_str = encode_uuid(reservation_id);

    let raw = self
      .conn
      .call(move |conn| Ok(reservation_where(conn, "reservation_id = ?1", &id_str)?))
      .await?;

    raw.map(RawReservation::into_reservation).transpose()
  }

  async fn list_reservations(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
    let status_str = query.status.map(|s| s.discriminant().to_owned());
    let unit_str = query.unit_id.map(encode_uuid);

    let raws: Vec<RawReservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RESERVATION_COLUMNS} FROM reservations
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR unit_id = ?2)
           ORDER BY created_at, reservation_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![status_str, unit_str], RawReservation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReservation::into_reservation).collect()
  }

  async fn finalize_payment(
    &self,
    session_id: String,
    payment_reference: String,
    now: DateTime<Utc>,
  ) -> Result<Finalization> {
    let now_str = encode_dt(now);
    let booking_id = Uuid::new_v4();
    let booking_id_str = encode_uuid(booking_id);

    enum Raw {
      NotFound,
      AlreadyPaid(RawReservation),
      Finalized {
        reservation: RawReservation,
        booking:     RawOccupancy,
        overlapping: Vec<String>,
      },
    }

    let raw: Raw = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock before the status read, so a racing
        // finalizer blocks here and then observes 'paid'.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = reservation_where(&tx, "payment_session_id = ?1", &session_id)?
        else {
          return Ok(Raw::NotFound);
        };
        if current.status == ReservationStatus::Paid.discriminant() {
          return Ok(Raw::AlreadyPaid(current));
        }

        tx.execute(
          "UPDATE reservations
           SET status = 'paid', payment_reference = ?2, paid_at = ?3
           WHERE reservation_id = ?1",
          rusqlite::params![current.reservation_id, payment_reference, now_str],
        )?;

        if let Some(token) = &current.hold_token {
          tx.execute(
            "DELETE FROM occupancy WHERE source = 'internal_hold' AND source_ref = ?1",
            rusqlite::params![token],
          )?;
        }

        let overlapping = live_conflicts(
          &tx,
          &current.unit_id,
          (&current.start_date, &current.end_date),
          Some(&current.reservation_id),
          &now_str,
        )?;

        let booking = RawOccupancy {
          id:             booking_id_str,
          unit_id:        current.unit_id.clone(),
          start_date:     current.start_date.clone(),
          end_date:       current.end_date.clone(),
          source:         OccupancySource::ConfirmedBooking.discriminant().to_owned(),
          source_ref:     Some(current.reservation_id.clone()),
          reservation_id: Some(current.reservation_id.clone()),
          created_at:     now_str,
          expires_at:     None,
        };
        booking.insert(&tx)?;

        let reservation = reservation_where(&tx, "reservation_id = ?1", &current.reservation_id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;

        Ok(Raw::Finalized { reservation, booking, overlapping })
      })
      .await?;

    Ok(match raw {
      Raw::NotFound => Finalization::NotFound,
      Raw::AlreadyPaid(r) => Finalization::AlreadyPaid(r.into_reservation()?),
      Raw::Finalized { reservation, booking, overlapping } => Finalization::Finalized {
        reservation: reservation.into_reservation()?,
        booking:     booking.into_record()?,
        overlapping: overlapping.iter().map(|s| decode_uuid(s)).collect::<Result<_>>()?,
      },
    })
  }

  // ── Invoices ──────────────────────────────────────────────────────────────

  async fn issue_invoice(
    &self,
    reservation_id: Uuid,
    prefix: String,
    now: DateTime<Utc>,
  ) -> Result<InvoiceOutcome> {
    let invoice_id = Uuid::new_v4();
    let invoice_id_str = encode_uuid(invoice_id);
    let reservation_str = encode_uuid(reservation_id);
    let now_str = encode_dt(now);
    let year = now.year();

    let number: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let counter: i64 = tx.query_row(
          "INSERT INTO invoice_counters (year, counter) VALUES (?1, 1)
           ON CONFLICT (year) DO UPDATE SET counter = counter + 1
           RETURNING counter",
          rusqlite::params![year],
          |row| row.get(0),
        )?;
        let number = format!("{prefix}-{year}-{counter:06}");

        let inserted = tx.execute(
          "INSERT INTO invoices (invoice_id, reservation_id, number, issued_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![invoice_id_str, reservation_str, number, now_str],
        );
        match inserted {
          // Dropping `tx` rolls the counter increment back too.
          Err(e) if is_unique_violation(&e) => return Ok(None),
          other => other?,
        };
        tx.commit()?;
        Ok(Some(number))
      })
      .await?;

    Ok(match number {
      Some(number) => InvoiceOutcome::Issued(Invoice {
        invoice_id,
        reservation_id,
        number,
        issued_at: now,
      }),
      None => InvoiceOutcome::AlreadyIssued,
    })
  }

  async fn get_invoice(&self, reservation_id: Uuid) -> Result<Option<Invoice>> {
    let id_str = encode_uuid(reservation_id);

    let raw: Option<RawInvoice> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT invoice_id, reservation_id, number, issued_at
             FROM invoices WHERE reservation_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawInvoice {
                invoice_id:     row.get(0)?,
                reservation_id: row.get(1)?,
                number:         row.get(2)?,
                issued_at:      row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawInvoice::into_invoice).transpose()
  }

  // ── External calendars ────────────────────────────────────────────────────

  async fn replace_imported(
    &self,
    unit_id: Uuid,
    feed_urls: Vec<String>,
    intervals: Vec<ImportedInterval>,
    now: DateTime<Utc>,
  ) -> Result<usize> {
    let unit_str = encode_uuid(unit_id);
    let now_str = encode_dt(now);
    let rows: Vec<RawOccupancy> = intervals
      .into_iter()
      .map(|ev| {
        RawOccupancy::from_record(&OccupancyRecord {
          id:             Uuid::new_v4(),
          unit_id,
          range:          ev.range,
          source:         OccupancySource::ExternalImport,
          source_ref:     ev.uid,
          reservation_id: None,
          created_at:     now,
          expires_at:     None,
        })
      })
      .collect();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "DELETE FROM occupancy WHERE unit_id = ?1 AND source = 'external_import'",
          rusqlite::params![unit_str],
        )?;
        for row in &rows {
          row.insert(&tx)?;
        }
        for url in &feed_urls {
          tx.execute(
            "UPDATE feed_subscriptions SET last_synced_at = ?3
             WHERE unit_id = ?1 AND import_url = ?2",
            rusqlite::params![unit_str, url, now_str],
          )?;
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    Ok(inserted)
  }

  async fn add_subscription(
    &self,
    input: NewFeedSubscription,
    export_token: String,
  ) -> Result<FeedSubscription> {
    let subscription = FeedSubscription {
      subscription_id: Uuid::new_v4(),
      unit_id: input.unit_id,
      import_url: input.import_url,
      export_token,
      last_synced_at: None,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(subscription.subscription_id);
    let unit_str = encode_uuid(subscription.unit_id);
    let url = subscription.import_url.clone();
    let token = subscription.export_token.clone();
    let at_str = encode_dt(subscription.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO feed_subscriptions ({SUBSCRIPTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, NULL, ?5)"
          ),
          rusqlite::params![id_str, unit_str, url, token, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(subscription)
  }

  async fn list_subscriptions(&self) -> Result<Vec<FeedSubscription>> {
    let raws: Vec<RawSubscription> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBSCRIPTION_COLUMNS} FROM feed_subscriptions
           ORDER BY created_at, subscription_id"
        ))?;
        let rows = stmt
          .query_map([], RawSubscription::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscription::into_subscription).collect()
  }

  async fn subscription_by_token(&self, token: &str) -> Result<Option<FeedSubscription>> {
    let token = token.to_owned();

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {SUBSCRIPTION_COLUMNS} FROM feed_subscriptions WHERE export_token = ?1"
            ),
            rusqlite::params![token],
            RawSubscription::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubscription::into_subscription).transpose()
  }
}
