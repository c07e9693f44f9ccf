//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use gite_core::{
  DateRange,
  feed::NewFeedSubscription,
  occupancy::{ImportedInterval, NewHold, OccupancySource},
  pricing::Quote,
  reservation::{NewReservation, ReservationQuery, ReservationStatus},
  store::{
    AvailabilityStore, Checkout, Finalization, InvoiceOutcome, Placement, SessionAttachment,
  },
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

const HOLD_TTL: std::time::Duration = std::time::Duration::from_secs(15 * 60);

fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() }

fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
  let d = |(y, m, day): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, day).unwrap();
  DateRange::new(d(start), d(end)).unwrap()
}

fn hold(unit: Uuid, r: DateRange) -> NewHold {
  NewHold::new(unit, r, now(), HOLD_TTL).unwrap()
}

fn reservation(unit: Uuid, r: DateRange) -> NewReservation {
  NewReservation {
    unit_id:     unit,
    guest_id:    "guest-1".into(),
    range:       r,
    guest_count: 2,
    quote:       Quote { nights: r.nights(), total_cents: 10_000, ..Quote::default() },
  }
}

async fn checkout(s: &SqliteStore, unit: Uuid, r: DateRange, session: &str) -> Checkout {
  let Placement::Placed(c) = s.open_reservation(reservation(unit, r), hold(unit, r)).await.unwrap()
  else {
    panic!("expected placement")
  };
  let attached = s
    .attach_payment_session(c.reservation.reservation_id, session.into())
    .await
    .unwrap();
  assert!(matches!(attached, SessionAttachment::Attached(_)));
  c
}

// ─── Holds and conflicts ─────────────────────────────────────────────────────

#[tokio::test]
async fn hold_blocks_overlapping_hold() {
  let s = store().await;
  let unit = Uuid::new_v4();

  let Placement::Placed(first) =
    s.place_hold(hold(unit, range((2025, 8, 1), (2025, 8, 3)))).await.unwrap()
  else {
    panic!("first hold should be placed")
  };
  assert_eq!(first.source, OccupancySource::InternalHold);
  assert!(first.source_ref.as_deref().unwrap().starts_with("hold-"));

  let second = s.place_hold(hold(unit, range((2025, 8, 2), (2025, 8, 4)))).await.unwrap();
  assert_eq!(second, Placement::Conflict(first.id));

  // Other units are independent.
  let other = s
    .place_hold(hold(Uuid::new_v4(), range((2025, 8, 2), (2025, 8, 4))))
    .await
    .unwrap();
  assert!(matches!(other, Placement::Placed(_)));
}

#[tokio::test]
async fn adjacent_intervals_do_not_conflict() {
  let s = store().await;
  let unit = Uuid::new_v4();
  s.place_hold(hold(unit, range((2025, 7, 10), (2025, 7, 15)))).await.unwrap();

  let before = s
    .find_conflicts(unit, range((2025, 7, 5), (2025, 7, 10)), None, now())
    .await
    .unwrap();
  let inside = s
    .find_conflicts(unit, range((2025, 7, 12), (2025, 7, 20)), None, now())
    .await
    .unwrap();
  let after = s
    .find_conflicts(unit, range((2025, 7, 15), (2025, 7, 20)), None, now())
    .await
    .unwrap();

  assert!(before.is_empty());
  assert_eq!(inside.len(), 1);
  assert!(after.is_empty());
}

#[tokio::test]
async fn expired_hold_stops_blocking_before_sweep() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let r = range((2025, 8, 1), (2025, 8, 3));
  let Placement::Placed(h) = s.place_hold(hold(unit, r)).await.unwrap() else {
    panic!("hold should be placed")
  };

  let later = now() + Duration::minutes(15);
  assert_eq!(s.find_conflicts(unit, r, None, now()).await.unwrap(), vec![h.id]);
  assert!(s.find_conflicts(unit, r, None, later).await.unwrap().is_empty());
  assert!(s.export_records(unit, later).await.unwrap().is_empty());

  // Still physically present until swept.
  assert_eq!(s.list_occupancy(unit).await.unwrap().len(), 1);
  assert!(s.sweep_expired_holds(now()).await.unwrap().is_empty());
  assert_eq!(s.sweep_expired_holds(later).await.unwrap(), vec![h.id]);
  assert!(s.list_occupancy(unit).await.unwrap().is_empty());
}

#[tokio::test]
async fn release_hold_is_idempotent() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let r = range((2025, 8, 1), (2025, 8, 3));
  let Placement::Placed(h) = s.place_hold(hold(unit, r)).await.unwrap() else {
    panic!("hold should be placed")
  };

  assert!(s.release_hold(h.id).await.unwrap());
  assert!(!s.release_hold(h.id).await.unwrap());
  assert!(s.find_conflicts(unit, r, None, now()).await.unwrap().is_empty());
}

#[tokio::test]
async fn release_hold_never_deletes_other_sources() {
  let s = store().await;
  let unit = Uuid::new_v4();
  s.replace_imported(
    unit,
    vec![],
    vec![ImportedInterval { range: range((2025, 9, 1), (2025, 9, 5)), uid: None }],
    now(),
  )
  .await
  .unwrap();
  let imported = s.list_occupancy(unit).await.unwrap().remove(0);

  assert!(!s.release_hold(imported.id).await.unwrap());
  assert_eq!(s.list_occupancy(unit).await.unwrap().len(), 1);
}

// ─── Reservations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn open_reservation_links_pending_reservation_and_hold() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let r = range((2025, 7, 10), (2025, 7, 15));

  let c = checkout(&s, unit, r, "cs_1").await;
  assert_eq!(c.reservation.status, ReservationStatus::Pending);
  assert_eq!(c.hold.reservation_id, Some(c.reservation.reservation_id));
  assert_eq!(c.reservation.hold_token, c.hold.source_ref);

  let fetched = s.get_reservation(c.reservation.reservation_id).await.unwrap().unwrap();
  assert_eq!(fetched.payment_session_id.as_deref(), Some("cs_1"));
  assert_eq!(fetched.quote.nights, 5);

  // The reservation does not conflict with its own hold.
  let own = s
    .find_conflicts(unit, r, Some(c.reservation.reservation_id), now())
    .await
    .unwrap();
  assert!(own.is_empty());
}

#[tokio::test]
async fn conflicting_checkout_writes_nothing() {
  let s = store().await;
  let unit = Uuid::new_v4();
  checkout(&s, unit, range((2025, 7, 10), (2025, 7, 15)), "cs_1").await;

  let r = range((2025, 7, 14), (2025, 7, 16));
  let outcome = s.open_reservation(reservation(unit, r), hold(unit, r)).await.unwrap();
  assert!(matches!(outcome, Placement::Conflict(_)));

  let all = s.list_reservations(ReservationQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(s.list_occupancy(unit).await.unwrap().len(), 1);
}

#[tokio::test]
async fn payment_session_is_unique() {
  let s = store().await;
  let unit = Uuid::new_v4();
  checkout(&s, unit, range((2025, 7, 1), (2025, 7, 3)), "cs_dup").await;

  let r = range((2025, 7, 5), (2025, 7, 7));
  let Placement::Placed(c) = s.open_reservation(reservation(unit, r), hold(unit, r)).await.unwrap()
  else {
    panic!("expected placement")
  };
  let err = s
    .attach_payment_session(c.reservation.reservation_id, "cs_dup".into())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicatePaymentSession(_)));

  let missing = s.attach_payment_session(Uuid::new_v4(), "cs_x".into()).await.unwrap();
  assert_eq!(missing, SessionAttachment::NotFound);
}

#[tokio::test]
async fn session_is_not_attached_after_payment() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let c = checkout(&s, unit, range((2025, 7, 1), (2025, 7, 3)), "cs_1").await;
  let id = c.reservation.reservation_id;
  s.finalize_payment("cs_1".into(), "pi_1".into(), now()).await.unwrap();

  let outcome = s.attach_payment_session(id, "cs_2".into()).await.unwrap();
  let SessionAttachment::NotPending(reservation) = outcome else {
    panic!("expected NotPending, got {outcome:?}")
  };
  assert_eq!(reservation.status, ReservationStatus::Paid);
  assert_eq!(reservation.payment_session_id.as_deref(), Some("cs_1"));
}

#[tokio::test]
async fn list_reservations_filters() {
  let s = store().await;
  let unit_a = Uuid::new_v4();
  let unit_b = Uuid::new_v4();
  checkout(&s, unit_a, range((2025, 7, 1), (2025, 7, 3)), "cs_a").await;
  checkout(&s, unit_b, range((2025, 7, 1), (2025, 7, 3)), "cs_b").await;
  s.finalize_payment("cs_b".into(), "pi_b".into(), now()).await.unwrap();

  let paid = s
    .list_reservations(ReservationQuery { status: Some(ReservationStatus::Paid), unit_id: None })
    .await
    .unwrap();
  assert_eq!(paid.len(), 1);
  assert_eq!(paid[0].unit_id, unit_b);

  let on_a = s
    .list_reservations(ReservationQuery { status: None, unit_id: Some(unit_a) })
    .await
    .unwrap();
  assert_eq!(on_a.len(), 1);
  assert_eq!(on_a[0].status, ReservationStatus::Pending);
}

// ─── Finalization ────────────────────────────────────────────────────────────

#[tokio::test]
async fn finalize_unknown_session_is_not_found() {
  let s = store().await;
  let outcome = s.finalize_payment("cs_nope".into(), "pi".into(), now()).await.unwrap();
  assert_eq!(outcome, Finalization::NotFound);
}

#[tokio::test]
async fn finalize_swaps_hold_for_confirmed_booking() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let r = range((2025, 7, 10), (2025, 7, 15));
  let c = checkout(&s, unit, r, "cs_1").await;

  let Finalization::Finalized { reservation, booking, overlapping } =
    s.finalize_payment("cs_1".into(), "pi_1".into(), now()).await.unwrap()
  else {
    panic!("expected first finalization")
  };
  assert_eq!(reservation.status, ReservationStatus::Paid);
  assert_eq!(reservation.payment_reference.as_deref(), Some("pi_1"));
  assert_eq!(reservation.paid_at, Some(now()));
  assert_eq!(booking.source, OccupancySource::ConfirmedBooking);
  assert_eq!(booking.reservation_id, Some(c.reservation.reservation_id));
  assert!(overlapping.is_empty());

  let records = s.list_occupancy(unit).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].id, booking.id);

  // Confirmed bookings never expire.
  let far = now() + Duration::days(30);
  assert_eq!(s.find_conflicts(unit, r, None, far).await.unwrap(), vec![booking.id]);
}

#[tokio::test]
async fn finalize_twice_is_idempotent() {
  let s = store().await;
  let unit = Uuid::new_v4();
  checkout(&s, unit, range((2025, 7, 10), (2025, 7, 15)), "cs_1").await;

  s.finalize_payment("cs_1".into(), "pi_1".into(), now()).await.unwrap();
  let again = s.finalize_payment("cs_1".into(), "pi_1".into(), now()).await.unwrap();
  let Finalization::AlreadyPaid(r) = again else {
    panic!("expected already paid, got {again:?}")
  };
  assert_eq!(r.status, ReservationStatus::Paid);
  assert_eq!(s.list_occupancy(unit).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_finalize_has_one_winner() {
  let s = store().await;
  let unit = Uuid::new_v4();
  checkout(&s, unit, range((2025, 7, 10), (2025, 7, 15)), "cs_1").await;

  let (a, b) = tokio::join!(
    s.finalize_payment("cs_1".into(), "pi_1".into(), now()),
    s.finalize_payment("cs_1".into(), "pi_1".into(), now()),
  );
  let outcomes = [a.unwrap(), b.unwrap()];
  let winners = outcomes
    .iter()
    .filter(|o| matches!(o, Finalization::Finalized { .. }))
    .count();
  let repeats = outcomes
    .iter()
    .filter(|o| matches!(o, Finalization::AlreadyPaid(_)))
    .count();
  assert_eq!((winners, repeats), (1, 1));
  assert_eq!(s.list_occupancy(unit).await.unwrap().len(), 1);
}

#[tokio::test]
async fn finalize_after_hold_expiry_reports_overlap() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let r = range((2025, 7, 10), (2025, 7, 15));
  checkout(&s, unit, r, "cs_slow").await;

  // The hold lapses and someone else takes the dates.
  let later = now() + Duration::minutes(20);
  let Placement::Placed(other) = s
    .place_hold(NewHold::new(unit, r, later, HOLD_TTL).unwrap())
    .await
    .unwrap()
  else {
    panic!("lapsed hold should not block")
  };

  let Finalization::Finalized { overlapping, .. } =
    s.finalize_payment("cs_slow".into(), "pi".into(), later).await.unwrap()
  else {
    panic!("payment must still be recorded")
  };
  assert_eq!(overlapping, vec![other.id]);
}

// ─── Invoices ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invoice_issued_once_per_reservation() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let a = checkout(&s, unit, range((2025, 7, 1), (2025, 7, 3)), "cs_a").await;
  let b = checkout(&s, unit, range((2025, 7, 5), (2025, 7, 7)), "cs_b").await;
  let a_id = a.reservation.reservation_id;
  let b_id = b.reservation.reservation_id;

  let InvoiceOutcome::Issued(first) = s.issue_invoice(a_id, "GC".into(), now()).await.unwrap()
  else {
    panic!("expected issued")
  };
  assert_eq!(first.number, "GC-2025-000001");

  let dup = s.issue_invoice(a_id, "GC".into(), now()).await.unwrap();
  assert_eq!(dup, InvoiceOutcome::AlreadyIssued);

  // The duplicate attempt did not consume a number.
  let InvoiceOutcome::Issued(second) = s.issue_invoice(b_id, "GC".into(), now()).await.unwrap()
  else {
    panic!("expected issued")
  };
  assert_eq!(second.number, "GC-2025-000002");

  assert_eq!(s.get_invoice(a_id).await.unwrap(), Some(first));
  assert_eq!(s.get_invoice(Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
async fn invoice_numbers_restart_each_year() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let a = checkout(&s, unit, range((2025, 7, 1), (2025, 7, 3)), "cs_a").await;
  let b = checkout(&s, unit, range((2025, 7, 5), (2025, 7, 7)), "cs_b").await;

  s.issue_invoice(a.reservation.reservation_id, "GC".into(), now()).await.unwrap();
  let next_year = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
  let InvoiceOutcome::Issued(inv) = s
    .issue_invoice(b.reservation.reservation_id, "GC".into(), next_year)
    .await
    .unwrap()
  else {
    panic!("expected issued")
  };
  assert_eq!(inv.number, "GC-2026-000001");
}

// ─── External calendars ──────────────────────────────────────────────────────

#[tokio::test]
async fn replace_imported_is_replace_all() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let e1 = range((2025, 7, 1), (2025, 7, 4));
  let e2 = range((2025, 7, 10), (2025, 7, 12));
  let e3 = range((2025, 7, 20), (2025, 7, 25));
  let ev = |r: DateRange, uid: &str| ImportedInterval { range: r, uid: Some(uid.into()) };

  s.replace_imported(unit, vec![], vec![ev(e1, "e1"), ev(e2, "e2")], now()).await.unwrap();
  let placed = s.place_hold(hold(unit, range((2025, 8, 1), (2025, 8, 2)))).await.unwrap();
  assert!(matches!(placed, Placement::Placed(_)));

  let n = s.replace_imported(unit, vec![], vec![ev(e3, "e3")], now()).await.unwrap();
  assert_eq!(n, 1);

  assert!(s.find_conflicts(unit, e1, None, now()).await.unwrap().is_empty());
  assert!(s.find_conflicts(unit, e2, None, now()).await.unwrap().is_empty());
  assert_eq!(s.find_conflicts(unit, e3, None, now()).await.unwrap().len(), 1);

  // The hold survives an import.
  let sources: Vec<_> = s.list_occupancy(unit).await.unwrap().into_iter().map(|r| r.source).collect();
  assert_eq!(sources, vec![OccupancySource::ExternalImport, OccupancySource::InternalHold]);
}

#[tokio::test]
async fn export_records_skip_imports() {
  let s = store().await;
  let unit = Uuid::new_v4();
  s.replace_imported(
    unit,
    vec![],
    vec![ImportedInterval { range: range((2025, 7, 1), (2025, 7, 4)), uid: None }],
    now(),
  )
  .await
  .unwrap();
  checkout(&s, unit, range((2025, 7, 10), (2025, 7, 15)), "cs_1").await;
  checkout(&s, unit, range((2025, 7, 20), (2025, 7, 22)), "cs_2").await;
  s.finalize_payment("cs_1".into(), "pi".into(), now()).await.unwrap();

  let exported = s.export_records(unit, now()).await.unwrap();
  let sources: Vec<_> = exported.iter().map(|r| r.source).collect();
  assert_eq!(sources, vec![OccupancySource::ConfirmedBooking, OccupancySource::InternalHold]);
}

#[tokio::test]
async fn subscriptions_round_trip_and_sync_stamp() {
  let s = store().await;
  let unit = Uuid::new_v4();
  let url = "https://example.com/feed.ics".to_string();

  let sub = s
    .add_subscription(
      NewFeedSubscription { unit_id: unit, import_url: Some(url.clone()) },
      "tok-1".into(),
    )
    .await
    .unwrap();
  s.add_subscription(NewFeedSubscription { unit_id: unit, import_url: None }, "tok-2".into())
    .await
    .unwrap();

  assert_eq!(s.list_subscriptions().await.unwrap().len(), 2);
  let found = s.subscription_by_token("tok-1").await.unwrap().unwrap();
  assert_eq!(found.subscription_id, sub.subscription_id);
  assert!(found.last_synced_at.is_none());
  assert!(s.subscription_by_token("nope").await.unwrap().is_none());

  s.replace_imported(unit, vec![url], vec![], now()).await.unwrap();
  let synced = s.subscription_by_token("tok-1").await.unwrap().unwrap();
  assert_eq!(synced.last_synced_at, Some(now()));
  let untouched = s.subscription_by_token("tok-2").await.unwrap().unwrap();
  assert!(untouched.last_synced_at.is_none());
}
