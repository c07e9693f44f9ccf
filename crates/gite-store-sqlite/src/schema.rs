//! SQL schema for the Gîte SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Dates are `YYYY-MM-DD` and timestamps fixed-width RFC 3339 UTC, so both
/// compare correctly as text.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS reservations (
    reservation_id     TEXT PRIMARY KEY,
    unit_id            TEXT NOT NULL,
    guest_id           TEXT NOT NULL,
    start_date         TEXT NOT NULL,
    end_date           TEXT NOT NULL,
    guest_count        INTEGER NOT NULL CHECK (guest_count > 0),
    nights             INTEGER NOT NULL,
    base_cents         INTEGER NOT NULL,
    cleaning_cents     INTEGER NOT NULL,
    subtotal_cents     INTEGER NOT NULL,
    tourist_tax_cents  INTEGER NOT NULL,
    total_cents        INTEGER NOT NULL,
    status             TEXT NOT NULL DEFAULT 'pending', -- 'pending' | 'paid' | 'cancelled'
    hold_token         TEXT,
    payment_session_id TEXT UNIQUE,
    payment_reference  TEXT,
    created_at         TEXT NOT NULL,
    paid_at            TEXT,
    CHECK (start_date < end_date)
);

-- One row per reason a unit is unavailable. Overlap is checked before each
-- new commitment is written, never enforced retroactively.
CREATE TABLE IF NOT EXISTS occupancy (
    id             TEXT PRIMARY KEY,
    unit_id        TEXT NOT NULL,
    start_date     TEXT NOT NULL,
    end_date       TEXT NOT NULL,
    source         TEXT NOT NULL,  -- 'confirmed_booking' | 'internal_hold' | 'external_import'
    source_ref     TEXT,
    reservation_id TEXT REFERENCES reservations(reservation_id),
    created_at     TEXT NOT NULL,
    expires_at     TEXT,           -- holds only
    CHECK (start_date < end_date)
);

CREATE TABLE IF NOT EXISTS feed_subscriptions (
    subscription_id TEXT PRIMARY KEY,
    unit_id         TEXT NOT NULL,
    import_url      TEXT,
    export_token    TEXT NOT NULL UNIQUE,
    last_synced_at  TEXT,
    created_at      TEXT NOT NULL
);

-- At most one invoice per reservation; a second insert is the signal that
-- the side effect already ran.
CREATE TABLE IF NOT EXISTS invoices (
    invoice_id     TEXT PRIMARY KEY,
    reservation_id TEXT NOT NULL UNIQUE REFERENCES reservations(reservation_id),
    number         TEXT NOT NULL UNIQUE,
    issued_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS invoice_counters (
    year    INTEGER PRIMARY KEY,
    counter INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS occupancy_unit_idx
    ON occupancy(unit_id, start_date);
CREATE INDEX IF NOT EXISTS occupancy_expiry_idx
    ON occupancy(expires_at) WHERE source = 'internal_hold';
CREATE UNIQUE INDEX IF NOT EXISTS occupancy_hold_token_idx
    ON occupancy(source_ref) WHERE source = 'internal_hold';
CREATE INDEX IF NOT EXISTS reservations_status_idx
    ON reservations(status, created_at);

PRAGMA user_version = 1;
";
