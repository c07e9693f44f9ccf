//! The Gîte availability and booking-lock subsystem.
//!
//! [`BookingService`] ties an [`AvailabilityStore`] to the rules around it:
//! overlap checks, expiring checkout holds, idempotent payment finalization,
//! and calendar feed import/export. The service keeps no availability state
//! of its own; every answer comes from the store.
//!
//! Operations are split by concern across the submodules, each adding an
//! `impl` block to [`BookingService`].

mod checker;
mod checkout;
mod export;
mod feeds;
mod finalize;
mod holds;
mod import;
mod sweeper;

use std::{sync::Arc, time::Duration};

pub use checkout::NewCheckout;
pub use finalize::FinalizeOutcome;
pub use gite_core::{Error, Result};
use gite_core::{pricing::UnitRate, store::AvailabilityStore};
pub use gite_ical::ExportOptions;
pub use import::{ImportReport, UnitSync};
use uuid::Uuid;

// ─── Settings ────────────────────────────────────────────────────────────────

/// Tunables for [`BookingService`].
#[derive(Debug, Clone)]
pub struct Settings {
  /// Lifetime of a checkout hold.
  pub hold_ttl:            Duration,
  /// Also release holds from an in-process timer at `hold_ttl`. The persisted
  /// expiry plus the sweeper remain the source of truth either way.
  pub hold_timer:          bool,
  /// Overall timeout for fetching one remote calendar.
  pub feed_timeout:        Duration,
  pub invoice_prefix:      String,
  pub tourist_tax_percent: f64,
  /// Rate cards of every bookable unit.
  pub rates:               Vec<UnitRate>,
  pub export:              ExportOptions,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      hold_ttl:            Duration::from_secs(15 * 60),
      hold_timer:          true,
      feed_timeout:        Duration::from_secs(30),
      invoice_prefix:      "GC".to_string(),
      tourist_tax_percent: 2.5,
      rates:               Vec::new(),
      export:              ExportOptions::default(),
    }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Entry point of the subsystem, generic over the storage backend.
///
/// Cheap to clone: the store and settings are reference-counted.
pub struct BookingService<S> {
  store:    Arc<S>,
  http:     reqwest::Client,
  settings: Arc<Settings>,
}

impl<S> Clone for BookingService<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      http:     self.http.clone(),
      settings: Arc::clone(&self.settings),
    }
  }
}

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Fails with [`Error::InvalidTtl`] if the default hold lifetime is zero
  /// or too large to express as a timestamp offset.
  pub fn new(store: S, settings: Settings) -> Result<Self> {
    if settings.hold_ttl.is_zero() || chrono::Duration::from_std(settings.hold_ttl).is_err() {
      return Err(Error::InvalidTtl(settings.hold_ttl));
    }
    let http = reqwest::Client::builder()
      .timeout(settings.feed_timeout)
      .user_agent(concat!("gite-calendar-sync/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(Error::storage)?;
    Ok(Self {
      store: Arc::new(store),
      http,
      settings: Arc::new(settings),
    })
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn settings(&self) -> &Settings { &self.settings }

  fn rate(&self, unit_id: Uuid) -> Result<&UnitRate> {
    self
      .settings
      .rates
      .iter()
      .find(|r| r.id == unit_id)
      .ok_or(Error::UnknownUnit(unit_id))
  }
}
