//! HTTP front end for the Gîte availability subsystem.
//!
//! Composes the public booking API, the authenticated back-office API and the
//! per-token calendar export into one axum [`Router`].

pub mod auth;
pub mod error;
pub mod etag;
pub mod ical;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware, routing::get};
use gite_booking::{BookingService, ExportOptions, Settings};
use gite_core::{pricing::UnitRate, store::AvailabilityStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `GITE_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub base_url:            String,
  pub store_path:          PathBuf,
  pub auth_username:       String,
  pub auth_password_hash:  String,
  pub hold_ttl_secs:       u64,
  pub hold_timer:          bool,
  pub sweep_interval_secs: u64,
  /// Re-import every subscribed feed this often; unset disables it.
  pub sync_interval_secs:  Option<u64>,
  pub feed_timeout_secs:   u64,
  pub calendar_name:       String,
  pub uid_domain:          String,
  pub invoice_prefix:      String,
  pub tourist_tax_percent: f64,
  pub units:               Vec<UnitRate>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let export = ExportOptions::default();
    Self {
      host:                "127.0.0.1".to_string(),
      port:                8080,
      base_url:            "http://localhost:8080".to_string(),
      store_path:          PathBuf::from("gite.sqlite3"),
      auth_username:       "admin".to_string(),
      auth_password_hash:  String::new(),
      hold_ttl_secs:       15 * 60,
      hold_timer:          true,
      sweep_interval_secs: 60,
      sync_interval_secs:  None,
      feed_timeout_secs:   30,
      calendar_name:       export.calendar_name,
      uid_domain:          export.uid_domain,
      invoice_prefix:      "GC".to_string(),
      tourist_tax_percent: 2.5,
      units:               Vec::new(),
    }
  }
}

impl ServerConfig {
  /// The [`BookingService`] tunables this configuration describes.
  pub fn booking_settings(&self) -> Settings {
    Settings {
      hold_ttl:            Duration::from_secs(self.hold_ttl_secs),
      hold_timer:          self.hold_timer,
      feed_timeout:        Duration::from_secs(self.feed_timeout_secs),
      invoice_prefix:      self.invoice_prefix.clone(),
      tourist_tax_percent: self.tourist_tax_percent,
      rates:               self.units.clone(),
      export:              ExportOptions {
        calendar_name: self.calendar_name.clone(),
        uid_domain:    self.uid_domain.clone(),
        ..ExportOptions::default()
      },
    }
  }

  pub fn auth_config(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the server's own handlers.
pub struct AppState<S> {
  pub service: BookingService<S>,
  pub auth:    Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      service: self.service.clone(),
      auth:    Arc::clone(&self.auth),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete axum [`Router`]:
///
/// - `/api/...` booking flow and payment webhook
/// - `/api/admin/...` back-office, behind Basic auth
/// - `/ical/{token}` public calendar export
pub fn router<S>(state: AppState<S>) -> Router
where
  S: AvailabilityStore + 'static,
{
  let admin = gite_api::admin_router(state.service.clone()).route_layer(
    middleware::from_fn_with_state(state.auth.clone(), auth::require_admin),
  );

  Router::new()
    .route("/ical/{token}", get(ical::export::<S>))
    .with_state(state.clone())
    .nest("/api/admin", admin)
    .nest("/api", gite_api::api_router(state.service))
    .layer(TraceLayer::new_for_http())
}
