//! JSON REST API for the Gîte availability subsystem.
//!
//! Exposes axum [`Router`]s backed by a [`BookingService`] over any
//! [`AvailabilityStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility; [`admin_router`] in particular must be mounted behind
//! authentication.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gite_api::api_router(service.clone()))
//! .nest("/api/admin", gite_api::admin_router(service).layer(auth))
//! ```

pub mod admin;
pub mod availability;
pub mod checkout;
pub mod error;
pub mod holds;
pub mod payments;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use gite_booking::BookingService;
use gite_core::store::AvailabilityStore;

pub use error::ApiError;

/// Routes used by the booking pages and the payment provider.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: BookingService<S>) -> Router<()>
where
  S: AvailabilityStore + 'static,
{
  Router::new()
    .route("/availability", get(availability::check::<S>))
    // Holds
    .route("/holds", post(holds::create::<S>))
    .route("/holds/{id}", delete(holds::release::<S>))
    // Checkout
    .route("/checkout", post(checkout::begin::<S>))
    .route("/reservations/{id}", get(checkout::get_one::<S>))
    .route("/reservations/{id}/payment-session", put(checkout::attach_session::<S>))
    // Webhooks
    .route("/payments/completed", post(payments::completed::<S>))
    .with_state(service)
}

/// Back-office routes: feed subscriptions, imports, and read-only views.
pub fn admin_router<S>(service: BookingService<S>) -> Router<()>
where
  S: AvailabilityStore + 'static,
{
  Router::new()
    .route("/feeds", get(admin::list_feeds::<S>).post(admin::add_feed::<S>))
    .route("/feeds/sync", post(admin::sync_feed::<S>))
    .route("/feeds/sync-all", post(admin::sync_all::<S>))
    .route("/units/{id}/sync", post(admin::sync_unit::<S>))
    .route("/units/{id}/occupancy", get(admin::occupancy::<S>))
    .route("/holds/sweep", post(admin::sweep::<S>))
    .route("/reservations", get(admin::list_reservations::<S>))
    .with_state(service)
}
