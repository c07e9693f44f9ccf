//! Domain types of the Gîte availability subsystem: date ranges, occupancy
//! records, reservations, feed subscriptions, pricing, the error taxonomy and
//! the [`store::AvailabilityStore`] trait.
//!
//! No HTTP or database code lives here; every other crate builds on it.

// Store futures are declared `Send` explicitly in the trait signatures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod feed;
pub mod occupancy;
pub mod pricing;
pub mod range;
pub mod reservation;
pub mod store;

pub use error::{Error, Result};
pub use range::DateRange;
