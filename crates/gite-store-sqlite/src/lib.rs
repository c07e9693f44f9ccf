//! SQLite backend for the Gîte interval store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-statement write runs in an
//! `IMMEDIATE` transaction, so the write lock is taken before the first read
//! and concurrent writers (in this or another process) serialize on it.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
