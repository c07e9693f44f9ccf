//! Half-open date ranges, the unit of occupancy.
//!
//! A stay from the 10th to the 15th occupies the nights of the 10th through
//! the 14th; the 15th is free for the next arrival.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A validated half-open interval `[start, end)` of calendar dates.
///
/// Always spans at least one night: `start < end` holds for every value.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(try_from = "UncheckedRange")]
pub struct DateRange {
  start: NaiveDate,
  end:   NaiveDate,
}

#[derive(Deserialize)]
struct UncheckedRange {
  start: NaiveDate,
  end:   NaiveDate,
}

impl TryFrom<UncheckedRange> for DateRange {
  type Error = Error;

  fn try_from(raw: UncheckedRange) -> Result<Self> {
    Self::new(raw.start, raw.end)
  }
}

impl DateRange {
  /// Build a range, rejecting empty and inverted intervals.
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if start >= end {
      return Err(Error::InvalidInterval { start, end });
    }
    Ok(Self { start, end })
  }

  pub fn start(&self) -> NaiveDate { self.start }

  pub fn end(&self) -> NaiveDate { self.end }

  /// Number of nights covered.
  pub fn nights(&self) -> u32 {
    (self.end - self.start).num_days() as u32
  }

  /// Two half-open ranges overlap iff each starts before the other ends.
  /// Ranges that merely touch (`a.end == b.start`) do not overlap.
  pub fn overlaps(&self, other: &DateRange) -> bool {
    self.start < other.end && other.start < self.end
  }
}

impl std::fmt::Display for DateRange {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}, {})", self.start, self.end)
  }
}
