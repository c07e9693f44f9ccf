//! External calendar importer.
//!
//! A feed is fetched and parsed in full before the store is touched, and the
//! store swaps a unit's imported intervals in one transaction. A failed
//! import therefore leaves the previous intervals in force.

use std::collections::BTreeMap;

use chrono::Utc;
use gite_core::{Error, Result, store::AvailabilityStore};
use gite_ical::ParsedCalendar;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::BookingService;

/// Summary of one successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
  pub unit_id:   Uuid,
  pub feeds:     Vec<String>,
  /// Intervals now stored for the unit.
  pub imported:  usize,
  /// Cancelled events that were skipped.
  pub cancelled: usize,
}

/// Result of syncing one unit during [`BookingService::sync_all`].
#[derive(Debug, Clone, Serialize)]
pub struct UnitSync {
  pub unit_id: Uuid,
  pub feeds:   Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub report:  Option<ImportReport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:   Option<String>,
}

impl<S> BookingService<S>
where
  S: AvailabilityStore + 'static,
{
  /// Replace every imported interval of `unit_id` with the events of the
  /// calendar at `feed_url`.
  ///
  /// Fails with [`Error::FeedUnreachable`] or [`Error::FeedParseError`]
  /// without modifying anything.
  pub async fn import_feed(&self, unit_id: Uuid, feed_url: &str) -> Result<ImportReport> {
    self.import_feeds(unit_id, vec![feed_url.to_owned()]).await
  }

  /// Import the union of every feed subscribed for `unit_id`.
  ///
  /// Replace-all works per unit, so a unit with several source calendars is
  /// always imported from all of them at once.
  pub async fn sync_unit(&self, unit_id: Uuid) -> Result<ImportReport> {
    let feeds = self
      .feeds_by_unit()
      .await?
      .remove(&unit_id)
      .ok_or_else(|| Error::SubscriptionNotFound(unit_id.to_string()))?;
    self.import_feeds(unit_id, feeds).await
  }

  /// Sync every unit that has at least one import URL. One unit failing
  /// never stops the others.
  pub async fn sync_all(&self) -> Result<Vec<UnitSync>> {
    let mut results = Vec::new();
    for (unit_id, feeds) in self.feeds_by_unit().await? {
      let outcome = self.import_feeds(unit_id, feeds.clone()).await;
      let (report, error) = match outcome {
        Ok(report) => (Some(report), None),
        Err(e) => {
          warn!(%unit_id, ?feeds, "calendar sync failed: {e}");
          (None, Some(e.to_string()))
        }
      };
      results.push(UnitSync { unit_id, feeds, report, error });
    }
    Ok(results)
  }

  async fn feeds_by_unit(&self) -> Result<BTreeMap<Uuid, Vec<String>>> {
    let subscriptions = self.store.list_subscriptions().await.map_err(Error::storage)?;
    let mut by_unit: BTreeMap<Uuid, Vec<String>> = BTreeMap::new();
    for sub in subscriptions {
      if let Some(url) = sub.import_url {
        by_unit.entry(sub.unit_id).or_default().push(url);
      }
    }
    Ok(by_unit)
  }

  async fn import_feeds(&self, unit_id: Uuid, feeds: Vec<String>) -> Result<ImportReport> {
    let mut intervals = Vec::new();
    let mut cancelled = 0;
    for url in &feeds {
      let body = self.fetch_feed(url).await?;
      let parsed = parse_feed(url, &body)?;
      debug!(%unit_id, url, events = parsed.events.len(), "feed parsed");
      cancelled += parsed.cancelled;
      intervals.extend(parsed.events);
    }

    let imported = self
      .store
      .replace_imported(unit_id, feeds.clone(), intervals, Utc::now())
      .await
      .map_err(Error::storage)?;

    info!(%unit_id, ?feeds, imported, "calendar imported");
    Ok(ImportReport { unit_id, feeds, imported, cancelled })
  }

  async fn fetch_feed(&self, url: &str) -> Result<String> {
    let unreachable = |reason: String| Error::FeedUnreachable { url: url.to_owned(), reason };

    let resp = self
      .http
      .get(url)
      .header(reqwest::header::ACCEPT, "text/calendar, */*;q=0.5")
      .send()
      .await
      .map_err(|e| unreachable(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(unreachable(format!("HTTP {status}")));
    }
    resp.text().await.map_err(|e| unreachable(e.to_string()))
  }
}

fn parse_feed(url: &str, body: &str) -> Result<ParsedCalendar> {
  gite_ical::parse(body).map_err(|e| Error::FeedParseError(format!("{url}: {e}")))
}
