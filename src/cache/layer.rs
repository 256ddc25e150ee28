//! Cache layer that orchestrates freshness checks with network fetching.

use chrono::{DateTime, Duration, Utc};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use super::traits::{CacheResult, Clock, SystemClock};

/// A successfully fetched value and when it was fetched.
///
/// Both are replaced together, so a slot either has neither or both.
struct CachedEntry<T> {
  data: Arc<T>,
  fetched_at: DateTime<Utc>,
}

struct Slot<T> {
  entry: Option<CachedEntry<T>>,
  /// Outcome of the most recent refresh attempt
  last_refresh_failed: bool,
}

impl<T> Slot<T> {
  fn fresh(&self) -> Option<CacheResult<Arc<T>>> {
    self
      .entry
      .as_ref()
      .map(|entry| CacheResult::from_cache(Arc::clone(&entry.data), entry.fetched_at))
  }

  fn offline(&self) -> Option<CacheResult<Arc<T>>> {
    self
      .entry
      .as_ref()
      .map(|entry| CacheResult::offline(Arc::clone(&entry.data), entry.fetched_at))
  }
}

/// Freshness of the slot at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
  /// Never fetched successfully
  Empty,
  /// Fetched within the freshness window
  Fresh,
  /// Fetched longer ago than the freshness window
  Stale,
}

/// Cache layer holding a single value in front of a fetcher.
///
/// Reads and refreshes are serialized by one async mutex. A refresh runs in
/// its own task which owns the lock until the result is stored, so it
/// completes even if the reader that triggered it goes away. Readers
/// arriving meanwhile wait for that refresh and share its outcome. Only one
/// upstream fetch is ever in flight.
pub struct CacheLayer<T> {
  slot: Arc<Mutex<Slot<T>>>,
  /// Completed refresh attempts, successful or not
  attempts: Arc<AtomicU64>,
  /// How long before cached data is considered stale
  stale_time: Duration,
  clock: Arc<dyn Clock>,
}

impl<T> CacheLayer<T> {
  /// Create an empty cache layer that goes stale after `stale_time`.
  pub fn new(stale_time: Duration) -> Self {
    Self {
      slot: Arc::new(Mutex::new(Slot {
        entry: None,
        last_refresh_failed: false,
      })),
      attempts: Arc::new(AtomicU64::new(0)),
      stale_time,
      clock: Arc::new(SystemClock),
    }
  }

  /// Use a different time source.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  fn state_of(&self, slot: &Slot<T>, now: DateTime<Utc>) -> CacheState {
    match &slot.entry {
      None => CacheState::Empty,
      Some(entry) if now - entry.fetched_at < self.stale_time => CacheState::Fresh,
      Some(_) => CacheState::Stale,
    }
  }

  /// Current freshness of the slot. Waits for an in-flight refresh.
  #[cfg(test)]
  pub async fn state(&self) -> CacheState {
    let slot = self.slot.lock().await;
    self.state_of(&slot, self.clock.now())
  }
}

impl<T: Send + Sync + 'static> CacheLayer<T> {
  /// Read the cached value, refreshing it through `fetcher` if needed.
  ///
  /// 1. Fresh value: return it without calling `fetcher`
  /// 2. Missing or stale: run the future from `fetcher` in a detached task
  /// 3. Fetch succeeded: store it with the current time and return it
  /// 4. Fetch failed: return the stale value untouched, or `None` if the
  ///    cache was never filled
  ///
  /// A failed refresh does not move `fetched_at`, so the next read after
  /// it retries the fetch.
  pub async fn fetch<F, Fut, E>(&self, fetcher: F) -> Option<CacheResult<Arc<T>>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Display + Send + 'static,
  {
    let seen = self.attempts.load(Ordering::Acquire);
    let slot = Arc::clone(&self.slot).lock_owned().await;
    let now = self.clock.now();

    let state = self.state_of(&slot, now);
    if state == CacheState::Fresh {
      debug!("Cache hit");
      return slot.fresh();
    }

    // A refresh finished while we were queued on the lock; its outcome is ours
    if self.attempts.load(Ordering::Acquire) != seen {
      debug!(?state, failed = slot.last_refresh_failed, "Sharing outcome of the last refresh");
      return if slot.last_refresh_failed {
        slot.offline()
      } else {
        slot.fresh()
      };
    }

    info!(?state, "Refreshing cache");
    let refresh = fetcher();
    let attempts = Arc::clone(&self.attempts);
    let task = tokio::spawn(store_refresh(slot, refresh, attempts, now));

    match task.await {
      Ok(result) => result,
      Err(e) => {
        // The guard was released when the task died; the slot is unchanged
        error!(error = %e, "Refresh task failed");
        self.slot.lock().await.offline()
      }
    }
  }
}

/// Await `refresh` and record its outcome while holding the slot.
async fn store_refresh<T, Fut, E>(
  mut slot: OwnedMutexGuard<Slot<T>>,
  refresh: Fut,
  attempts: Arc<AtomicU64>,
  now: DateTime<Utc>,
) -> Option<CacheResult<Arc<T>>>
where
  Fut: Future<Output = Result<T, E>>,
  E: Display,
{
  let result = refresh.await;
  slot.last_refresh_failed = result.is_err();
  attempts.fetch_add(1, Ordering::Release);

  match result {
    Ok(value) => {
      let data = Arc::new(value);
      slot.entry = Some(CachedEntry {
        data: Arc::clone(&data),
        fetched_at: now,
      });
      Some(CacheResult::from_network(data))
    }
    Err(e) => match &slot.entry {
      Some(entry) => {
        error!(error = %e, fetched_at = %entry.fetched_at, "Refresh failed, serving stale data");
        slot.offline()
      }
      None => {
        error!(error = %e, "Refresh failed and no cached data is available");
        None
      }
    },
  }
}
