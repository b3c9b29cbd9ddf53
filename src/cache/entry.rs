//! Per-key cache entry state.

use futures::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tokio::time::Instant;

use super::traits::{CachePolicy, CacheState, FetchStatus};

/// Handle to a fetch in flight. Every reader that arrives while the fetch is
/// running gets a clone of the same handle.
pub type PendingFetch = Shared<BoxFuture<'static, ()>>;

/// Change counters published to subscribers of an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revision {
  /// Bumped on every observable change
  pub version: u64,
  /// Bumped on every invalidation
  pub invalidations: u64,
}

pub(super) struct Entry<T> {
  pub snapshot: Option<Vec<T>>,
  pub status: FetchStatus,
  pub last_error: Option<String>,
  pub last_fetched_at: Option<Instant>,
  pub last_failed_at: Option<Instant>,
  pub invalidated: bool,
  /// A fetch only applies its result while the epoch it started under is
  /// still current. Writes and cancellations move the epoch forward.
  pub epoch: u64,
  pub in_flight: Option<PendingFetch>,
  /// Reads start no fetch while a hold is active
  pub holds: usize,
  pub subscribers: usize,
  pub last_used: Instant,
  changes: watch::Sender<Revision>,
}

impl<T: Clone> Entry<T> {
  pub fn new(now: Instant) -> Self {
    let (changes, _) = watch::channel(Revision::default());
    Self {
      snapshot: None,
      status: FetchStatus::Idle,
      last_error: None,
      last_fetched_at: None,
      last_failed_at: None,
      invalidated: false,
      epoch: 0,
      in_flight: None,
      holds: 0,
      subscribers: 0,
      last_used: now,
      changes,
    }
  }

  pub fn is_stale(&self, now: Instant, policy: &CachePolicy) -> bool {
    if self.invalidated {
      return true;
    }
    match self.last_fetched_at {
      Some(at) => now.duration_since(at) > policy.freshness,
      None => true,
    }
  }

  pub fn view(&self, now: Instant, policy: &CachePolicy) -> CacheState<T> {
    CacheState {
      snapshot: self.snapshot.clone(),
      status: self.status,
      last_error: self.last_error.clone(),
      last_fetched_at: self.last_fetched_at,
      last_failed_at: self.last_failed_at,
      is_stale: self.is_stale(now, policy),
    }
  }

  /// Detach the in-flight fetch, if any, so its result is discarded.
  pub fn detach_fetch(&mut self) -> bool {
    if self.in_flight.take().is_none() {
      return false;
    }
    self.epoch += 1;
    if matches!(self.status, FetchStatus::Loading | FetchStatus::Fetching) {
      self.status = FetchStatus::Idle;
    }
    true
  }

  pub fn subscribe(&mut self) -> watch::Receiver<Revision> {
    self.subscribers += 1;
    self.changes.subscribe()
  }

  pub fn notify(&self) {
    self.changes.send_modify(|rev| rev.version += 1);
  }

  pub fn notify_invalidated(&self) {
    self.changes.send_modify(|rev| {
      rev.version += 1;
      rev.invalidations += 1;
    });
  }
}
