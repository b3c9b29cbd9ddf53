//! Cache layer that orchestrates list snapshots with network fetching.

use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::{Entry, PendingFetch, Revision};
use super::traits::{CachePolicy, CacheState, Cacheable, FetchStatus, KeyScope, QueryKey};

type Entries<T> = Arc<Mutex<HashMap<QueryKey, Entry<T>>>>;

fn lock<T>(entries: &Mutex<HashMap<QueryKey, Entry<T>>>) -> MutexGuard<'_, HashMap<QueryKey, Entry<T>>> {
  entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of a cache read: the state at the time of the read, plus the fetch
/// the read started or joined.
pub struct CacheRead<T> {
  pub state: CacheState<T>,
  pub pending: Option<PendingFetch>,
}

/// Process-local store of list snapshots keyed by [`QueryKey`].
///
/// Cloning is cheap and every clone shares the same entries. The lock is only
/// ever held for synchronous bookkeeping, never across an `.await`.
pub struct CollectionCache<T: Cacheable> {
  entries: Entries<T>,
  policy: CachePolicy,
}

impl<T: Cacheable> CollectionCache<T> {
  pub fn new(policy: CachePolicy) -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      policy,
    }
  }

  pub fn policy(&self) -> &CachePolicy {
    &self.policy
  }

  /// Read the current state of `key`.
  ///
  /// Starts a background fetch when the entry has no snapshot, is older than
  /// the freshness window, or was invalidated. While a fetch is in flight
  /// every read joins it instead of starting another one. A held entry is
  /// served as is.
  ///
  /// Must be called from within a Tokio runtime.
  pub fn read<F, Fut, E>(&self, key: &QueryKey, fetcher: F) -> CacheRead<T>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
  {
    let now = Instant::now();
    let mut entries = lock(&self.entries);
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(now));
    entry.last_used = now;

    let pending = if let Some(pending) = entry.in_flight.clone() {
      Some(pending)
    } else if entry.holds == 0 && entry.is_stale(now, &self.policy) {
      Some(self.start_fetch(key, entry, fetcher))
    } else {
      None
    };

    CacheRead {
      state: entry.view(now, &self.policy),
      pending,
    }
  }

  /// Read `key` and wait for any fetch the read started or joined.
  #[allow(dead_code)]
  pub async fn fetch<F, Fut, E>(&self, key: &QueryKey, fetcher: F) -> CacheState<T>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
  {
    let read = self.read(key, fetcher);
    match read.pending {
      Some(pending) => {
        pending.await;
        self.state(key).unwrap_or_default()
      }
      None => read.state,
    }
  }

  /// Current state of `key` without triggering a fetch.
  pub fn state(&self, key: &QueryKey) -> Option<CacheState<T>> {
    let now = Instant::now();
    let entries = lock(&self.entries);
    entries.get(key).map(|entry| entry.view(now, &self.policy))
  }

  /// Current snapshot of `key`, if one was ever stored.
  #[allow(dead_code)]
  pub fn snapshot(&self, key: &QueryKey) -> Option<Vec<T>> {
    let entries = lock(&self.entries);
    entries.get(key).and_then(|entry| entry.snapshot.clone())
  }

  /// Snapshots of every entry in `scope` that has one.
  pub fn snapshots(&self, scope: &KeyScope) -> Vec<(QueryKey, Vec<T>)> {
    let entries = lock(&self.entries);
    entries
      .iter()
      .filter(|(key, _)| scope.matches(key))
      .filter_map(|(key, entry)| entry.snapshot.clone().map(|s| (key.clone(), s)))
      .collect()
  }

  /// Replace the snapshot of `key`.
  ///
  /// A fetch that was in flight for `key` is detached and its result will be
  /// dropped when it resolves.
  pub fn write(&self, key: &QueryKey, snapshot: Vec<T>) {
    let now = Instant::now();
    let mut entries = lock(&self.entries);
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(now));
    if entry.detach_fetch() {
      debug!(key = %key, "write superseded in-flight fetch");
    }
    entry.snapshot = Some(snapshot);
    entry.status = FetchStatus::Idle;
    entry.last_error = None;
    entry.last_used = now;
    entry.notify();
  }

  /// Mark every entry in `scope` stale. Snapshots are kept and served until
  /// the refetch lands.
  ///
  /// A fetch already in flight may have read the list before the change that
  /// caused the invalidation, so it is detached and the next read starts a
  /// new one.
  pub fn invalidate(&self, scope: &KeyScope) -> usize {
    let mut entries = lock(&self.entries);
    let mut count = 0;
    for (key, entry) in entries.iter_mut().filter(|(key, _)| scope.matches(key)) {
      if entry.detach_fetch() {
        debug!(key = %key, epoch = entry.epoch, "invalidation superseded in-flight fetch");
      }
      entry.invalidated = true;
      entry.notify_invalidated();
      debug!(key = %key, "invalidated");
      count += 1;
    }
    count
  }

  /// Detach in-flight fetches for every entry in `scope`.
  pub fn cancel_in_flight(&self, scope: &KeyScope) -> usize {
    let mut entries = lock(&self.entries);
    let mut count = 0;
    for (key, entry) in entries.iter_mut().filter(|(key, _)| scope.matches(key)) {
      if entry.detach_fetch() {
        entry.notify();
        debug!(key = %key, epoch = entry.epoch, "cancelled in-flight fetch");
        count += 1;
      }
    }
    count
  }

  /// Stop reads from starting fetches for the entries in `scope` until the
  /// returned guard is dropped. Snapshots written meanwhile stay on screen
  /// instead of being overwritten by a list read before the change landed.
  pub fn hold(&self, scope: &KeyScope) -> Hold<T> {
    let mut entries = lock(&self.entries);
    let keys: Vec<QueryKey> = entries
      .iter_mut()
      .filter(|(key, _)| scope.matches(key))
      .map(|(key, entry)| {
        entry.holds += 1;
        key.clone()
      })
      .collect();
    debug!(count = keys.len(), "holding entries");

    Hold {
      keys,
      entries: Arc::clone(&self.entries),
    }
  }

  /// Register an active subscriber for `key`.
  pub fn subscribe(&self, key: &QueryKey) -> Subscription<T> {
    let now = Instant::now();
    let mut entries = lock(&self.entries);
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(now));
    entry.last_used = now;
    let receiver = entry.subscribe();
    let seen = *receiver.borrow();

    Subscription {
      key: key.clone(),
      receiver,
      seen,
      entries: Arc::clone(&self.entries),
    }
  }

  /// Drop entries with no subscriber and no fetch in flight that have not
  /// been used for longer than the retention window.
  pub fn gc(&self) -> usize {
    let now = Instant::now();
    let retention = self.policy.retention;
    let mut entries = lock(&self.entries);
    let before = entries.len();
    entries.retain(|key, entry| {
      let keep = entry.subscribers > 0
        || entry.holds > 0
        || entry.in_flight.is_some()
        || now.duration_since(entry.last_used) <= retention;
      if !keep {
        debug!(key = %key, "evicting unused entry");
      }
      keep
    });
    before - entries.len()
  }

  fn start_fetch<F, Fut, E>(&self, key: &QueryKey, entry: &mut Entry<T>, fetcher: F) -> PendingFetch
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
  {
    let epoch = entry.epoch;
    let entries = Arc::clone(&self.entries);
    let policy = self.policy;
    let fetch_key = key.clone();

    let task = async move {
      let outcome = fetch_with_retry(&entries, &fetch_key, epoch, &policy, fetcher).await;
      settle(&entries, &fetch_key, epoch, outcome);
    }
    .boxed()
    .shared();

    entry.in_flight = Some(task.clone());
    entry.status = if entry.snapshot.is_some() {
      FetchStatus::Fetching
    } else {
      FetchStatus::Loading
    };
    entry.notify();
    debug!(key = %key, epoch, "starting fetch");

    tokio::spawn(task.clone());
    task
  }
}

impl<T: Cacheable> Clone for CollectionCache<T> {
  fn clone(&self) -> Self {
    Self {
      entries: Arc::clone(&self.entries),
      policy: self.policy,
    }
  }
}

fn is_current<T>(entries: &Entries<T>, key: &QueryKey, epoch: u64) -> bool {
  lock(entries)
    .get(key)
    .map(|entry| entry.epoch == epoch)
    .unwrap_or(false)
}

async fn fetch_with_retry<T, F, Fut, E>(
  entries: &Entries<T>,
  key: &QueryKey,
  epoch: u64,
  policy: &CachePolicy,
  fetcher: F,
) -> Result<Vec<T>, String>
where
  F: Fn() -> Fut,
  Fut: Future<Output = Result<Vec<T>, E>>,
  E: fmt::Display,
{
  let mut attempt = 0;
  loop {
    let message = match fetcher().await {
      Ok(items) => return Ok(items),
      Err(err) => err.to_string(),
    };
    if attempt >= policy.retry || !is_current(entries, key, epoch) {
      return Err(message);
    }
    attempt += 1;
    let delay = policy.backoff(attempt);
    warn!(key = %key, attempt, error = %message, ?delay, "fetch failed, retrying");
    tokio::time::sleep(delay).await;
  }
}

fn settle<T: Cacheable>(
  entries: &Entries<T>,
  key: &QueryKey,
  epoch: u64,
  outcome: Result<Vec<T>, String>,
) {
  let mut entries = lock(entries);
  let Some(entry) = entries.get_mut(key) else {
    return;
  };
  if entry.epoch != epoch {
    debug!(key = %key, epoch, "discarding result of cancelled fetch");
    return;
  }

  entry.in_flight = None;
  match outcome {
    Ok(items) => {
      debug!(key = %key, count = items.len(), "fetch settled");
      entry.snapshot = Some(items);
      entry.status = FetchStatus::Idle;
      entry.last_error = None;
      entry.last_fetched_at = Some(Instant::now());
      entry.last_failed_at = None;
      entry.invalidated = false;
    }
    Err(message) => {
      warn!(key = %key, error = %message, "fetch failed after retries");
      entry.status = FetchStatus::Error;
      entry.last_error = Some(message);
      entry.last_failed_at = Some(Instant::now());
    }
  }
  entry.notify();
}

/// What a subscriber observed since its last poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
  None,
  /// State changed (fetch started or settled, snapshot written)
  Updated,
  /// The entry was invalidated and should be read again
  Invalidated,
}

/// Active interest in a cache entry.
///
/// Entries with a live subscription are never evicted. Dropping the
/// subscription releases it.
pub struct Subscription<T: Cacheable> {
  key: QueryKey,
  receiver: watch::Receiver<Revision>,
  seen: Revision,
  entries: Entries<T>,
}

impl<T: Cacheable> Subscription<T> {
  /// Check for changes without blocking.
  pub fn poll(&mut self) -> Change {
    if !self.receiver.has_changed().unwrap_or(false) {
      return Change::None;
    }
    let current = *self.receiver.borrow_and_update();
    let change = if current.invalidations != self.seen.invalidations {
      Change::Invalidated
    } else if current != self.seen {
      Change::Updated
    } else {
      Change::None
    };
    self.seen = current;
    change
  }
}

impl<T: Cacheable> Drop for Subscription<T> {
  fn drop(&mut self) {
    let mut entries = lock(&self.entries);
    if let Some(entry) = entries.get_mut(&self.key) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
      entry.last_used = Instant::now();
    }
  }
}

/// Guard returned by [`CollectionCache::hold`].
pub struct Hold<T: Cacheable> {
  keys: Vec<QueryKey>,
  entries: Entries<T>,
}

impl<T: Cacheable> Drop for Hold<T> {
  fn drop(&mut self) {
    let mut entries = lock(&self.entries);
    for key in &self.keys {
      if let Some(entry) = entries.get_mut(key) {
        entry.holds = entry.holds.saturating_sub(1);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::future::BoxFuture;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  #[derive(Debug, Clone, PartialEq)]
  struct Item {
    id: u32,
    name: &'static str,
  }

  impl Cacheable for Item {
    fn cache_key(&self) -> String {
      self.id.to_string()
    }

    fn entity_type() -> &'static str {
      "item"
    }
  }

  fn item(id: u32, name: &'static str) -> Item {
    Item { id, name }
  }

  /// Scripted list source: each call pops the next response, the last one
  /// repeats forever.
  #[derive(Clone)]
  struct Source {
    responses: Arc<Mutex<VecDeque<Result<Vec<Item>, String>>>>,
    calls: Arc<AtomicUsize>,
    delay: Duration,
  }

  impl Source {
    fn new(responses: Vec<Result<Vec<Item>, String>>) -> Self {
      Self {
        responses: Arc::new(Mutex::new(responses.into())),
        calls: Arc::new(AtomicUsize::new(0)),
        delay: Duration::ZERO,
      }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
      self.delay = delay;
      self
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<Vec<Item>, String> {
      let mut responses = self.responses.lock().unwrap();
      if responses.len() > 1 {
        responses.pop_front().unwrap()
      } else {
        responses.front().cloned().unwrap_or(Ok(Vec::new()))
      }
    }

    fn fetcher(&self) -> impl Fn() -> BoxFuture<'static, Result<Vec<Item>, String>> + Send + Sync + 'static {
      let source = self.clone();
      move || {
        let source = source.clone();
        async move {
          source.calls.fetch_add(1, Ordering::SeqCst);
          if !source.delay.is_zero() {
            tokio::time::sleep(source.delay).await;
          }
          source.next()
        }
        .boxed()
      }
    }
  }

  fn key() -> QueryKey {
    QueryKey::collection("item")
  }

  fn cache() -> CollectionCache<Item> {
    CollectionCache::new(CachePolicy::default())
  }

  #[tokio::test(start_paused = true)]
  async fn test_fetch_stores_list_in_order() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(2, "b"), item(1, "a"), item(3, "c")])]);

    let state = cache.fetch(&key(), source.fetcher()).await;

    assert_eq!(state.status, FetchStatus::Idle);
    assert_eq!(
      state.snapshot,
      Some(vec![item(2, "b"), item(1, "a"), item(3, "c")])
    );
    assert!(!state.is_stale);
    assert!(state.last_fetched_at.is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_reads_coalesce() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a")])]).with_delay(Duration::from_millis(50));

    let first = cache.read(&key(), source.fetcher());
    let second = cache.read(&key(), source.fetcher());

    assert!(first.state.is_loading());
    assert!(second.state.is_loading());
    first.pending.expect("first read starts a fetch").await;
    second.pending.expect("second read joins it").await;

    assert_eq!(source.calls(), 1);
    assert_eq!(cache.snapshot(&key()), Some(vec![item(1, "a")]));
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_snapshot_is_served_without_fetch() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a")])]);
    cache.fetch(&key(), source.fetcher()).await;

    let read = cache.read(&key(), source.fetcher());

    assert!(read.pending.is_none());
    assert_eq!(read.state.items(), &[item(1, "a")]);
    assert_eq!(source.calls(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_snapshot_refetched_after_freshness_window() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a")]), Ok(vec![item(1, "a"), item(2, "b")])]);
    cache.fetch(&key(), source.fetcher()).await;

    tokio::time::advance(Duration::from_secs(121)).await;
    let read = cache.read(&key(), source.fetcher());

    assert!(read.state.is_stale);
    assert!(read.state.is_fetching());
    assert_eq!(read.state.items(), &[item(1, "a")]);
    read.pending.expect("stale read refetches").await;
    assert_eq!(cache.snapshot(&key()).map(|s| s.len()), Some(2));
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_twice_refetches_once() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a")])]);
    cache.fetch(&key(), source.fetcher()).await;

    assert_eq!(cache.invalidate(&key().collection_scope()), 1);
    assert_eq!(cache.invalidate(&key().collection_scope()), 1);
    let state = cache.state(&key()).unwrap();
    assert!(state.is_stale);
    assert_eq!(state.snapshot, Some(vec![item(1, "a")]));

    cache.fetch(&key(), source.fetcher()).await;
    assert_eq!(source.calls(), 2);

    let read = cache.read(&key(), source.fetcher());
    assert!(read.pending.is_none());
    assert_eq!(source.calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_retry_recovers_within_budget() {
    let cache = cache();
    let source = Source::new(vec![
      Err("unreachable".to_string()),
      Err("unreachable".to_string()),
      Ok(vec![item(1, "a")]),
    ]);

    let state = cache.fetch(&key(), source.fetcher()).await;

    assert_eq!(source.calls(), 3);
    assert_eq!(state.status, FetchStatus::Idle);
    assert_eq!(state.snapshot, Some(vec![item(1, "a")]));
    assert_eq!(state.last_error, None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_retry_exhaustion_keeps_previous_snapshot() {
    let cache = cache();
    let source = Source::new(vec![
      Ok(vec![item(1, "a")]),
      Err("Error fetching items".to_string()),
    ]);
    cache.fetch(&key(), source.fetcher()).await;
    cache.invalidate(&key().collection_scope());

    let state = cache.fetch(&key(), source.fetcher()).await;

    assert_eq!(source.calls(), 4);
    assert_eq!(state.status, FetchStatus::Error);
    assert_eq!(state.last_error.as_deref(), Some("Error fetching items"));
    assert_eq!(state.snapshot, Some(vec![item(1, "a")]));
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_first_fetch_has_no_snapshot() {
    let cache = cache();
    let source = Source::new(vec![Err("down".to_string())]);

    let state = cache.fetch(&key(), source.fetcher()).await;

    assert!(state.is_error());
    assert_eq!(state.snapshot, None);
    assert_eq!(source.calls(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_cancelled_fetch_does_not_overwrite_later_write() {
    let cache = cache();
    let source = Source::new(vec![
      Ok(vec![item(1, "a"), item(2, "b")]),
      Ok(vec![item(1, "a"), item(2, "b"), item(3, "c")]),
    ])
    .with_delay(Duration::from_millis(20));
    cache.fetch(&key(), source.fetcher()).await;
    cache.invalidate(&key().collection_scope());

    let read = cache.read(&key(), source.fetcher());
    assert_eq!(cache.cancel_in_flight(&key().collection_scope()), 1);
    cache.write(&key(), vec![item(1, "a")]);
    read.pending.expect("refetch was started").await;

    assert_eq!(cache.snapshot(&key()), Some(vec![item(1, "a")]));
    assert_eq!(cache.state(&key()).unwrap().status, FetchStatus::Idle);
  }

  #[tokio::test(start_paused = true)]
  async fn test_write_detaches_in_flight_fetch() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(9, "late")])]).with_delay(Duration::from_millis(20));

    let read = cache.read(&key(), source.fetcher());
    cache.write(&key(), vec![item(1, "a")]);
    read.pending.unwrap().await;

    assert_eq!(cache.snapshot(&key()), Some(vec![item(1, "a")]));
    // the written snapshot was never fetched, so the next read refetches
    let read = cache.read(&key(), source.fetcher());
    assert!(read.pending.is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_detaches_running_fetch() {
    let cache = cache();
    let before = Source::new(vec![Ok(vec![item(1, "a")])]).with_delay(Duration::from_millis(50));
    cache.fetch(&key(), before.fetcher()).await;
    cache.invalidate(&key().collection_scope());

    let running = cache.read(&key(), before.fetcher());
    assert!(running.state.is_fetching());
    cache.invalidate(&key().collection_scope());
    running.pending.expect("read refetches").await;

    // the fetch that started before the second invalidation must not count
    let state = cache.state(&key()).unwrap();
    assert!(state.is_stale);
    assert_eq!(state.status, FetchStatus::Idle);

    let after = Source::new(vec![Ok(vec![item(1, "a"), item(2, "b")])]);
    let read = cache.read(&key(), after.fetcher());
    read.pending.expect("next read starts a new fetch").await;

    assert_eq!(after.calls(), 1);
    assert_eq!(cache.snapshot(&key()), Some(vec![item(1, "a"), item(2, "b")]));
    assert!(!cache.state(&key()).unwrap().is_stale);
  }

  #[tokio::test(start_paused = true)]
  async fn test_held_entry_serves_written_snapshot() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a"), item(2, "b")])]);
    cache.fetch(&key(), source.fetcher()).await;
    tokio::time::advance(Duration::from_secs(121)).await;

    let hold = cache.hold(&key().collection_scope());
    cache.write(&key(), vec![item(1, "a")]);
    let read = cache.read(&key(), source.fetcher());

    assert!(read.pending.is_none());
    assert_eq!(read.state.items(), &[item(1, "a")]);
    assert_eq!(source.calls(), 1);

    drop(hold);
    let read = cache.read(&key(), source.fetcher());
    read.pending.expect("released entry refetches").await;
    assert_eq!(source.calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_fetch_records_failure_time() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a")]), Err("down".to_string())]);
    cache.fetch(&key(), source.fetcher()).await;
    assert_eq!(cache.state(&key()).unwrap().last_failed_at, None);

    cache.invalidate(&key().collection_scope());
    let state = cache.fetch(&key(), source.fetcher()).await;

    assert!(state.is_error());
    assert!(state.last_failed_at > state.last_fetched_at);
  }

  #[tokio::test(start_paused = true)]
  async fn test_cancel_without_fetch_is_noop() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a")])]);
    cache.fetch(&key(), source.fetcher()).await;

    assert_eq!(cache.cancel_in_flight(&key().collection_scope()), 0);
    assert_eq!(cache.snapshot(&key()), Some(vec![item(1, "a")]));
  }

  #[tokio::test(start_paused = true)]
  async fn test_filtered_keys_are_independent() {
    let cache = cache();
    let plain = key();
    let filtered = key().with_filter("name", "a");
    let source = Source::new(vec![Ok(vec![item(1, "a"), item(2, "b")]), Ok(vec![item(1, "a")])]);

    cache.fetch(&plain, source.fetcher()).await;
    cache.fetch(&filtered, source.fetcher()).await;
    cache.invalidate(&KeyScope::from(&filtered));

    assert!(!cache.state(&plain).unwrap().is_stale);
    assert!(cache.state(&filtered).unwrap().is_stale);
    assert_eq!(cache.snapshots(&plain.collection_scope()).len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_gc_keeps_subscribed_and_recent_entries() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a")])]);
    cache.fetch(&key(), source.fetcher()).await;
    let subscription = cache.subscribe(&key());

    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    assert_eq!(cache.gc(), 0);

    drop(subscription);
    assert_eq!(cache.gc(), 0);

    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    assert_eq!(cache.gc(), 1);
    assert!(cache.state(&key()).is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_subscription_reports_updates_and_invalidations() {
    let cache = cache();
    let source = Source::new(vec![Ok(vec![item(1, "a")])]);
    let mut subscription = cache.subscribe(&key());
    assert_eq!(subscription.poll(), Change::None);

    cache.fetch(&key(), source.fetcher()).await;
    assert_eq!(subscription.poll(), Change::Updated);
    assert_eq!(subscription.poll(), Change::None);

    cache.invalidate(&key().collection_scope());
    assert_eq!(subscription.poll(), Change::Invalidated);
    assert_eq!(subscription.poll(), Change::None);
  }
}
