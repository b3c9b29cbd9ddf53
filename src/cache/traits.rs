//! Core traits and types for the caching system.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Trait for entities that can be held in a list snapshot.
///
/// Implementors must provide an identifier that is unique within a snapshot.
/// Optimistic deletes remove entries by comparing this identifier.
pub trait Cacheable: Clone + Send + Sync + 'static {
  /// Unique identifier for this entity (e.g., the record id)
  fn cache_key(&self) -> String;

  /// Entity type name, used as the default collection name (e.g., "teacher")
  fn entity_type() -> &'static str;
}

/// Identity of a cached list: collection name plus filter parameters.
///
/// Keys with the same collection but different filters map to independent
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  collection: String,
  filter: BTreeMap<String, String>,
}

impl QueryKey {
  /// Key for the unfiltered list of a collection.
  pub fn collection(name: impl Into<String>) -> Self {
    Self {
      collection: name.into(),
      filter: BTreeMap::new(),
    }
  }

  /// Add a filter parameter to this key.
  #[allow(dead_code)]
  pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.filter.insert(name.into(), value.into());
    self
  }

  /// Scope covering every key of this key's collection.
  pub fn collection_scope(&self) -> KeyScope {
    KeyScope::Collection(self.collection.clone())
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.collection)?;
    if !self.filter.is_empty() {
      let params: Vec<String> = self
        .filter
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
      write!(f, "{{{}}}", params.join(","))?;
    }
    Ok(())
  }
}

/// Selects cache entries for invalidation and cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyScope {
  /// Exactly one key
  Exact(QueryKey),
  /// Every key of a collection, whatever its filter
  Collection(String),
}

impl KeyScope {
  pub fn matches(&self, key: &QueryKey) -> bool {
    match self {
      Self::Exact(exact) => exact == key,
      Self::Collection(name) => key.collection == *name,
    }
  }
}

impl From<&QueryKey> for KeyScope {
  fn from(key: &QueryKey) -> Self {
    Self::Exact(key.clone())
  }
}

/// Fetch status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
  /// Nothing in flight
  #[default]
  Idle,
  /// First fetch in flight, no snapshot yet
  Loading,
  /// Background refresh in flight, snapshot still served
  Fetching,
  /// Last fetch failed after all retries
  Error,
}

/// Point-in-time view of a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheState<T> {
  /// Last known list, absent until the first successful fetch
  pub snapshot: Option<Vec<T>>,
  pub status: FetchStatus,
  /// Message of the last failed fetch
  pub last_error: Option<String>,
  pub last_fetched_at: Option<Instant>,
  /// When the last fetch gave up after its retries
  pub last_failed_at: Option<Instant>,
  /// Whether the next read will refetch
  pub is_stale: bool,
}

impl<T> CacheState<T> {
  /// Snapshot entries, empty while nothing has been fetched.
  pub fn items(&self) -> &[T] {
    self.snapshot.as_deref().unwrap_or(&[])
  }

  pub fn is_loading(&self) -> bool {
    self.status == FetchStatus::Loading
  }

  pub fn is_fetching(&self) -> bool {
    self.status == FetchStatus::Fetching
  }

  pub fn is_error(&self) -> bool {
    self.status == FetchStatus::Error
  }
}

impl<T> Default for CacheState<T> {
  fn default() -> Self {
    Self {
      snapshot: None,
      status: FetchStatus::Idle,
      last_error: None,
      last_fetched_at: None,
      last_failed_at: None,
      is_stale: true,
    }
  }
}

/// Freshness, retention and retry settings for a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
  /// Age after which a snapshot is refetched on read
  pub freshness: Duration,
  /// Idle time after which an unsubscribed entry may be dropped
  pub retention: Duration,
  /// Retries after the first failed fetch
  pub retry: u32,
  /// Delay before the first retry, doubled for each further one
  pub retry_delay: Duration,
}

impl CachePolicy {
  const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

  /// Delay before retry number `attempt` (1-based).
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    self
      .retry_delay
      .saturating_mul(factor)
      .min(Self::MAX_RETRY_DELAY)
  }
}

impl Default for CachePolicy {
  fn default() -> Self {
    Self {
      freshness: Duration::from_secs(2 * 60),
      retention: Duration::from_secs(5 * 60),
      retry: 2,
      retry_delay: Duration::from_secs(1),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_collection_scope_matches_filtered_keys() {
    let plain = QueryKey::collection("teacher");
    let filtered = QueryKey::collection("teacher").with_filter("class", "3B");
    let other = QueryKey::collection("student");

    let scope = plain.collection_scope();
    assert!(scope.matches(&plain));
    assert!(scope.matches(&filtered));
    assert!(!scope.matches(&other));
  }

  #[test]
  fn test_exact_scope_matches_only_itself() {
    let plain = QueryKey::collection("teacher");
    let filtered = QueryKey::collection("teacher").with_filter("class", "3B");

    let scope = KeyScope::from(&plain);
    assert!(scope.matches(&plain));
    assert!(!scope.matches(&filtered));
  }

  #[test]
  fn test_key_display() {
    assert_eq!(QueryKey::collection("teacher").to_string(), "teacher");
    assert_eq!(
      QueryKey::collection("teacher")
        .with_filter("year", "2024")
        .with_filter("class", "3B")
        .to_string(),
      "teacher{class=3B,year=2024}"
    );
  }

  #[test]
  fn test_backoff_doubles_and_caps() {
    let policy = CachePolicy::default();
    assert_eq!(policy.backoff(1), Duration::from_secs(1));
    assert_eq!(policy.backoff(2), Duration::from_secs(2));
    assert_eq!(policy.backoff(3), Duration::from_secs(4));
    assert_eq!(policy.backoff(10), Duration::from_secs(30));
  }

  #[test]
  fn test_empty_state_has_no_items() {
    let state: CacheState<u32> = CacheState::default();
    assert!(state.items().is_empty());
    assert!(state.is_stale);
    assert_eq!(state.status, FetchStatus::Idle);
  }
}
