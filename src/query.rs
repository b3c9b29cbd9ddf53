//! Poll-driven handles for views.
//!
//! Views never await. On every tick they poll:
//! - a [`CollectionQuery`] for the cached list they display
//! - a [`Task`] for each mutation they started
//!
//! # Example
//!
//! ```ignore
//! let mut query = CollectionQuery::new(teachers.clone());
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! let state = query.state();
//! if state.is_loading() { render_spinner() } else { render_rows(state.items()) }
//! ```

use std::future::Future;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::cache::{CacheState, Change, FetchStatus, Subscription};
use crate::school::{CachedCollection, RemoteCollection, Resource};

/// Live view of a cached collection.
///
/// Holds a subscription for its whole life, so the entry is never evicted
/// while a view shows it.
pub struct CollectionQuery<T: Resource, C: RemoteCollection<T>> {
  source: CachedCollection<T, C>,
  subscription: Subscription<T>,
  state: CacheState<T>,
}

impl<T: Resource, C: RemoteCollection<T>> CollectionQuery<T, C> {
  /// Subscribe and start the first read.
  pub fn new(source: CachedCollection<T, C>) -> Self {
    let subscription = source.subscribe();
    let state = source.read().state;
    Self {
      source,
      subscription,
      state,
    }
  }

  pub fn state(&self) -> &CacheState<T> {
    &self.state
  }

  pub fn data(&self) -> &[T] {
    self.state.items()
  }

  pub fn source(&self) -> &CachedCollection<T, C> {
    &self.source
  }

  /// Pick up cache changes. Returns `true` if the state changed.
  ///
  /// An invalidated entry is read again right away; a list that outlived the
  /// freshness window is read again on the next poll after it expires.
  pub fn poll(&mut self) -> bool {
    match self.subscription.poll() {
      Change::Invalidated => {
        self.state = self.source.read().state;
        true
      }
      Change::Updated => {
        if let Some(state) = self.source.cache().state(self.source.key()) {
          self.state = state;
        }
        true
      }
      Change::None if self.expired() => {
        self.state = self.source.read().state;
        true
      }
      Change::None => false,
    }
  }

  /// Force a refetch, keeping the current rows on screen meanwhile.
  pub fn refetch(&mut self) {
    self.state = self.source.refresh().state;
  }

  /// A failed list is retried one freshness window after the failure.
  fn expired(&self) -> bool {
    let since = match self.state.status {
      FetchStatus::Idle => self.state.last_fetched_at,
      FetchStatus::Error => self.state.last_failed_at,
      FetchStatus::Loading | FetchStatus::Fetching => return false,
    };
    let freshness = self.source.cache().policy().freshness;
    since
      .map(|at| Instant::now().duration_since(at) > freshness)
      .unwrap_or(false)
  }
}

/// A spawned future whose output is collected by polling.
pub struct Task<R> {
  receiver: Option<oneshot::Receiver<R>>,
}

impl<R: Send + 'static> Task<R> {
  pub fn spawn<Fut>(future: Fut) -> Self
  where
    Fut: Future<Output = R> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(future.await);
    });
    Self { receiver: Some(rx) }
  }

  /// Take the output if the future has finished.
  pub fn poll(&mut self) -> Option<R> {
    let receiver = self.receiver.as_mut()?;
    match receiver.try_recv() {
      Ok(output) => {
        self.receiver = None;
        Some(output)
      }
      Err(oneshot::error::TryRecvError::Empty) => None,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.receiver = None;
        None
      }
    }
  }

  #[cfg(test)]
  pub fn is_running(&self) -> bool {
    self.receiver.is_some()
  }
}
