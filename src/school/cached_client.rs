//! Remote collection wrapped with the list cache and the mutation coordinator.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

use crate::cache::{CacheRead, CacheState, CollectionCache, KeyScope, QueryKey, Subscription};
use crate::mutation::{Confirmation, MutationCoordinator, MutationError};

use super::client::{RemoteCollection, Resource};
use super::error::TransportError;

/// Collection client with transparent caching.
///
/// Reads go through the cache, writes go through the coordinator, and both
/// share one cache handle, so a mutation is visible to every reader.
pub struct CachedCollection<T: Resource, C: RemoteCollection<T>> {
  remote: Arc<C>,
  cache: CollectionCache<T>,
  key: QueryKey,
  mutations: MutationCoordinator<T, C>,
}

impl<T: Resource, C: RemoteCollection<T>> CachedCollection<T, C> {
  pub fn new(remote: C, cache: CollectionCache<T>) -> Self {
    let remote = Arc::new(remote);
    let key = QueryKey::collection(T::entity_type());
    let mutations = MutationCoordinator::new(Arc::clone(&remote), cache.clone(), key.collection_scope());
    Self {
      remote,
      cache,
      key,
      mutations,
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn cache(&self) -> &CollectionCache<T> {
    &self.cache
  }

  #[cfg(test)]
  pub fn remote(&self) -> &C {
    &self.remote
  }

  fn fetcher(
    &self,
  ) -> impl Fn() -> BoxFuture<'static, Result<Vec<T>, TransportError>> + Send + Sync + 'static {
    let remote = Arc::clone(&self.remote);
    move || {
      let remote = Arc::clone(&remote);
      async move { remote.list().await }.boxed()
    }
  }

  /// Current list state, starting a background fetch when it is missing or
  /// stale.
  pub fn read(&self) -> CacheRead<T> {
    self.cache.read(&self.key, self.fetcher())
  }

  /// Read and wait for the list to settle.
  #[allow(dead_code)]
  pub async fn list(&self) -> CacheState<T> {
    self.cache.fetch(&self.key, self.fetcher()).await
  }

  /// Mark the list stale and read it again.
  pub fn refresh(&self) -> CacheRead<T> {
    self.cache.invalidate(&KeyScope::Exact(self.key.clone()));
    self.read()
  }

  pub fn subscribe(&self) -> Subscription<T> {
    self.cache.subscribe(&self.key)
  }

  pub async fn create(&self, payload: T::Payload) -> Result<Confirmation<T>, MutationError> {
    self.mutations.create(payload).await
  }

  pub async fn update(
    &self,
    id: String,
    payload: T::Payload,
  ) -> Result<Confirmation<T>, MutationError> {
    self.mutations.update(id, payload).await
  }

  pub async fn delete(&self, id: String) -> Result<Confirmation<T>, MutationError> {
    self.mutations.delete(id).await
  }
}

impl<T: Resource, C: RemoteCollection<T>> Clone for CachedCollection<T, C> {
  fn clone(&self) -> Self {
    Self {
      remote: Arc::clone(&self.remote),
      cache: self.cache.clone(),
      key: self.key.clone(),
      mutations: self.mutations.clone(),
    }
  }
}
