use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::cache::{CollectionCache, KeyScope};
use crate::school::{RemoteCollection, Resource};

use super::intent::{
  Confirmation, Lifecycle, MutationError, MutationIntent, MutationKind, MutationState,
  RollbackContext,
};

/// Runs create/update/delete intents against a remote collection and keeps
/// the cache in step.
///
/// Intents on one coordinator run one at a time: a delete captures its
/// rollback snapshots only after the previous intent has settled, so a failed
/// delete can never resurrect a record another delete just removed.
pub struct MutationCoordinator<T: Resource, C: RemoteCollection<T>> {
  remote: Arc<C>,
  cache: CollectionCache<T>,
  /// Keys holding lists of this collection
  scope: KeyScope,
  gate: Arc<Mutex<()>>,
}

impl<T: Resource, C: RemoteCollection<T>> MutationCoordinator<T, C> {
  pub fn new(remote: Arc<C>, cache: CollectionCache<T>, scope: KeyScope) -> Self {
    Self {
      remote,
      cache,
      scope,
      gate: Arc::new(Mutex::new(())),
    }
  }

  pub async fn create(&self, payload: T::Payload) -> Result<Confirmation<T>, MutationError> {
    self.run(MutationIntent::Create(payload)).await
  }

  pub async fn update(
    &self,
    id: String,
    payload: T::Payload,
  ) -> Result<Confirmation<T>, MutationError> {
    self.run(MutationIntent::Update { id, payload }).await
  }

  pub async fn delete(&self, id: String) -> Result<Confirmation<T>, MutationError> {
    self.run(MutationIntent::Delete { id }).await
  }

  /// Run one intent to settlement.
  pub async fn run(
    &self,
    intent: MutationIntent<T::Payload>,
  ) -> Result<Confirmation<T>, MutationError> {
    let _turn = self.gate.lock().await;
    let mut lifecycle = Lifecycle::start(intent.kind(), intent.target());

    let outcome = match intent {
      MutationIntent::Create(payload) => self.save(&mut lifecycle, None, payload).await,
      MutationIntent::Update { id, payload } => {
        self.save(&mut lifecycle, Some(id), payload).await
      }
      MutationIntent::Delete { id } => self.remove(&mut lifecycle, id).await,
    };

    lifecycle.advance(MutationState::Settled);
    debug_assert_eq!(lifecycle.state(), MutationState::Settled);
    outcome
  }

  /// Create or update. No prediction is written: the server assigns ids and
  /// registration codes, so the list is refetched instead.
  async fn save(
    &self,
    lifecycle: &mut Lifecycle,
    id: Option<String>,
    payload: T::Payload,
  ) -> Result<Confirmation<T>, MutationError> {
    let (kind, result) = match &id {
      None => (MutationKind::Create, self.remote.create(&payload).await),
      Some(id) => (MutationKind::Update, self.remote.update(id, &payload).await),
    };

    match result {
      Ok(saved) => {
        lifecycle.advance(MutationState::Succeeded);
        self.cache.invalidate(&self.scope);
        let message = saved
          .message
          .unwrap_or_else(|| kind.operation().success_message(T::LABEL));
        info!(?kind, id = %saved.entity.cache_key(), "mutation succeeded");
        Ok(Confirmation {
          kind,
          message,
          entity: Some(saved.entity),
        })
      }
      Err(err) => {
        lifecycle.advance(MutationState::Failed);
        info!(?kind, id = id.as_deref(), error = %err, "mutation failed");
        Err(MutationError {
          kind,
          message: err.message,
        })
      }
    }
  }

  /// Delete with an optimistic prediction that is rolled back on failure.
  async fn remove(
    &self,
    lifecycle: &mut Lifecycle,
    id: String,
  ) -> Result<Confirmation<T>, MutationError> {
    let kind = MutationKind::Delete;

    self.cache.cancel_in_flight(&self.scope);
    // Reads keep showing the prediction until the server has answered
    let hold = self.cache.hold(&self.scope);
    let rollback = RollbackContext::capture(&self.cache, &self.scope);
    for (key, snapshot) in rollback.snapshots() {
      let predicted: Vec<T> = snapshot
        .iter()
        .filter(|entity| entity.cache_key() != id)
        .cloned()
        .collect();
      self.cache.write(key, predicted);
    }

    let outcome = match self.remote.delete(&id).await {
      Ok(notice) => {
        lifecycle.advance(MutationState::Succeeded);
        info!(id = %id, "delete succeeded");
        Ok(Confirmation {
          kind,
          message: notice
            .message
            .unwrap_or_else(|| kind.operation().success_message(T::LABEL)),
          entity: None,
        })
      }
      Err(err) => {
        lifecycle.advance(MutationState::Failed);
        info!(id = %id, error = %err, "delete failed, rolling back");
        rollback.restore(&self.cache);
        Err(MutationError {
          kind,
          message: err.message,
        })
      }
    };

    // Reconcile with the server whatever happened to the prediction
    drop(hold);
    self.cache.invalidate(&self.scope);
    outcome
  }
}

impl<T: Resource, C: RemoteCollection<T>> Clone for MutationCoordinator<T, C> {
  fn clone(&self) -> Self {
    Self {
      remote: Arc::clone(&self.remote),
      cache: self.cache.clone(),
      scope: self.scope.clone(),
      gate: Arc::clone(&self.gate),
    }
  }
}
