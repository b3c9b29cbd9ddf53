use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{Cacheable, CollectionCache, KeyScope, QueryKey};
use crate::school::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  Create,
  Update,
  Delete,
}

impl MutationKind {
  pub fn operation(self) -> Operation {
    match self {
      Self::Create => Operation::Create,
      Self::Update => Operation::Update,
      Self::Delete => Operation::Delete,
    }
  }
}

/// A requested change to a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationIntent<P> {
  Create(P),
  Update { id: String, payload: P },
  Delete { id: String },
}

impl<P> MutationIntent<P> {
  pub fn kind(&self) -> MutationKind {
    match self {
      Self::Create(_) => MutationKind::Create,
      Self::Update { .. } => MutationKind::Update,
      Self::Delete { .. } => MutationKind::Delete,
    }
  }

  /// Identifier of the record the intent targets, if it exists already
  pub fn target(&self) -> Option<&str> {
    match self {
      Self::Create(_) => None,
      Self::Update { id, .. } | Self::Delete { id } => Some(id),
    }
  }
}

/// Lifecycle of a mutation intent: `Pending -> Succeeded|Failed -> Settled`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
  Pending,
  Succeeded,
  Failed,
  Settled,
}

impl MutationState {
  pub fn can_advance_to(self, next: MutationState) -> bool {
    use MutationState::*;
    matches!(
      (self, next),
      (Pending, Succeeded) | (Pending, Failed) | (Succeeded, Settled) | (Failed, Settled)
    )
  }
}

/// Tracks the state of one intent while the coordinator runs it.
#[derive(Debug)]
pub(super) struct Lifecycle {
  kind: MutationKind,
  target: Option<String>,
  state: MutationState,
}

impl Lifecycle {
  pub fn start(kind: MutationKind, target: Option<&str>) -> Self {
    debug!(?kind, id = target, "mutation pending");
    Self {
      kind,
      target: target.map(String::from),
      state: MutationState::Pending,
    }
  }

  pub fn state(&self) -> MutationState {
    self.state
  }

  pub fn advance(&mut self, next: MutationState) {
    if !self.state.can_advance_to(next) {
      warn!(kind = ?self.kind, from = ?self.state, to = ?next, "ignored invalid mutation transition");
      return;
    }
    debug!(kind = ?self.kind, id = self.target.as_deref(), state = ?next, "mutation transition");
    self.state = next;
  }
}

/// Snapshots of every key in the collection scope, taken before an
/// optimistic write and restored if the mutation fails.
#[derive(Debug)]
pub struct RollbackContext<T> {
  snapshots: Vec<(QueryKey, Vec<T>)>,
}

impl<T: Cacheable> RollbackContext<T> {
  pub fn capture(cache: &CollectionCache<T>, scope: &KeyScope) -> Self {
    Self {
      snapshots: cache.snapshots(scope),
    }
  }

  pub fn snapshots(&self) -> &[(QueryKey, Vec<T>)] {
    &self.snapshots
  }

  /// Write the captured snapshots back.
  pub fn restore(self, cache: &CollectionCache<T>) {
    for (key, snapshot) in self.snapshots {
      debug!(key = %key, count = snapshot.len(), "rolling back snapshot");
      cache.write(&key, snapshot);
    }
  }
}

/// Result of a mutation that succeeded
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation<T> {
  pub kind: MutationKind,
  /// Server message, or a generic success message
  pub message: String,
  /// Record returned by create and update
  pub entity: Option<T>,
}

/// A mutation that failed, with a message fit for display
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MutationError {
  pub kind: MutationKind,
  pub message: String,
}
