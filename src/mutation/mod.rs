//! Optimistic create/update/delete on top of the collection cache.

mod coordinator;
mod intent;

pub use coordinator::MutationCoordinator;
pub use intent::{Confirmation, MutationError, MutationKind};
