//! Generic list cache with stale-while-revalidate reads.
//!
//! This module is agnostic of the remote service. It:
//! - Keeps one ordered snapshot per query key, plus fetch status and freshness
//! - Coalesces concurrent reads of a key into one fetch
//! - Retries failed fetches a bounded number of times, keeping the old snapshot
//! - Lets writers replace snapshots and discard fetches that were overtaken

mod entry;
mod layer;
mod traits;

pub use layer::{CacheRead, Change, CollectionCache, Subscription};
pub use traits::{CachePolicy, CacheState, Cacheable, FetchStatus, KeyScope, QueryKey};
