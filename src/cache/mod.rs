//! Cache Module
//!
//! Provides a bounded in-memory cache with interchangeable eviction policies.

mod entry;
mod index;
mod policy;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use index::{BackToFront, OrderedIndex};
pub use policy::{EvictionPolicy, OrderedPolicy, PolicyKind};
pub use store::Cache;
