//! Policy Cache - A bounded in-process key/value cache
//!
//! Provides LRU, MRU, FIFO and time-aware LRU eviction behind one
//! lock-guarded, thread-safe façade.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, EvictionPolicy, OrderedPolicy, PolicyKind};
pub use config::Config;
pub use error::CacheError;
