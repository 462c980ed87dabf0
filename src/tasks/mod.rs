//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache.
//!
//! # Tasks
//! - Expiration: Removes entries untouched for longer than the expiration
//!   duration (time-aware LRU only)

mod expiration;

pub use expiration::{sweep_expired, ExpirationDaemon};
