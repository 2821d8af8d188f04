//! Source record caching
//!
//! This module holds the cache store that composing objects own and the
//! TTL policy that bounds how long expirable documents are reused.

pub mod store;
pub mod ttl;

pub use store::CacheStore;
pub use ttl::{Clock, ManualClock, SystemClock, TtlPolicy, TtlRecord};
