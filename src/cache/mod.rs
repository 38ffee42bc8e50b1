//! Layered entity cache backing hierarchy navigation.
//!
//! This module provides the in-memory cache store that sits in front of the
//! remote task service:
//! - one id-keyed map per entity type, scope-filtered at read time
//! - per-scope freshness timestamps with a fixed expiry window
//! - write-through single-entity mutation (add/update/delete)
//! - change notification via the broadcast layer

mod clock;
mod store;
mod traits;

pub use clock::{Clock, SystemClock};
pub use store::{CacheSnapshot, CacheStore};
pub use traits::Entity;
