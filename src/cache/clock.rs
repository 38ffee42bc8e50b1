//! Time source for cache freshness decisions.
//!
//! The store takes its notion of "now" through this trait so tests can
//! advance simulated time past the expiry window without sleeping.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. The default for production use.
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}
