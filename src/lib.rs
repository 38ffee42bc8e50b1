//! tasknav — cache and navigation-state core for browsing a hierarchical
//! task-tracking service (projects → folders → lists → tasks).
//!
//! The crate sits between an editor/UI layer and the remote service:
//!
//! - [`api`] talks HTTP to the service and normalizes its payloads;
//! - [`cache`] is a time-expiring, hierarchically scoped in-memory store;
//! - [`client`] resolves reads cache-first and writes mutations through;
//! - [`nav`] tracks the user's position, breadcrumbs and bounded history;
//! - [`broadcast`] notifies subscribers of cache and navigation changes.
//!
//! The UI toolkit, the OAuth browser flow and secret storage are external
//! collaborators: the UI consumes [`Navigator`](nav::Navigator) and
//! [`CacheStore`], and authentication is injected via
//! [`TokenProvider`](auth::TokenProvider).
//!
//! All operations are async tasks interleaved on one logical runtime; the
//! crate does not serialize transitions issued concurrently (see the `nav`
//! module docs for the ordering caveat).

pub mod api;
pub mod auth;
pub mod broadcast;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod nav;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{CacheSnapshot, CacheStore};
pub use client::CachedClient;
pub use config::Config;
pub use error::{Error, Result};
pub use nav::{NavState, Navigator, Position};
