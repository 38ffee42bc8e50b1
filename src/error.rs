//! Error taxonomy for cache, fetchers and navigation.
//!
//! Every failure here is recoverable by retrying once connectivity or data is
//! available; there is no fatal class. The cache itself never fails — errors
//! originate in the fetchers or in ancestor resolution and propagate outward
//! with the pre-failure state intact.

use crate::types::EntityKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The remote service call failed: network error, non-2xx response or a
  /// payload we could not make sense of. Carries the original cause when one
  /// exists. Not retried automatically (the single 401-triggered retry lives
  /// in the HTTP layer, below this taxonomy).
  #[error("upstream fetch failed: {message}")]
  UpstreamFetch {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
  },

  /// A fetch succeeded but the requested id was absent from the result.
  #[error("{kind} {id} not found")]
  NotFound { kind: EntityKind, id: String },

  /// An ancestor entity could not be resolved during a navigation
  /// transition. The transition is aborted atomically; prior state is kept.
  #[error("could not resolve ancestor {kind} {id}")]
  MissingAncestor {
    kind: EntityKind,
    id: String,
    #[source]
    source: Box<Error>,
  },

  /// No access token is available from the auth collaborator.
  #[error("not authenticated with the task service")]
  NotAuthenticated,

  /// Configuration could not be loaded or is invalid.
  #[error("configuration error: {0}")]
  Config(String),
}

impl Error {
  /// Build an upstream error from a message alone.
  pub fn upstream(message: impl Into<String>) -> Self {
    Error::UpstreamFetch {
      message: message.into(),
      source: None,
    }
  }

  /// Wrap a failure as a missing-ancestor error for the given entity.
  pub fn missing_ancestor(kind: EntityKind, id: impl Into<String>, source: Error) -> Self {
    Error::MissingAncestor {
      kind,
      id: id.into(),
      source: Box::new(source),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound { .. })
  }
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    Error::UpstreamFetch {
      message: err.to_string(),
      source: Some(Box::new(err)),
    }
  }
}

impl From<serde_json::Error> for Error {
  fn from(err: serde_json::Error) -> Self {
    Error::UpstreamFetch {
      message: format!("malformed payload: {}", err),
      source: Some(Box::new(err)),
    }
  }
}
