//! Interface to the OAuth collaborator.
//!
//! Token storage and the browser-redirect exchange live outside this crate;
//! the core only asks for the current token and, after a 401, for a refresh.

use async_trait::async_trait;

use crate::error::{Error, Result};

#[async_trait]
pub trait TokenProvider: Send + Sync {
  /// The current bearer token, if one is stored.
  fn access_token(&self) -> Option<String>;

  fn is_authenticated(&self) -> bool {
    self.access_token().is_some()
  }

  /// Invoked by the HTTP layer when the service answers 401. Returns the
  /// replacement token on success; the failed request is then retried once.
  async fn refresh_token(&self) -> Result<String>;
}

/// Fixed-token provider for non-interactive use. Has no refresh path, so a
/// 401 surfaces as an authentication error.
pub struct StaticTokenProvider {
  token: Option<String>,
}

impl StaticTokenProvider {
  pub fn new(token: impl Into<String>) -> Self {
    Self {
      token: Some(token.into()),
    }
  }

  /// Read the token from the environment.
  ///
  /// Checks TASKNAV_TOKEN first, then TASKNAV_API_TOKEN as fallback.
  pub fn from_env() -> Result<Self> {
    std::env::var("TASKNAV_TOKEN")
      .or_else(|_| std::env::var("TASKNAV_API_TOKEN"))
      .map(Self::new)
      .map_err(|_| {
        Error::Config(
          "API token not found. Set TASKNAV_TOKEN or TASKNAV_API_TOKEN environment variable."
            .to_string(),
        )
      })
  }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
  fn access_token(&self) -> Option<String> {
    self.token.clone()
  }

  async fn refresh_token(&self) -> Result<String> {
    Err(Error::NotAuthenticated)
  }
}
