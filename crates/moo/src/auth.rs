//! Authentication hook for validating caller identity.
//!
//! Moo doesn't implement authentication itself. It defines the
//! [`Authenticator`] trait: one async method that turns a token into a
//! [`UserId`] or fails with [`MooError::Unauthorized`]. The server calls
//! it once per [`session`](crate::MooServer::session).

use std::collections::HashMap;

use moo_core::UserId;

use crate::MooError;

/// Validates a caller's token and returns their identity.
///
/// `Send + Sync + 'static` because the authenticator lives as long as the
/// server and may be called from any task.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, MooError>> + Send;
}

/// Uses the token itself as the user id.
///
/// Development only. Rejects blank tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevAuthenticator;

impl Authenticator for DevAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, MooError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(MooError::Unauthorized("empty token".into()));
        }
        Ok(UserId::new(token))
    }
}

/// A fixed table of tokens, e.g. API keys loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, UserId>,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as `user` from now on.
    pub fn with_token(mut self, token: impl Into<String>, user: UserId) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, MooError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| MooError::Unauthorized("unknown token".into()))
    }
}
