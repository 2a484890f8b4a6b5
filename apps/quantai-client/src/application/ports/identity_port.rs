//! Identity Provider Port (Driven Port)

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::access::Identity;

/// Identity provider error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No user is signed in.
    #[error("no user is signed in")]
    SignedOut,

    /// The provider could not mint a token.
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// Port for the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signed-in user, if any.
    fn current(&self) -> Option<Identity>;

    /// Fresh bearer token for the signed-in user.
    async fn fresh_token(&self) -> Result<String, AuthError>;

    /// Identity changes. The receiver starts at the current identity.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}
