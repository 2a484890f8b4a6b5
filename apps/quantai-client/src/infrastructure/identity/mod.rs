//! Identity Provider Adapter
//!
//! Holds a bearer ID token obtained out of band (exported from the web
//! sign-in flow). Sign-in and sign-out publish through a `watch` channel
//! so subscribers see changes in order.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::application::ports::{AuthError, IdentityProvider};
use crate::domain::access::Identity;
use crate::infrastructure::config::IdentityCredentials;

/// Identity provider backed by a configured token.
pub struct StaticIdentity {
    credentials: RwLock<Option<IdentityCredentials>>,
    changes: watch::Sender<Option<Identity>>,
}

impl std::fmt::Debug for StaticIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticIdentity")
            .field("credentials", &*self.credentials.read())
            .finish_non_exhaustive()
    }
}

impl StaticIdentity {
    /// Create a provider, signed in when `credentials` is present.
    #[must_use]
    pub fn new(credentials: Option<IdentityCredentials>) -> Self {
        let identity = credentials.as_ref().map(to_identity);
        let (changes, _) = watch::channel(identity);
        Self {
            credentials: RwLock::new(credentials),
            changes,
        }
    }

    /// Sign in, replacing any current user.
    pub fn sign_in(&self, credentials: IdentityCredentials) {
        let identity = to_identity(&credentials);
        tracing::info!(uid = %identity.uid, "Signed in");
        *self.credentials.write() = Some(credentials);
        self.changes.send_replace(Some(identity));
    }

    /// Sign out. No-op when already signed out.
    pub fn sign_out(&self) {
        if self.credentials.write().take().is_some() {
            tracing::info!("Signed out");
            self.changes.send_replace(None);
        }
    }
}

fn to_identity(credentials: &IdentityCredentials) -> Identity {
    Identity::new(credentials.uid(), credentials.email().map(str::to_string))
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<Identity> {
        self.credentials.read().as_ref().map(to_identity)
    }

    async fn fresh_token(&self) -> Result<String, AuthError> {
        self.credentials
            .read()
            .as_ref()
            .map(|creds| creds.id_token().to_string())
            .ok_or(AuthError::SignedOut)
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.changes.subscribe()
    }
}
