//! Admin console: user listing and Pro entitlement toggling.

use std::cmp::Reverse;
use std::sync::Arc;

use crate::application::ports::{ApiError, AuthError, BackendPort, IdentityProvider};
use crate::domain::market::AdminUser;
use crate::infrastructure::metrics::{self, Endpoint};

/// Admin console error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    /// Signed-in user is not the allow-listed admin.
    #[error("{email} does not have admin privileges")]
    NotAuthorized {
        /// Email of the signed-in user, or `anonymous`.
        email: String,
    },

    /// Token could not be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Backend request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Admin console for the allow-listed account.
///
/// Only constructible through [`AdminConsole::open`], which checks the
/// signed-in identity. The backend enforces the same check.
pub struct AdminConsole<B, I> {
    backend: Arc<B>,
    identity: Arc<I>,
}

impl<B, I> std::fmt::Debug for AdminConsole<B, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConsole").finish_non_exhaustive()
    }
}

impl<B: BackendPort, I: IdentityProvider> AdminConsole<B, I> {
    /// Open the console for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotAuthorized`] unless the signed-in email
    /// matches `admin_email`.
    pub fn open(backend: Arc<B>, identity: Arc<I>, admin_email: Option<&str>) -> Result<Self, AdminError> {
        let current = identity.current();
        let allowed = current
            .as_ref()
            .is_some_and(|who| who.is_admin(admin_email));

        if !allowed {
            let email = current
                .and_then(|who| who.email)
                .unwrap_or_else(|| "anonymous".to_string());
            tracing::warn!(email, "Admin console refused");
            return Err(AdminError::NotAuthorized { email });
        }

        Ok(Self { backend, identity })
    }

    /// All users, newest first. Users without a creation time sort last.
    pub async fn users(&self) -> Result<Vec<AdminUser>, AdminError> {
        let bearer = self.identity.fresh_token().await?;
        let result = self.backend.admin_users(&bearer).await;
        metrics::record_request(Endpoint::Admin, result.is_ok());

        let mut users = result?;
        users.sort_by_key(|user| Reverse(user.created_at.clone().unwrap_or_default()));
        Ok(users)
    }

    /// Flip a user's Pro flag. Returns the new value.
    pub async fn toggle_pro(&self, uid: &str, currently_pro: bool) -> Result<bool, AdminError> {
        let is_pro = !currently_pro;
        self.set_pro(uid, is_pro).await?;
        Ok(is_pro)
    }

    /// Set a user's Pro flag.
    pub async fn set_pro(&self, uid: &str, is_pro: bool) -> Result<(), AdminError> {
        let bearer = self.identity.fresh_token().await?;
        let result = self.backend.set_user_pro(&bearer, uid, is_pro).await;
        metrics::record_request(Endpoint::Admin, result.is_ok());
        result?;

        tracing::info!(uid, is_pro, "Updated Pro entitlement");
        Ok(())
    }
}

/// `(pro, free)` user counts.
#[must_use]
pub fn plan_counts(users: &[AdminUser]) -> (usize, usize) {
    let pro = users.iter().filter(|user| user.is_pro).count();
    (pro, users.len() - pro)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_pro_and_free() {
        let users = vec![
            AdminUser {
                uid: "a".into(),
                is_pro: true,
                ..AdminUser::default()
            },
            AdminUser {
                uid: "b".into(),
                ..AdminUser::default()
            },
            AdminUser {
                uid: "c".into(),
                ..AdminUser::default()
            },
        ];
        assert_eq!(plan_counts(&users), (1, 2));
    }
}
