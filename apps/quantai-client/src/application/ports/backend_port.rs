//! Backend Port (Driven Port)
//!
//! Interface to the QuantAI backend. Snapshot endpoints return parsed
//! payloads; the analysis endpoint returns the raw chunk stream, which the
//! application layer decodes itself.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::access::UserProfile;
use crate::domain::chart::{Timeframe, WireCandle};
use crate::domain::market::{AdminUser, QuickStats, SearchHit};

/// Raw body chunks of a streamed response.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, ApiError>>;

/// Backend error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Connection, TLS or timeout failure.
    #[error("Backend network error: {0}")]
    Network(String),

    /// Non-success status other than 401/403.
    #[error("Backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// 401 or 403.
    #[error("Backend denied access (HTTP {status})")]
    AccessDenied {
        /// HTTP status code.
        status: u16,
    },

    /// Response body did not match the expected shape.
    #[error("Backend response decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success status.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::AccessDenied { status },
            _ => Self::Status {
                status,
                body: body.into(),
            },
        }
    }

    /// Whether this error should show the paywall.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Port for the QuantAI backend.
///
/// Bearer tokens are passed per call; the port never caches them.
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// `GET /api/quick-stats/{ticker}`.
    async fn quick_stats(&self, ticker: &str) -> Result<QuickStats, ApiError>;

    /// `GET /api/chart/{ticker}?period=&interval=`.
    async fn chart(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<WireCandle>, ApiError>;

    /// `GET /api/search?q=`.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ApiError>;

    /// `GET /api/user-profile`.
    async fn user_profile(&self, token: &str) -> Result<UserProfile, ApiError>;

    /// `GET /api/analyze/{ticker}`, streamed.
    ///
    /// Resolves once response headers arrive. A 401/403 resolves to
    /// [`ApiError::AccessDenied`] without a stream.
    async fn open_analysis(&self, ticker: &str, token: &str) -> Result<ChunkStream, ApiError>;

    /// `GET /api/admin/users`.
    async fn admin_users(&self, token: &str) -> Result<Vec<AdminUser>, ApiError>;

    /// `PATCH /api/admin/users/{uid}` with `{"isPro": is_pro}`.
    async fn set_user_pro(&self, token: &str, uid: &str, is_pro: bool) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_and_forbidden_are_access_denied() {
        assert!(ApiError::from_status(401, "").is_access_denied());
        assert!(ApiError::from_status(403, "quota").is_access_denied());
        assert_eq!(
            ApiError::from_status(500, "boom"),
            ApiError::Status {
                status: 500,
                body: "boom".into()
            }
        );
    }
}
