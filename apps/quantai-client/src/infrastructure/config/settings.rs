//! Client Configuration Settings
//!
//! Configuration types for the QuantAI client, loaded from environment
//! variables (after `.env`, when present).

use std::time::Duration;

use reqwest::Url;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default snapshot request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default search debounce delay.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Signed-in user credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityCredentials {
    uid: String,
    email: Option<String>,
    id_token: String,
}

impl IdentityCredentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(uid: String, email: Option<String>, id_token: String) -> Self {
        Self {
            uid,
            email,
            id_token,
        }
    }

    /// Get the user id.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Get the sign-in email.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Get the bearer ID token.
    #[must_use]
    pub fn id_token(&self) -> &str {
        &self.id_token
    }
}

impl std::fmt::Debug for IdentityCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCredentials")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &"[REDACTED]")
            .finish()
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// Base URL; endpoint paths are joined onto it.
    pub base_url: Url,
    /// Whole-request timeout for snapshot endpoints. The analysis stream
    /// has none.
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout, all endpoints.
    pub connect_timeout: Duration,
}

impl BackendSettings {
    /// Settings for `base_url` with default timeouts.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend connection settings.
    pub backend: BackendSettings,
    /// Signed-in user; `None` runs signed out.
    pub credentials: Option<IdentityCredentials>,
    /// Allow-listed admin email.
    pub admin_email: Option<String>,
    /// Search debounce delay.
    pub search_debounce: Duration,
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is malformed or a set variable is
    /// empty where a value is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup("QUANTAI_API_URL") {
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::EmptyValue("QUANTAI_API_URL".to_string()));
            }
            Some(raw) => parse_base_url(&raw)?,
            None => parse_base_url(DEFAULT_API_URL)?,
        };

        let email = non_empty(lookup("QUANTAI_USER_EMAIL"));
        let credentials = match lookup("QUANTAI_ID_TOKEN") {
            Some(token) if token.trim().is_empty() => {
                return Err(ConfigError::EmptyValue("QUANTAI_ID_TOKEN".to_string()));
            }
            Some(token) => {
                let uid = non_empty(lookup("QUANTAI_USER_ID"))
                    .or_else(|| email.clone())
                    .unwrap_or_else(|| "cli-user".to_string());
                Some(IdentityCredentials::new(uid, email, token.trim().to_string()))
            }
            None => None,
        };

        let backend = BackendSettings {
            base_url,
            request_timeout: parse_duration_secs(
                &lookup,
                "QUANTAI_HTTP_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT,
            ),
            connect_timeout: parse_duration_secs(
                &lookup,
                "QUANTAI_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT,
            ),
        };

        Ok(Self {
            backend,
            credentials,
            admin_email: non_empty(lookup("QUANTAI_ADMIN_EMAIL")),
            search_debounce: parse_duration_millis(
                &lookup,
                "QUANTAI_SEARCH_DEBOUNCE_MS",
                DEFAULT_SEARCH_DEBOUNCE,
            ),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// API URL did not parse or is not http(s).
    #[error("invalid QUANTAI_API_URL {url:?}: {reason}")]
    InvalidUrl {
        /// Value as given.
        url: String,
        /// Parse failure.
        reason: String,
    },
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    // A base without a trailing slash would drop its last path segment on join.
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&normalized).map_err(|err| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
