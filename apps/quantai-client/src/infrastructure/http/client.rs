//! HTTP adapter for the QuantAI backend.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::application::ports::{ApiError, BackendPort, ChunkStream};
use crate::domain::access::UserProfile;
use crate::domain::chart::{Timeframe, WireCandle};
use crate::domain::market::{AdminUser, QuickStats, SearchHit};
use crate::infrastructure::config::BackendSettings;

/// Longest error body kept in [`ApiError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// `reqwest` implementation of [`BackendPort`].
///
/// No request is retried. Snapshot requests carry the configured timeout;
/// the analysis stream only has the connect timeout, since an analysis
/// legitimately runs for minutes.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    settings: BackendSettings,
}

impl BackendClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(settings: BackendSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(concat!("quantai-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self { client, settings })
    }

    /// Backend base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.settings.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.settings.base_url.clone();
        if url.cannot_be_a_base() {
            return Err(ApiError::Network(format!("base URL cannot be a base: {url}")));
        }
        url.path_segments_mut()
            .map_err(|()| ApiError::Network("base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a snapshot request and decode its JSON body.
    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .timeout(self.settings.request_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Turn a non-success response into an error, keeping part of the body.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    tracing::debug!(status = status.as_u16(), "Backend returned an error status");
    Err(ApiError::from_status(status.as_u16(), body))
}

#[async_trait]
impl BackendPort for BackendClient {
    async fn quick_stats(&self, ticker: &str) -> Result<QuickStats, ApiError> {
        let url = self.endpoint(&["api", "quick-stats", ticker])?;
        self.fetch_json(self.client.get(url)).await
    }

    async fn chart(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<WireCandle>, ApiError> {
        let url = self.endpoint(&["api", "chart", ticker])?;
        let request = self.client.get(url).query(&[
            ("period", timeframe.period()),
            ("interval", timeframe.interval()),
        ]);
        self.fetch_json(request).await
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ApiError> {
        let url = self.endpoint(&["api", "search"])?;
        self.fetch_json(self.client.get(url).query(&[("q", query)]))
            .await
    }

    async fn user_profile(&self, token: &str) -> Result<UserProfile, ApiError> {
        let url = self.endpoint(&["api", "user-profile"])?;
        self.fetch_json(self.client.get(url).bearer_auth(token))
            .await
    }

    async fn open_analysis(&self, ticker: &str, token: &str) -> Result<ChunkStream, ApiError> {
        let url = self.endpoint(&["api", "analyze", ticker])?;
        tracing::debug!(%url, "Opening analysis stream");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ApiError::from))
            .boxed())
    }

    async fn admin_users(&self, token: &str) -> Result<Vec<AdminUser>, ApiError> {
        let url = self.endpoint(&["api", "admin", "users"])?;
        self.fetch_json(self.client.get(url).bearer_auth(token))
            .await
    }

    async fn set_user_pro(&self, token: &str, uid: &str, is_pro: bool) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "admin", "users", uid])?;
        let response = self
            .client
            .patch(url)
            .bearer_auth(token)
            .json(&json!({ "isPro": is_pro }))
            .timeout(self.settings.request_timeout)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(BackendSettings::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn endpoint_appends_to_base_path() {
        let url = client("https://api.example.com/v1/")
            .endpoint(&["api", "quick-stats", "AAPL"])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/api/quick-stats/AAPL");
    }

    #[test]
    fn endpoint_escapes_segments() {
        let url = client("http://localhost:8000/")
            .endpoint(&["api", "chart", "A/B C"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/chart/A%2FB%20C");
    }

    #[test]
    fn endpoint_rejects_non_hierarchical_base() {
        let err = client("mailto:ops@example.com").endpoint(&["api"]).unwrap_err();
        assert!(matches!(err, ApiError::Network(msg) if msg.contains("mailto:ops@example.com")));
    }
}
