//! View State Controller
//!
//! Owns the single writer of [`ViewState`] and drives every request that
//! feeds it: snapshot loads, chart refetches, the analysis stream and
//! identity resolution.
//!
//! # Supersession
//!
//! Each ticker request is issued a [`SessionToken`] with a new generation
//! and installs it as the active session, unless a newer one got there
//! first. Every async result is written back through
//! [`ViewController::apply_if_current`], which compares the token with
//! the active one and writes under that same lock. A result for a
//! superseded session is dropped, and a superseded stream stops reading.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::analysis::{StreamEnd, consume_stream};
use crate::application::ports::{ApiError, AuthError, BackendPort, IdentityProvider};
use crate::domain::access::{AnalysisPlan, Trigger, UserProfile, plan_analysis};
use crate::domain::chart::{ChartError, ChartSeries, Timeframe};
use crate::domain::debate::{AnalysisOutcome, DebateState};
use crate::domain::session::{SessionGenerator, SessionToken};
use crate::domain::stream::Flow;
use crate::domain::view::{
    ANALYSIS_FAILED, ANALYSIS_STARTING, AuthStatus, SNAPSHOT_FAILED, ViewState,
};
use crate::infrastructure::metrics::{self, Endpoint};

/// Longest accepted ticker symbol.
const MAX_TICKER_LEN: usize = 15;

/// Request rejected before anything was fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// Blank ticker.
    #[error("ticker is empty")]
    EmptyTicker,

    /// Ticker with characters no exchange symbol uses.
    #[error("invalid ticker: {0}")]
    InvalidTicker(String),

    /// Timeframe change with no ticker on screen.
    #[error("no ticker is open")]
    NoActiveTicker,
}

/// What a ticker request did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    /// Identity is still resolving; the ticker runs once it resolves.
    Queued,
    /// Snapshot loaded; the analysis was not started.
    Snapshot {
        /// Upgrade prompt shown instead of the analysis.
        paywall: bool,
    },
    /// Snapshot loaded and the analysis ran.
    Analysis(AnalysisOutcome),
}

/// Background identity subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct IdentitySubscription {
    handle: JoinHandle<()>,
}

impl IdentitySubscription {
    /// Stop following identity changes.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for IdentitySubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Dashboard controller.
pub struct ViewController<B, I> {
    backend: Arc<B>,
    identity: Arc<I>,
    state: watch::Sender<ViewState>,
    sessions: SessionGenerator,
}

impl<B, I> std::fmt::Debug for ViewController<B, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewController")
            .field("latest_generation", &self.sessions.latest())
            .finish_non_exhaustive()
    }
}

impl<B, I> ViewController<B, I>
where
    B: BackendPort + 'static,
    I: IdentityProvider + 'static,
{
    /// Create a controller with empty view state and identity unresolved.
    #[must_use]
    pub fn new(backend: Arc<B>, identity: Arc<I>) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            backend,
            identity,
            state,
            sessions: SessionGenerator::new(),
        }
    }

    /// Receive every published view state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Copy of the current view state.
    #[must_use]
    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Apply `update` only if `token` is still the active session.
    ///
    /// Returns whether the update was applied.
    pub fn apply_if_current<F>(&self, token: &SessionToken, update: F) -> bool
    where
        F: FnOnce(&mut ViewState),
    {
        let applied = self.state.send_if_modified(|state| {
            if !state.is_current(token) {
                return false;
            }
            update(state);
            true
        });

        if !applied {
            metrics::record_stale_update();
            tracing::debug!(session = %token, "Dropping update for superseded session");
        }
        applied
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Resolve identity and profile, then run any ticker queued meanwhile.
    ///
    /// # Errors
    ///
    /// Returns an error if the queued ticker is invalid.
    pub async fn resolve_auth(&self) -> Result<Option<TickerOutcome>, ViewError> {
        match self.refresh_identity().await {
            Some(ticker) => self.open_ticker(&ticker).await.map(Some),
            None => Ok(None),
        }
    }

    /// Follow identity changes until the returned handle is dropped.
    ///
    /// Resolves identity immediately, then again on every change. A ticker
    /// queued while identity was resolving is dispatched on its own task.
    #[must_use = "dropping the subscription stops following identity changes"]
    pub fn follow_identity(self: &Arc<Self>) -> IdentitySubscription {
        let this = Arc::clone(self);
        let mut changes = self.identity.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                changes.mark_unchanged();
                if let Some(ticker) = this.refresh_identity().await {
                    let controller = Arc::clone(&this);
                    tokio::spawn(async move {
                        if let Err(err) = controller.open_ticker(&ticker).await {
                            tracing::warn!(error = %err, ticker, "Queued ticker rejected");
                        }
                    });
                }
                if changes.changed().await.is_err() {
                    tracing::debug!("Identity provider closed; stopping subscription");
                    break;
                }
            }
        });

        IdentitySubscription { handle }
    }

    /// Publish the current identity and profile. Returns the queued ticker.
    async fn refresh_identity(&self) -> Option<String> {
        let identity = self.identity.current();
        let profile = match identity {
            Some(_) => self.load_profile().await,
            None => None,
        };

        tracing::info!(
            signed_in = identity.is_some(),
            is_pro = profile.is_some_and(|p| p.is_pro),
            "Identity resolved"
        );

        let mut pending = None;
        self.state.send_modify(|state| {
            state.auth = if identity.is_some() {
                AuthStatus::SignedIn
            } else {
                AuthStatus::SignedOut
            };
            state.profile = profile;
            pending = state.pending_ticker.take();
        });
        pending
    }

    /// Fetch the profile. Any failure means "free user".
    async fn load_profile(&self) -> Option<UserProfile> {
        let bearer = match self.identity.fresh_token().await {
            Ok(bearer) => bearer,
            Err(err) => {
                tracing::debug!(error = %err, "No token for profile fetch");
                return None;
            }
        };

        let result = self.backend.user_profile(&bearer).await;
        metrics::record_request(Endpoint::UserProfile, result.is_ok());
        match result {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::warn!(error = %err, "Profile fetch failed, treating user as free");
                None
            }
        }
    }

    // =========================================================================
    // Ticker Requests
    // =========================================================================

    /// Open a ticker from the landing page, a deep link or a search pick.
    ///
    /// Pro users with auto analysis get the snapshot and the stream;
    /// everyone else gets the snapshot and the analysis waits for
    /// [`request_analysis`](Self::request_analysis). While identity is
    /// resolving the ticker is queued instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the ticker is blank or malformed.
    pub async fn open_ticker(&self, ticker: &str) -> Result<TickerOutcome, ViewError> {
        let ticker = normalize_ticker(ticker)?;

        let mut queued = false;
        self.state.send_if_modified(|state| {
            if state.auth.is_resolving() {
                state.pending_ticker = Some(ticker.clone());
                queued = true;
            }
            queued
        });
        if queued {
            tracing::debug!(ticker, "Identity resolving, ticker queued");
            return Ok(TickerOutcome::Queued);
        }

        let plan = self.plan(Trigger::Auto);
        let token = self.begin(&ticker, true);
        self.fetch_snapshot(&token).await;

        match plan {
            AnalysisPlan::SnapshotAndStream => {
                Ok(TickerOutcome::Analysis(self.run_stream(token).await))
            }
            AnalysisPlan::SnapshotOnly { paywall } => {
                self.apply_if_current(&token, |state| state.paywall = paywall);
                Ok(TickerOutcome::Snapshot { paywall })
            }
        }
    }

    /// Run the analysis because the user asked for it.
    ///
    /// Reuses the snapshot if `ticker` is already on screen. Shows the
    /// paywall instead when no one is signed in or the free quota is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the ticker is blank or malformed.
    pub async fn request_analysis(&self, ticker: &str) -> Result<TickerOutcome, ViewError> {
        let ticker = normalize_ticker(ticker)?;

        let on_screen = {
            let state = self.state.borrow();
            state.ticker.as_deref() == Some(ticker.as_str()) && state.quote.is_some()
        };

        let token = if on_screen {
            self.begin(&ticker, false)
        } else {
            let token = self.begin(&ticker, true);
            self.fetch_snapshot(&token).await;
            token
        };

        match self.plan(Trigger::Explicit) {
            AnalysisPlan::SnapshotAndStream => {
                Ok(TickerOutcome::Analysis(self.run_stream(token).await))
            }
            AnalysisPlan::SnapshotOnly { paywall } => {
                self.apply_if_current(&token, |state| {
                    state.paywall = paywall;
                    state.loading = false;
                });
                Ok(TickerOutcome::Snapshot { paywall })
            }
        }
    }

    /// Load quick stats and the default chart for `ticker`.
    ///
    /// Supersedes any in-flight session. On failure the status line reads
    /// "Error: Could not retrieve data. Try another ticker."
    ///
    /// # Errors
    ///
    /// Returns an error if the ticker is blank or malformed.
    pub async fn load_snapshot(&self, ticker: &str) -> Result<SessionToken, ViewError> {
        let ticker = normalize_ticker(ticker)?;
        let token = self.begin(&ticker, true);
        self.fetch_snapshot(&token).await;
        Ok(token)
    }

    /// Switch the chart to `timeframe` and refetch it.
    ///
    /// Does not supersede the analysis session. A slower response for an
    /// earlier timeframe is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if no ticker is open.
    pub async fn select_timeframe(&self, timeframe: Timeframe) -> Result<(), ViewError> {
        let token = self
            .state
            .borrow()
            .active
            .clone()
            .ok_or(ViewError::NoActiveTicker)?;
        self.fetch_chart(&token, timeframe).await;
        Ok(())
    }

    fn plan(&self, trigger: Trigger) -> AnalysisPlan {
        let identity = self.identity.current();
        let profile = self.state.borrow().profile;
        plan_analysis(identity.as_ref(), profile.as_ref(), trigger)
    }

    /// Issue a new session for `ticker` and make it active.
    ///
    /// `reset` clears the snapshot too; otherwise only the analysis state
    /// is reset.
    fn begin(&self, ticker: &str, reset: bool) -> SessionToken {
        let token = self.sessions.issue(ticker);
        self.state.send_if_modified(|state| {
            // A concurrent request may already have installed a newer token.
            if state
                .active
                .as_ref()
                .is_some_and(|active| token.is_superseded_by(active))
            {
                return false;
            }
            if reset {
                state.ticker = Some(ticker.to_string());
                state.timeframe = Timeframe::default();
                state.quote = None;
                state.chart = ChartSeries::default();
                state.change_percent = None;
                state.chart_loading = false;
                state.loading = true;
            }
            state.paywall = false;
            state.analysis_started = false;
            state.notice = None;
            state.debate = DebateState::default();
            state.active = Some(token.clone());
            true
        });

        tracing::debug!(
            session = %token,
            correlation = %token.correlation(),
            reset,
            "Session started"
        );
        token
    }

    async fn fetch_snapshot(&self, token: &SessionToken) {
        let result = self.backend.quick_stats(token.ticker()).await;
        metrics::record_request(Endpoint::QuickStats, result.is_ok());

        match result {
            Ok(quote) => {
                if !self.apply_if_current(token, |state| state.quote = Some(quote)) {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(session = %token, error = %err, "Quick stats fetch failed");
                self.apply_if_current(token, |state| {
                    state.notice = Some(SNAPSHOT_FAILED.to_string());
                    state.loading = false;
                });
                return;
            }
        }

        self.fetch_chart(token, Timeframe::default()).await;
        self.apply_if_current(token, |state| state.loading = false);
    }

    async fn fetch_chart(&self, token: &SessionToken, timeframe: Timeframe) {
        let mut request = 0;
        let started = self.apply_if_current(token, |state| {
            state.timeframe = timeframe;
            state.chart_loading = true;
            state.chart_request += 1;
            request = state.chart_request;
        });
        if !started {
            return;
        }

        let result = self
            .backend
            .chart(token.ticker(), timeframe)
            .await
            .map_err(ChartLoadError::Api)
            .and_then(|candles| ChartSeries::from_wire(candles).map_err(ChartLoadError::Chart));
        metrics::record_request(Endpoint::Chart, result.is_ok());

        let series = match result {
            Ok(series) if !series.is_empty() => Some(series),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(session = %token, %timeframe, error = %err, "Chart fetch failed");
                None
            }
        };

        self.apply_if_current(token, |state| {
            if state.chart_request != request {
                return;
            }
            state.chart_loading = false;
            if let Some(series) = series {
                if let Some(change) = series.percent_change() {
                    state.change_percent = Some(change);
                }
                state.chart = series;
            }
        });
    }

    // =========================================================================
    // Analysis Stream
    // =========================================================================

    async fn run_stream(&self, token: SessionToken) -> AnalysisOutcome {
        let started = Instant::now();
        let opened = self.apply_if_current(&token, |state| {
            state.analysis_started = true;
            state.loading = true;
            state.paywall = false;
            state.notice = None;
            state.debate = DebateState::streaming(ANALYSIS_STARTING);
        });

        let outcome = if opened {
            self.stream_session(&token).await
        } else {
            AnalysisOutcome::Superseded
        };

        metrics::record_session(&outcome, started.elapsed());
        tracing::info!(
            session = %token,
            correlation = %token.correlation(),
            outcome = outcome.label(),
            elapsed_ms = started.elapsed().as_millis(),
            "Analysis session finished"
        );
        outcome
    }

    async fn stream_session(&self, token: &SessionToken) -> AnalysisOutcome {
        let bearer = match self.identity.fresh_token().await {
            Ok(bearer) => bearer,
            Err(AuthError::SignedOut) => return self.deny(token),
            Err(err @ AuthError::Provider(_)) => {
                return self.fail_transport(token, &err.to_string());
            }
        };

        let chunks = match self.backend.open_analysis(token.ticker(), &bearer).await {
            Ok(chunks) => {
                metrics::record_request(Endpoint::Analyze, true);
                chunks
            }
            Err(err) => {
                metrics::record_request(Endpoint::Analyze, false);
                return if err.is_access_denied() {
                    self.deny(token)
                } else {
                    self.fail_transport(token, &err.to_string())
                };
            }
        };

        let mut superseded = false;
        let end = consume_stream(chunks, |event| {
            let applied = self.apply_if_current(token, |state| {
                state.debate.apply(event);
                if state.debate.phase.is_finished() {
                    state.loading = false;
                }
            });
            if applied {
                Flow::Continue
            } else {
                superseded = true;
                Flow::Stop
            }
        })
        .await;

        if superseded {
            return AnalysisOutcome::Superseded;
        }

        match end {
            StreamEnd::Terminal => {}
            StreamEnd::Exhausted => {
                self.apply_if_current(token, |state| {
                    state.debate.close();
                    state.loading = false;
                });
            }
            StreamEnd::Stopped => return AnalysisOutcome::Superseded,
            StreamEnd::Transport(err) => return self.transport_broke(token, &err),
        }

        let state = self.state.borrow();
        if state.is_current(token) {
            state.debate.outcome()
        } else {
            AnalysisOutcome::Superseded
        }
    }

    fn deny(&self, token: &SessionToken) -> AnalysisOutcome {
        tracing::info!(session = %token, "Analysis access denied, showing paywall");
        let applied = self.apply_if_current(token, |state| {
            state.paywall = true;
            state.loading = false;
            state.debate.close();
        });
        if applied {
            AnalysisOutcome::AccessDenied
        } else {
            AnalysisOutcome::Superseded
        }
    }

    fn fail_transport(&self, token: &SessionToken, reason: &str) -> AnalysisOutcome {
        tracing::warn!(session = %token, reason, "Analysis stream could not be opened");
        let applied = self.apply_if_current(token, |state| {
            state.notice = Some(ANALYSIS_FAILED.to_string());
            state.loading = false;
            state.debate.close();
        });
        if applied {
            AnalysisOutcome::TransportFailed(reason.to_string())
        } else {
            AnalysisOutcome::Superseded
        }
    }

    fn transport_broke(&self, token: &SessionToken, err: &ApiError) -> AnalysisOutcome {
        tracing::warn!(session = %token, error = %err, "Analysis stream broke");
        self.fail_transport(token, &err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
enum ChartLoadError {
    #[error(transparent)]
    Api(ApiError),
    #[error(transparent)]
    Chart(ChartError),
}

/// Trim and upper-case a ticker, rejecting anything that is not a symbol.
fn normalize_ticker(raw: &str) -> Result<String, ViewError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(ViewError::EmptyTicker);
    }
    let valid = ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(ticker)
    } else {
        Err(ViewError::InvalidTicker(raw.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(" aapl ", "AAPL" ; "trims and upper-cases")]
    #[test_case("brk.b", "BRK.B" ; "class shares")]
    #[test_case("^gspc", "^GSPC" ; "index")]
    #[test_case("eurusd=x", "EURUSD=X" ; "currency pair")]
    fn normalizes_tickers(raw: &str, expected: &str) {
        assert_eq!(normalize_ticker(raw).unwrap(), expected);
    }

    #[test]
    fn rejects_blank_and_malformed_tickers() {
        assert_eq!(normalize_ticker("  "), Err(ViewError::EmptyTicker));
        assert_eq!(
            normalize_ticker("AAPL; DROP"),
            Err(ViewError::InvalidTicker("AAPL; DROP".into()))
        );
        assert!(normalize_ticker("ABCDEFGHIJKLMNOPQ").is_err());
    }
}
