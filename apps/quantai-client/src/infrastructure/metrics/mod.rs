//! Prometheus Metrics Module
//!
//! Client-side metrics for the analysis stream and the view controller.
//!
//! # Metrics Categories
//!
//! - **Events**: Debate events dispatched, malformed and ignored segments
//! - **Sessions**: Analysis sessions by outcome, and their duration
//! - **Supersession**: Async results dropped because a newer session won
//! - **Requests**: Backend requests by endpoint and result
//!
//! # Integration
//!
//! The CLI renders the registry to stderr on `--metrics`. Without an
//! installed recorder every recording call is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::debate::AnalysisOutcome;
use crate::domain::stream::StreamStats;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder, once per process.
///
/// # Errors
///
/// Returns an error if another recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Stream events
    describe_counter!(
        "quantai_client_events_total",
        "Debate events dispatched, by event type"
    );
    describe_counter!(
        "quantai_client_malformed_events_total",
        "Stream segments skipped because the payload did not parse"
    );
    describe_counter!(
        "quantai_client_ignored_events_total",
        "Well-formed stream events of an unrecognized type"
    );

    // Sessions
    describe_counter!(
        "quantai_client_sessions_total",
        "Analysis sessions by outcome"
    );
    describe_histogram!(
        "quantai_client_session_duration_seconds",
        "Time from opening the analysis stream to its outcome"
    );
    describe_counter!(
        "quantai_client_stale_updates_total",
        "Async results dropped because their session was superseded"
    );

    // Backend requests
    describe_counter!(
        "quantai_client_requests_total",
        "Backend requests by endpoint and result"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Backend endpoint labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/api/quick-stats`.
    QuickStats,
    /// `/api/chart`.
    Chart,
    /// `/api/search`.
    Search,
    /// `/api/user-profile`.
    UserProfile,
    /// `/api/analyze`.
    Analyze,
    /// `/api/admin/users`.
    Admin,
}

impl Endpoint {
    const fn as_str(self) -> &'static str {
        match self {
            Self::QuickStats => "quick_stats",
            Self::Chart => "chart",
            Self::Search => "search",
            Self::UserProfile => "user_profile",
            Self::Analyze => "analyze",
            Self::Admin => "admin",
        }
    }
}

/// Record one dispatched debate event.
pub fn record_event(kind: &'static str) {
    counter!("quantai_client_events_total", "type" => kind).increment(1);
}

/// Record the per-stream counters once the stream has ended.
pub fn record_stream_stats(stats: &StreamStats) {
    if stats.malformed > 0 {
        counter!("quantai_client_malformed_events_total").increment(stats.malformed);
    }
    if stats.ignored > 0 {
        counter!("quantai_client_ignored_events_total").increment(stats.ignored);
    }
}

/// Record the outcome of an analysis session.
pub fn record_session(outcome: &AnalysisOutcome, duration: Duration) {
    counter!("quantai_client_sessions_total", "outcome" => outcome.label()).increment(1);
    histogram!(
        "quantai_client_session_duration_seconds",
        "outcome" => outcome.label()
    )
    .record(duration.as_secs_f64());
}

/// Record an async result dropped for a superseded session.
pub fn record_stale_update() {
    counter!("quantai_client_stale_updates_total").increment(1);
}

/// Record a backend request.
pub fn record_request(endpoint: Endpoint, ok: bool) {
    counter!(
        "quantai_client_requests_total",
        "endpoint" => endpoint.as_str(),
        "result" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_as_str() {
        assert_eq!(Endpoint::QuickStats.as_str(), "quick_stats");
        assert_eq!(Endpoint::Analyze.as_str(), "analyze");
        assert_eq!(Endpoint::Admin.as_str(), "admin");
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        record_event("status");
        record_stream_stats(&StreamStats {
            malformed: 2,
            ..StreamStats::default()
        });
        record_session(&AnalysisOutcome::Closed, Duration::from_millis(5));
        record_stale_update();
        record_request(Endpoint::Search, false);
    }
}
