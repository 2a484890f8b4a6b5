//! View State
//!
//! Everything the dashboard renders, in one value. The view controller
//! owns the only writer; renderers hold `watch` receivers and read
//! snapshots.

mod theme;

pub use theme::{Theme, ThemeScope, ThemeSink, TrendTone};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::access::UserProfile;
use super::chart::{ChartSeries, Timeframe};
use super::debate::{DebateState, FinalAnalysis};
use super::market::QuickStats;
use super::session::SessionToken;

/// Status shown while the analysis stream is being opened.
pub const ANALYSIS_STARTING: &str = "Verifying access & Initializing FinDebate AI Framework...";

/// Status shown when quick stats could not be loaded.
pub const SNAPSHOT_FAILED: &str = "Error: Could not retrieve data. Try another ticker.";

/// Status shown when the analysis stream could not be opened or broke.
pub const ANALYSIS_FAILED: &str = "Error: AI analysis failed.";

/// Identity resolution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// The identity provider has not reported yet.
    #[default]
    Resolving,
    /// No signed-in user.
    SignedOut,
    /// A user is signed in.
    SignedIn,
}

impl AuthStatus {
    /// Whether identity is still unknown.
    #[must_use]
    pub const fn is_resolving(self) -> bool {
        matches!(self, Self::Resolving)
    }
}

/// Dashboard view state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Ticker on screen.
    pub ticker: Option<String>,
    /// Selected chart timeframe.
    pub timeframe: Timeframe,
    /// Quick-stats snapshot.
    pub quote: Option<QuickStats>,
    /// Chart series for `timeframe`.
    pub chart: ChartSeries,
    /// Percent change over the chart window.
    pub change_percent: Option<Decimal>,
    /// Snapshot or analysis in flight.
    pub loading: bool,
    /// Chart refetch in flight.
    pub chart_loading: bool,
    /// Sequence number of the latest chart request.
    pub chart_request: u64,
    /// Upgrade prompt visible.
    pub paywall: bool,
    /// Analysis was started for the ticker on screen.
    pub analysis_started: bool,
    /// Snapshot or transport failure message.
    pub notice: Option<String>,
    /// Debate session for the ticker on screen.
    pub debate: DebateState,
    /// Identity resolution state.
    pub auth: AuthStatus,
    /// Profile of the signed-in user; `None` when unknown.
    pub profile: Option<UserProfile>,
    /// Ticker requested while identity was resolving.
    pub pending_ticker: Option<String>,
    /// Session whose results may still be applied.
    pub active: Option<SessionToken>,
}

impl ViewState {
    /// Whether `token` is the active session.
    #[must_use]
    pub fn is_current(&self, token: &SessionToken) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation() == token.generation())
    }

    /// Line shown under the header: failure notice, backend error, or
    /// progress message.
    #[must_use]
    pub fn status_line(&self) -> Option<String> {
        if let Some(notice) = &self.notice {
            return Some(notice.clone());
        }
        if let Some(error) = &self.debate.error {
            return Some(format!("Error: {error}"));
        }
        (!self.debate.status.is_empty()).then(|| self.debate.status.clone())
    }

    /// Completed analysis for the ticker on screen.
    #[must_use]
    pub const fn analysis(&self) -> Option<&FinalAnalysis> {
        self.debate.result.as_ref()
    }

    /// Company name, preferring the completed analysis.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.analysis()
            .map(|a| a.name.as_str())
            .or_else(|| self.quote.as_ref().map(|q| q.name.as_str()))
            .filter(|name| !name.is_empty())
    }

    /// Headline price: analysis, then quote, then the chart's last close.
    #[must_use]
    pub fn display_price(&self) -> Option<Decimal> {
        self.analysis()
            .and_then(|a| a.price)
            .or_else(|| self.quote.as_ref().and_then(|q| q.price))
            .or_else(|| self.chart.last_close())
    }

    /// Percent change shown next to the price.
    ///
    /// The chart window's change wins over the daily change from the
    /// snapshot.
    #[must_use]
    pub fn display_change_percent(&self) -> Option<Decimal> {
        self.change_percent
            .or_else(|| self.analysis().and_then(|a| a.change_percent))
            .or_else(|| self.quote.as_ref().and_then(|q| q.change_percent))
    }

    /// Trend tone of the displayed change.
    #[must_use]
    pub fn trend(&self) -> TrendTone {
        TrendTone::from_change(self.display_change_percent())
    }

    /// Series to plot at `now`.
    ///
    /// Falls back to the snapshot's month of candles when no timeframe
    /// series has loaded. The 1D view is trimmed and padded with ghost
    /// points.
    #[must_use]
    pub fn display_chart(&self, now: DateTime<Utc>) -> ChartSeries {
        let series = if self.chart.is_empty() {
            self.quote
                .as_ref()
                .and_then(|q| ChartSeries::from_wire(q.chart_data.clone()).ok())
                .unwrap_or_default()
        } else {
            self.chart.clone()
        };

        if self.timeframe.is_intraday() {
            series.intraday_view(now)
        } else {
            series
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::{ChartTime, WireCandle};
    use crate::domain::session::SessionGenerator;
    use rust_decimal_macros::dec;

    #[test]
    fn is_current_compares_generations() {
        let sessions = SessionGenerator::new();
        let first = sessions.issue("AAPL");
        let second = sessions.issue("AAPL");

        let state = ViewState {
            active: Some(second.clone()),
            ..ViewState::default()
        };
        assert!(state.is_current(&second));
        assert!(!state.is_current(&first));
        assert!(!ViewState::default().is_current(&first));
    }

    #[test]
    fn status_line_prefers_notice_then_error() {
        let mut state = ViewState::default();
        assert_eq!(state.status_line(), None);

        state.debate = DebateState::streaming(ANALYSIS_STARTING);
        assert_eq!(state.status_line().as_deref(), Some(ANALYSIS_STARTING));

        state.debate.error = Some("rate limited".into());
        assert_eq!(state.status_line().as_deref(), Some("Error: rate limited"));

        state.notice = Some(SNAPSHOT_FAILED.into());
        assert_eq!(state.status_line().as_deref(), Some(SNAPSHOT_FAILED));
    }

    #[test]
    fn window_change_wins_over_daily_change() {
        let state = ViewState {
            quote: Some(QuickStats {
                change_percent: Some(dec!(-0.5)),
                ..QuickStats::default()
            }),
            ..ViewState::default()
        };
        assert_eq!(state.trend(), TrendTone::Down);

        let state = ViewState {
            change_percent: Some(dec!(3.1)),
            ..state
        };
        assert_eq!(state.display_change_percent(), Some(dec!(3.1)));
        assert_eq!(state.trend(), TrendTone::Up);
    }

    #[test]
    fn display_chart_falls_back_to_snapshot_candles() {
        let state = ViewState {
            quote: Some(QuickStats {
                chart_data: vec![WireCandle {
                    date: Some("01/02".into()),
                    close: Some(dec!(10)),
                    ..WireCandle::default()
                }],
                ..QuickStats::default()
            }),
            ..ViewState::default()
        };

        let series = state.display_chart(Utc::now());
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].time, ChartTime::Day("01/02".into()));
        assert_eq!(state.display_price(), None);
    }

    #[test]
    fn headline_price_prefers_analysis_then_quote_then_chart() {
        let chart = ChartSeries::from_wire(vec![WireCandle {
            date: Some("01/03".into()),
            close: Some(dec!(101)),
            ..WireCandle::default()
        }])
        .unwrap();
        let mut state = ViewState {
            chart,
            ..ViewState::default()
        };
        assert_eq!(state.display_price(), Some(dec!(101)));

        state.quote = Some(QuickStats {
            price: Some(dec!(100)),
            ..QuickStats::default()
        });
        assert_eq!(state.display_price(), Some(dec!(100)));

        state.debate.result = Some(FinalAnalysis {
            price: Some(dec!(99.5)),
            ..FinalAnalysis::default()
        });
        assert_eq!(state.display_price(), Some(dec!(99.5)));
    }
}
