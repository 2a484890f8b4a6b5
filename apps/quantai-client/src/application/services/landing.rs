//! Landing page: live cards for the featured and recently scanned tickers.
//!
//! Every card is fetched from `quick-stats` concurrently. A ticker whose
//! request fails keeps a placeholder card; the others still load.

use futures::future::join_all;
use rust_decimal::Decimal;

use crate::application::ports::BackendPort;
use crate::domain::market::QuickStats;
use crate::infrastructure::metrics::{self, Endpoint};

/// Featured tickers with their fallback names.
pub const TOP_PICKS: [(&str, &str); 4] = [
    ("NVDA", "NVIDIA Corp."),
    ("AAPL", "Apple Inc."),
    ("META", "Meta Platforms"),
    ("TSLA", "Tesla Inc."),
];

/// Recently scanned tickers.
pub const RECENT_SCANS: [&str; 6] = ["MSFT", "AMZN", "GOOGL", "JPM", "SPY", "COIN"];

/// Score shown when the backend has none.
pub const PLACEHOLDER_SCORE: f64 = 70.0;

/// Signal shown on a card that failed to load.
pub const PLACEHOLDER_SIGNAL: &str = "BUY";

const SPARKLINE_POINTS: usize = 12;

/// One ticker card.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerCard {
    /// Ticker symbol.
    pub ticker: String,
    /// Company name, or the ticker when none is known.
    pub name: String,
    /// Last price; `None` on a placeholder card.
    pub price: Option<Decimal>,
    /// Daily change in percent.
    pub change_percent: Decimal,
    /// Recommendation score.
    pub score: f64,
    /// Recommendation label.
    pub signal: String,
    /// Recent closes, oldest first.
    pub sparkline: Vec<Decimal>,
    /// Whether the card holds fetched data.
    pub live: bool,
}

impl TickerCard {
    /// Card shown before, or instead of, live data.
    #[must_use]
    pub fn placeholder(ticker: &str, name: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
            price: None,
            change_percent: Decimal::ZERO,
            score: PLACEHOLDER_SCORE,
            signal: PLACEHOLDER_SIGNAL.to_string(),
            sparkline: Vec::new(),
            live: false,
        }
    }

    /// Card built from a quick-stats snapshot.
    ///
    /// Without a cached recommendation the signal follows the daily change:
    /// `BUY` when flat or up, `HOLD` when down. The sparkline is the last
    /// twelve closes, or a flat line at the price when fewer than two exist.
    #[must_use]
    pub fn from_stats(ticker: &str, fallback_name: &str, stats: QuickStats) -> Self {
        let change_percent = stats.change_percent.unwrap_or_default();
        let signal = stats.recommendation.filter(|s| !s.is_empty()).unwrap_or_else(|| {
            if change_percent.is_sign_negative() && !change_percent.is_zero() {
                "HOLD".to_string()
            } else {
                "BUY".to_string()
            }
        });

        let closes: Vec<Decimal> = stats.chart_data.iter().filter_map(|c| c.close).collect();
        let sparkline = if closes.len() >= 2 {
            closes[closes.len().saturating_sub(SPARKLINE_POINTS)..].to_vec()
        } else {
            stats.price.map(|p| vec![p, p]).unwrap_or_default()
        };

        let name = if stats.name.is_empty() {
            fallback_name.to_string()
        } else {
            stats.name
        };

        Self {
            ticker: ticker.to_string(),
            name,
            price: stats.price,
            change_percent,
            score: stats.score.unwrap_or(PLACEHOLDER_SCORE),
            signal,
            sparkline,
            live: true,
        }
    }
}

/// Both card rows of the landing page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandingPage {
    /// Featured tickers.
    pub top_picks: Vec<TickerCard>,
    /// Recently scanned tickers.
    pub recent_scans: Vec<TickerCard>,
}

impl LandingPage {
    /// All-placeholder page, shown until live data arrives.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            top_picks: TOP_PICKS
                .iter()
                .map(|(ticker, name)| TickerCard::placeholder(ticker, name))
                .collect(),
            recent_scans: RECENT_SCANS
                .iter()
                .map(|ticker| TickerCard::placeholder(ticker, ticker))
                .collect(),
        }
    }
}

/// Fetch every landing card concurrently. Never fails as a whole.
pub async fn load_landing<B: BackendPort>(backend: &B) -> LandingPage {
    let picks = join_all(TOP_PICKS.iter().map(|(ticker, name)| load_card(backend, ticker, name)));
    let scans = join_all(RECENT_SCANS.iter().map(|ticker| load_card(backend, ticker, ticker)));
    let (top_picks, recent_scans) = futures::join!(picks, scans);

    let failed = top_picks
        .iter()
        .chain(&recent_scans)
        .filter(|card| !card.live)
        .count();
    tracing::debug!(failed, "Landing cards loaded");

    LandingPage {
        top_picks,
        recent_scans,
    }
}

/// Fetch one card, falling back to a placeholder on any error.
pub async fn load_card<B: BackendPort>(backend: &B, ticker: &str, name: &str) -> TickerCard {
    let result = backend.quick_stats(ticker).await;
    metrics::record_request(Endpoint::QuickStats, result.is_ok());

    match result {
        Ok(stats) => TickerCard::from_stats(ticker, name, stats),
        Err(err) => {
            tracing::debug!(ticker, error = %err, "Landing card unavailable");
            TickerCard::placeholder(ticker, name)
        }
    }
}
