//! Chart Series Types
//!
//! Candle series as returned by the chart and quick-stats endpoints,
//! normalized to one time key per series.
//!
//! # Time Keys
//!
//! Intraday intervals are keyed by Unix epoch seconds, daily and longer
//! intervals by a calendar-day string. A series never mixes the two.
//!
//! # Ghost Points
//!
//! The 1D view pads the series with `close = None` points up to the 16:00
//! New York close so the time axis keeps the full session width. Ghost
//! points carry no trading data and are skipped by every calculation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spacing of ghost points on the intraday axis.
pub const GHOST_STEP_SECS: i64 = 5 * 60;

/// Regular session close, New York local hour.
const SESSION_CLOSE_HOUR: u32 = 16;

// =============================================================================
// Timeframe
// =============================================================================

/// Dashboard timeframe toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeframe {
    /// One trading day, 5-minute candles.
    OneDay,
    /// Five trading days, 30-minute candles.
    OneWeek,
    /// One month, daily candles.
    #[default]
    OneMonth,
    /// Three months, daily candles.
    ThreeMonths,
    /// Year to date, daily candles.
    YearToDate,
    /// One year, weekly candles.
    OneYear,
    /// Five years, monthly candles.
    FiveYears,
    /// Full history, monthly candles.
    All,
}

impl Timeframe {
    /// All timeframes in toggle order.
    pub const ALL: [Self; 8] = [
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::YearToDate,
        Self::OneYear,
        Self::FiveYears,
        Self::All,
    ];

    /// UI label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OneDay => "1D",
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::YearToDate => "YTD",
            Self::OneYear => "1Y",
            Self::FiveYears => "5Y",
            Self::All => "ALL",
        }
    }

    /// `period` query parameter for `/api/chart`.
    #[must_use]
    pub const fn period(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::OneWeek => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::YearToDate => "ytd",
            Self::OneYear => "1y",
            Self::FiveYears => "5y",
            Self::All => "max",
        }
    }

    /// `interval` query parameter for `/api/chart`.
    #[must_use]
    pub const fn interval(self) -> &'static str {
        match self {
            Self::OneDay => "5m",
            Self::OneWeek => "30m",
            Self::OneMonth | Self::ThreeMonths | Self::YearToDate => "1d",
            Self::OneYear => "1wk",
            Self::FiveYears | Self::All => "1mo",
        }
    }

    /// Whether the view pads this timeframe with ghost points.
    #[must_use]
    pub const fn is_intraday(self) -> bool {
        matches!(self, Self::OneDay)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|tf| tf.label() == wanted)
            .ok_or_else(|| ChartError::UnknownTimeframe(s.to_string()))
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Candle time key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartTime {
    /// Unix epoch seconds (intraday).
    Epoch(i64),
    /// Calendar-day label (daily and longer).
    Day(String),
}

impl ChartTime {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Epoch(_) => "epoch",
            Self::Day(_) => "day",
        }
    }

    /// Epoch seconds, for intraday keys.
    #[must_use]
    pub const fn epoch(&self) -> Option<i64> {
        match self {
            Self::Epoch(ts) => Some(*ts),
            Self::Day(_) => None,
        }
    }
}

impl fmt::Display for ChartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epoch(ts) => match Utc.timestamp_opt(*ts, 0).single() {
                Some(at) => write!(f, "{}", at.with_timezone(&New_York).format("%I:%M %p")),
                None => write!(f, "{ts}"),
            },
            Self::Day(day) => f.write_str(day),
        }
    }
}

/// Candle exactly as the backend sends it.
///
/// The chart endpoint keys by `time` and duplicates `close` as `value`;
/// quick-stats keys by `date`. `ChartSeries::from_wire` reconciles them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireCandle {
    /// Chart endpoint key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ChartTime>,
    /// Quick-stats key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Open price.
    #[serde(default)]
    pub open: Option<Decimal>,
    /// High price.
    #[serde(default)]
    pub high: Option<Decimal>,
    /// Low price.
    #[serde(default)]
    pub low: Option<Decimal>,
    /// Close price.
    #[serde(default)]
    pub close: Option<Decimal>,
    /// Close price duplicate used by line charts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    /// Volume.
    #[serde(default)]
    pub volume: Option<u64>,
}

// =============================================================================
// Normalized Series
// =============================================================================

/// One normalized OHLCV point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandlePoint {
    /// Time key.
    pub time: ChartTime,
    /// Open price.
    pub open: Option<Decimal>,
    /// High price.
    pub high: Option<Decimal>,
    /// Low price.
    pub low: Option<Decimal>,
    /// Close price; `None` marks a ghost point.
    pub close: Option<Decimal>,
    /// Volume.
    pub volume: u64,
}

impl CandlePoint {
    /// Display-only padding point.
    #[must_use]
    pub const fn ghost(time: ChartTime) -> Self {
        Self {
            time,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: 0,
        }
    }

    /// Whether this point carries no trading data.
    #[must_use]
    pub const fn is_ghost(&self) -> bool {
        self.close.is_none()
    }
}

/// Chronological candle series with a single time-key kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSeries {
    points: Vec<CandlePoint>,
}

impl ChartSeries {
    /// Normalize a backend response.
    ///
    /// # Errors
    ///
    /// Returns an error if a point has no time key, or if epoch and
    /// calendar-day keys are mixed.
    pub fn from_wire(candles: Vec<WireCandle>) -> Result<Self, ChartError> {
        let mut points = Vec::with_capacity(candles.len());
        let mut kind: Option<&'static str> = None;

        for (index, candle) in candles.into_iter().enumerate() {
            let time = candle
                .time
                .or_else(|| candle.date.map(ChartTime::Day))
                .ok_or(ChartError::MissingTime { index })?;

            match kind {
                None => kind = Some(time.kind()),
                Some(expected) if expected != time.kind() => {
                    return Err(ChartError::MixedTimeKeys { index });
                }
                Some(_) => {}
            }

            points.push(CandlePoint {
                time,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close.or(candle.value),
                volume: candle.volume.unwrap_or(0),
            });
        }

        Ok(Self { points })
    }

    /// Points in chronological order.
    #[must_use]
    pub fn points(&self) -> &[CandlePoint] {
        &self.points
    }

    /// Number of points, ghosts included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First non-ghost close.
    #[must_use]
    pub fn first_close(&self) -> Option<Decimal> {
        self.points.iter().find_map(|p| p.close)
    }

    /// Last non-ghost close. Trailing ghost points are skipped.
    #[must_use]
    pub fn last_close(&self) -> Option<Decimal> {
        self.points.iter().rev().find_map(|p| p.close)
    }

    /// Change over the window in percent, `(last - first) / first * 100`.
    ///
    /// Ghost points never participate. Returns `None` when there is no
    /// priced point or the first close is zero.
    #[must_use]
    pub fn percent_change(&self) -> Option<Decimal> {
        self.change_to(self.last_close()?)
    }

    /// Change from the window's first close to `price`, for hover readouts.
    #[must_use]
    pub fn change_to(&self, price: Decimal) -> Option<Decimal> {
        let first = self.first_close()?;
        if first.is_zero() {
            return None;
        }
        (price - first)
            .checked_div(first)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }

    /// Intraday view at `now`.
    ///
    /// Drops epoch points later than `now`, then, while the New York
    /// session is still open, appends ghost points every
    /// [`GHOST_STEP_SECS`] up to the 16:00 close. Calendar-day series are
    /// returned unchanged.
    #[must_use]
    pub fn intraday_view(&self, now: DateTime<Utc>) -> Self {
        if self.points.first().and_then(|p| p.time.epoch()).is_none() {
            return self.clone();
        }

        let now_ts = now.timestamp();
        let mut points: Vec<CandlePoint> = self
            .points
            .iter()
            .filter(|p| p.time.epoch().is_some_and(|ts| ts <= now_ts))
            .cloned()
            .collect();

        let Some(close_ts) = session_close(now) else {
            return Self { points };
        };
        if now_ts >= close_ts {
            return Self { points };
        }

        let last_ts = points
            .last()
            .and_then(|p| p.time.epoch())
            .unwrap_or(now_ts);

        let mut ts = last_ts + GHOST_STEP_SECS;
        while ts <= close_ts {
            points.push(CandlePoint::ghost(ChartTime::Epoch(ts)));
            ts += GHOST_STEP_SECS;
        }

        Self { points }
    }
}

/// Today's 16:00 New York close as epoch seconds.
fn session_close(now: DateTime<Utc>) -> Option<i64> {
    let local_close = now
        .with_timezone(&New_York)
        .date_naive()
        .and_hms_opt(SESSION_CLOSE_HOUR, 0, 0)?;
    New_York
        .from_local_datetime(&local_close)
        .single()
        .map(|at| at.timestamp())
}

// =============================================================================
// Errors
// =============================================================================

/// Chart normalization errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChartError {
    /// A point had neither `time` nor `date`.
    #[error("chart point {index} has no time key")]
    MissingTime {
        /// Position in the response.
        index: usize,
    },
    /// Epoch and calendar-day keys in one response.
    #[error("chart point {index} mixes epoch and calendar-day time keys")]
    MixedTimeKeys {
        /// Position of the first mismatching point.
        index: usize,
    },
    /// Unrecognized timeframe label.
    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn epoch(h: u32, m: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 1, 16, h, m, 0).unwrap().timestamp()
    }

    fn priced(time: ChartTime, close: Decimal) -> WireCandle {
        WireCandle {
            time: Some(time),
            close: Some(close),
            ..WireCandle::default()
        }
    }

    #[test]
    fn timeframe_maps_to_query_parameters() {
        assert_eq!(Timeframe::OneDay.period(), "1d");
        assert_eq!(Timeframe::OneDay.interval(), "5m");
        assert_eq!(Timeframe::YearToDate.period(), "ytd");
        assert_eq!(Timeframe::All.period(), "max");
        assert_eq!(Timeframe::All.interval(), "1mo");
        assert_eq!(Timeframe::default(), Timeframe::OneMonth);
    }

    #[test]
    fn timeframe_parses_labels_case_insensitively() {
        assert_eq!("ytd".parse::<Timeframe>().unwrap(), Timeframe::YearToDate);
        assert_eq!("1w".parse::<Timeframe>().unwrap(), Timeframe::OneWeek);
        assert!(matches!(
            "2H".parse::<Timeframe>(),
            Err(ChartError::UnknownTimeframe(_))
        ));
    }

    #[test]
    fn from_wire_normalizes_date_and_value_keys() {
        let candles: Vec<WireCandle> = serde_json::from_str(
            r#"[{"time":"2024-01-02","open":1,"high":2,"low":0.5,"close":1.5,"value":1.5,"volume":10},
                {"date":"01/03","value":1.75}]"#,
        )
        .unwrap();

        let series = ChartSeries::from_wire(candles).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].time, ChartTime::Day("2024-01-02".into()));
        assert_eq!(series.points()[0].volume, 10);
        assert_eq!(series.points()[1].close, Some(dec!(1.75)));
    }

    #[test]
    fn from_wire_rejects_mixed_time_keys() {
        let candles = vec![
            priced(ChartTime::Epoch(1_700_000_000), dec!(1)),
            priced(ChartTime::Day("2024-01-02".into()), dec!(2)),
        ];
        assert_eq!(
            ChartSeries::from_wire(candles),
            Err(ChartError::MixedTimeKeys { index: 1 })
        );
    }

    #[test]
    fn from_wire_rejects_missing_time() {
        let candles = vec![WireCandle {
            close: Some(dec!(1)),
            ..WireCandle::default()
        }];
        assert_eq!(
            ChartSeries::from_wire(candles),
            Err(ChartError::MissingTime { index: 0 })
        );
    }

    #[test]
    fn percent_change_skips_trailing_ghost_points() {
        let mut candles = vec![
            priced(ChartTime::Epoch(epoch(14, 30)), dec!(100)),
            priced(ChartTime::Epoch(epoch(14, 35)), dec!(110)),
        ];
        candles.push(WireCandle {
            time: Some(ChartTime::Epoch(epoch(14, 40))),
            ..WireCandle::default()
        });

        let series = ChartSeries::from_wire(candles).unwrap();
        assert!(series.points().last().unwrap().is_ghost());
        assert_eq!(series.last_close(), Some(dec!(110)));
        assert_eq!(series.percent_change(), Some(dec!(10)));
    }

    #[test]
    fn percent_change_is_none_for_zero_or_missing_base() {
        let zero = ChartSeries::from_wire(vec![
            priced(ChartTime::Day("a".into()), dec!(0)),
            priced(ChartTime::Day("b".into()), dec!(5)),
        ])
        .unwrap();
        assert_eq!(zero.percent_change(), None);
        assert_eq!(ChartSeries::default().percent_change(), None);
    }

    #[test]
    fn intraday_view_trims_future_points_and_pads_to_close() {
        // 10:00 New York (EST, UTC-5).
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 15, 0, 0).unwrap();
        let series = ChartSeries::from_wire(vec![
            priced(ChartTime::Epoch(epoch(14, 50)), dec!(100)),
            priced(ChartTime::Epoch(epoch(14, 55)), dec!(101)),
            priced(ChartTime::Epoch(epoch(15, 5)), dec!(102)),
        ])
        .unwrap();

        let view = series.intraday_view(now);

        let real: Vec<_> = view.points().iter().filter(|p| !p.is_ghost()).collect();
        assert_eq!(real.len(), 2);
        // 15:00 through 21:00 UTC inclusive, every 5 minutes.
        assert_eq!(view.len(), 2 + 73);
        assert_eq!(
            view.points().last().unwrap().time,
            ChartTime::Epoch(epoch(21, 0))
        );
        assert_eq!(view.percent_change(), Some(dec!(1)));
    }

    #[test]
    fn intraday_view_after_close_has_no_ghosts() {
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 22, 0, 0).unwrap();
        let series = ChartSeries::from_wire(vec![priced(
            ChartTime::Epoch(epoch(20, 55)),
            dec!(100),
        )])
        .unwrap();

        let view = series.intraday_view(now);
        assert_eq!(view.len(), 1);
        assert!(view.points().iter().all(|p| !p.is_ghost()));
    }

    #[test]
    fn intraday_view_leaves_daily_series_alone() {
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 15, 0, 0).unwrap();
        let series =
            ChartSeries::from_wire(vec![priced(ChartTime::Day("01/16".into()), dec!(1))]).unwrap();
        assert_eq!(series.intraday_view(now), series);
    }
}
