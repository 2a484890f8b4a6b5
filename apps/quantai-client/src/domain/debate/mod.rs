//! AI Debate Types
//!
//! Event and state types for one streamed analysis session. The backend
//! runs four agents (bull, bear, quant, CIO) and streams progress as typed
//! events; `DebateState::apply` folds them into the state the view renders.
//!
//! # Event Protocol
//!
//! ```json
//! {"type":"status","message":"Fetching live market data for AAPL..."}
//! {"type":"agent_done","agent":"bull","text":"..."}
//! {"type":"complete","data":{...}}
//! {"type":"error","message":"..."}
//! ```
//!
//! `complete` and `error` are terminal: once either has been applied, the
//! state no longer changes.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::chart::WireCandle;
use crate::domain::wire::{
    lenient_default, lenient_f64, lenient_map, lenient_string, lenient_strings, lenient_text_map,
    null_as_default,
};

// =============================================================================
// Agents
// =============================================================================

/// A debate participant.
///
/// Unknown ids are kept verbatim in `Other` rather than rejected, so a
/// backend that adds a fifth agent still renders.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentId {
    /// Argues the long case from fundamentals.
    Bull,
    /// Argues the short case from risks.
    Bear,
    /// Reads technicals and sentiment.
    Quant,
    /// Synthesizes the debate into a recommendation.
    Cio,
    /// Any agent id this client does not know.
    Other(String),
}

impl AgentId {
    /// Wire name of the agent.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bull => "bull",
            Self::Bear => "bear",
            Self::Quant => "quant",
            Self::Cio => "cio",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bull" => Self::Bull,
            "bear" => Self::Bear,
            "quant" => Self::Quant,
            "cio" => Self::Cio,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<AgentId> for String {
    fn from(value: AgentId) -> Self {
        match value {
            AgentId::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Final Analysis Payload
// =============================================================================

/// Explainability drivers behind the recommendation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XaiRationale {
    /// Metrics supporting the long case.
    #[serde(rename = "Top_Positive_Drivers", deserialize_with = "lenient_strings")]
    pub top_positive_drivers: Vec<String>,
    /// Risk factors from the bear case.
    #[serde(rename = "Top_Negative_Drivers", deserialize_with = "lenient_strings")]
    pub top_negative_drivers: Vec<String>,
}

/// The four scoring axes, each 0–100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubScores {
    /// Fundamentals-only score.
    #[serde(rename = "Fundamental", deserialize_with = "lenient_f64")]
    pub fundamental: Option<f64>,
    /// Technicals-only score.
    #[serde(rename = "Technical", deserialize_with = "lenient_f64")]
    pub technical: Option<f64>,
    /// Sentiment-only score.
    #[serde(rename = "Sentiment", deserialize_with = "lenient_f64")]
    pub sentiment: Option<f64>,
    /// Macro/risk-only score.
    #[serde(rename = "Macro_Risk", deserialize_with = "lenient_f64")]
    pub macro_risk: Option<f64>,
}

/// AI section of the final payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiAnalysis {
    /// Positive/negative drivers.
    #[serde(deserialize_with = "lenient_default")]
    pub xai_rationale: XaiRationale,
    /// Per-axis scores.
    #[serde(deserialize_with = "lenient_default")]
    pub sub_scores: SubScores,
    /// Final agent texts. When present this replaces the texts accumulated
    /// from `agent_done` events.
    #[serde(deserialize_with = "lenient_text_map")]
    pub debate: Option<BTreeMap<AgentId, String>>,
}

/// Immutable result of a completed analysis session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalAnalysis {
    /// Ticker symbol.
    #[serde(deserialize_with = "null_as_default")]
    pub ticker: String,
    /// Company name.
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    /// Recommendation score in `[0, 100]`.
    #[serde(deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    /// Recommendation label (e.g. `BUY`, `STRONG SELL`).
    #[serde(deserialize_with = "lenient_string")]
    pub recommendation: String,
    /// Narrative summary.
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    /// Last price.
    pub price: Option<Decimal>,
    /// Daily change in percent.
    #[serde(rename = "changePercent")]
    pub change_percent: Option<Decimal>,
    /// Market capitalization.
    #[serde(deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    /// Qualitative breakdown labels (technicals, valuation, risk...).
    #[serde(deserialize_with = "lenient_map")]
    pub breakdown: BTreeMap<String, serde_json::Value>,
    /// Fundamental metrics.
    #[serde(deserialize_with = "lenient_map")]
    pub metrics: BTreeMap<String, serde_json::Value>,
    /// Technical indicators.
    #[serde(deserialize_with = "lenient_map")]
    pub technicals: BTreeMap<String, serde_json::Value>,
    /// AI scoring and debate texts.
    #[serde(deserialize_with = "lenient_default")]
    pub ai_analysis: AiAnalysis,
    /// Recent daily candles.
    #[serde(rename = "chartData", deserialize_with = "lenient_default")]
    pub chart_data: Vec<WireCandle>,
}

// =============================================================================
// Events
// =============================================================================

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// Progress message; replaces the previous one.
    Status {
        /// Human-readable progress text.
        #[serde(default)]
        message: String,
    },
    /// An agent finished speaking.
    AgentDone {
        /// Which agent.
        agent: AgentId,
        /// The agent's full text.
        #[serde(default)]
        text: String,
    },
    /// Analysis finished (terminal).
    Complete {
        /// The final payload. A payload that cannot be read still ends the
        /// session, with an empty result.
        #[serde(default, deserialize_with = "complete_payload")]
        data: Box<FinalAnalysis>,
    },
    /// Backend reported a failure (terminal).
    Error {
        /// Error text, surfaced verbatim.
        #[serde(default)]
        message: String,
    },
    /// Any other `type`; ignored.
    #[serde(other)]
    Unknown,
}

fn complete_payload<'de, D>(deserializer: D) -> Result<Box<FinalAnalysis>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let analysis = serde_json::from_value(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Unreadable complete payload, keeping an empty result");
        FinalAnalysis::default()
    });
    Ok(Box::new(analysis))
}

impl DebateEvent {
    /// Wire discriminator, for logs and metric labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::AgentDone { .. } => "agent_done",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this event ends the session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

// =============================================================================
// State
// =============================================================================

/// Lifecycle phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No session has started.
    #[default]
    Idle,
    /// Events are being applied.
    Streaming,
    /// A `complete` event was applied.
    Completed,
    /// An `error` event was applied.
    Failed,
    /// The stream ended without a terminal event.
    Closed,
}

impl SessionPhase {
    /// Whether no further events may change the state.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Closed)
    }
}

/// Effect of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed; the session continues.
    Updated,
    /// Event had no effect.
    Ignored,
    /// State changed and the session is over.
    Terminal,
}

/// Accumulating state of one analysis session.
///
/// Owned by exactly one session. A new session starts from a fresh value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebateState {
    /// Latest progress message.
    pub status: String,
    /// Text per agent; last write wins.
    pub agents: BTreeMap<AgentId, String>,
    /// Set once by `complete`. Its presence means the session succeeded.
    pub result: Option<FinalAnalysis>,
    /// Set by `error`.
    pub error: Option<String>,
    /// Whether the session is still in flight.
    pub loading: bool,
    /// Lifecycle phase.
    pub phase: SessionPhase,
}

impl DebateState {
    /// Fresh state for a session that has just started streaming.
    #[must_use]
    pub fn streaming(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            loading: true,
            phase: SessionPhase::Streaming,
            ..Self::default()
        }
    }

    /// Fold one event into the state.
    ///
    /// Events arriving after a terminal event (or after `close`) are
    /// ignored.
    pub fn apply(&mut self, event: DebateEvent) -> Transition {
        if self.phase.is_finished() {
            return Transition::Ignored;
        }

        match event {
            DebateEvent::Status { message } => {
                self.status = message;
                Transition::Updated
            }
            DebateEvent::AgentDone { agent, text } => {
                self.agents.insert(agent, text);
                Transition::Updated
            }
            DebateEvent::Complete { data } => {
                if let Some(debate) = &data.ai_analysis.debate {
                    self.agents.clone_from(debate);
                }
                self.result = Some(*data);
                self.loading = false;
                self.phase = SessionPhase::Completed;
                Transition::Terminal
            }
            DebateEvent::Error { message } => {
                self.error = Some(message);
                self.loading = false;
                self.phase = SessionPhase::Failed;
                Transition::Terminal
            }
            DebateEvent::Unknown => Transition::Ignored,
        }
    }

    /// The stream ended. Clears `loading` without recording an error.
    ///
    /// Returns `false` when the session had already finished.
    pub fn close(&mut self) -> bool {
        if self.phase.is_finished() {
            return false;
        }
        self.loading = false;
        self.phase = SessionPhase::Closed;
        true
    }

    /// Text emitted by `agent`, if it has spoken.
    #[must_use]
    pub fn agent_text(&self, agent: &AgentId) -> Option<&str> {
        self.agents
            .get(agent)
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    /// Session result as seen by the caller.
    #[must_use]
    pub fn outcome(&self) -> AnalysisOutcome {
        match (&self.result, &self.error) {
            (Some(result), _) => AnalysisOutcome::Completed(Box::new(result.clone())),
            (None, Some(message)) => AnalysisOutcome::Failed(message.clone()),
            (None, None) => AnalysisOutcome::Closed,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// How an analysis request ended, one variant per failure kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// `complete` received.
    Completed(Box<FinalAnalysis>),
    /// Backend `error` event; the message is shown verbatim.
    Failed(String),
    /// 401/403, or no identity: show the paywall instead of an error.
    AccessDenied,
    /// The stream could not be opened, or the connection broke.
    TransportFailed(String),
    /// The stream ended without a terminal event.
    Closed,
    /// A newer session took over before this one finished.
    Superseded,
}

impl AnalysisOutcome {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::AccessDenied => "access_denied",
            Self::TransportFailed(_) => "transport_failed",
            Self::Closed => "closed",
            Self::Superseded => "superseded",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn status(message: &str) -> DebateEvent {
        DebateEvent::Status {
            message: message.to_string(),
        }
    }

    fn agent_done(agent: &str, text: &str) -> DebateEvent {
        DebateEvent::AgentDone {
            agent: AgentId::from(agent),
            text: text.to_string(),
        }
    }

    fn complete(json: &str) -> DebateEvent {
        DebateEvent::Complete {
            data: Box::new(serde_json::from_str(json).unwrap()),
        }
    }

    #[test]
    fn agent_id_round_trips_known_and_unknown_names() {
        assert_eq!(AgentId::from("bull"), AgentId::Bull);
        assert_eq!(AgentId::from("cio"), AgentId::Cio);
        assert_eq!(
            AgentId::from("macro"),
            AgentId::Other("macro".to_string())
        );
        assert_eq!(String::from(AgentId::Quant), "quant");
        assert_eq!(String::from(AgentId::Other("macro".into())), "macro");
    }

    #[test]
    fn status_is_overwritten_not_appended() {
        let mut state = DebateState::streaming("start");
        assert_eq!(state.apply(status("one")), Transition::Updated);
        assert_eq!(state.apply(status("two")), Transition::Updated);
        assert_eq!(state.status, "two");
        assert!(state.loading);
    }

    #[test]
    fn duplicate_agent_done_is_last_write_wins() {
        let mut state = DebateState::streaming("");
        state.apply(agent_done("bull", "first"));
        state.apply(agent_done("bull", "second"));
        assert_eq!(state.agent_text(&AgentId::Bull), Some("second"));
    }

    #[test]
    fn unknown_agent_is_stored_verbatim() {
        let mut state = DebateState::streaming("");
        state.apply(agent_done("macro", "rates are up"));
        assert_eq!(
            state.agent_text(&AgentId::Other("macro".into())),
            Some("rates are up")
        );
    }

    #[test]
    fn complete_replaces_agents_with_payload_debate() {
        let mut state = DebateState::streaming("");
        state.apply(agent_done("bull", "streamed bull"));
        state.apply(agent_done("cio", "streamed cio"));

        let transition = state.apply(complete(
            r#"{"ticker":"AAPL","score":72,"ai_analysis":{"debate":{"bull":"final bull","bear":"final bear"}}}"#,
        ));

        assert_eq!(transition, Transition::Terminal);
        assert_eq!(state.agent_text(&AgentId::Bull), Some("final bull"));
        assert_eq!(state.agent_text(&AgentId::Bear), Some("final bear"));
        assert_eq!(state.agent_text(&AgentId::Cio), None);
        assert!(!state.loading);
        assert_eq!(state.phase, SessionPhase::Completed);
        assert_eq!(state.result.as_ref().unwrap().ticker, "AAPL");
    }

    #[test]
    fn complete_without_debate_keeps_streamed_agents() {
        let mut state = DebateState::streaming("");
        state.apply(agent_done("bear", "streamed bear"));
        state.apply(complete(r#"{"ticker":"MSFT"}"#));
        assert_eq!(state.agent_text(&AgentId::Bear), Some("streamed bear"));
    }

    #[test]
    fn error_is_terminal_and_clears_loading() {
        let mut state = DebateState::streaming("");
        let transition = state.apply(DebateEvent::Error {
            message: "quota exceeded".into(),
        });
        assert_eq!(transition, Transition::Terminal);
        assert_eq!(state.error.as_deref(), Some("quota exceeded"));
        assert!(!state.loading);
        assert_eq!(state.outcome(), AnalysisOutcome::Failed("quota exceeded".into()));
    }

    #[test]
    fn events_after_complete_are_ignored() {
        let mut state = DebateState::streaming("");
        state.apply(complete(r#"{"ticker":"NVDA"}"#));
        let before = state.clone();

        assert_eq!(
            state.apply(DebateEvent::Error {
                message: "late".into()
            }),
            Transition::Ignored
        );
        assert_eq!(state.apply(status("late status")), Transition::Ignored);
        assert_eq!(state, before);
        assert!(state.error.is_none());
    }

    #[test]
    fn unknown_event_type_is_ignored() {
        let mut state = DebateState::streaming("s");
        assert_eq!(state.apply(DebateEvent::Unknown), Transition::Ignored);
        assert_eq!(state.status, "s");
    }

    #[test]
    fn close_clears_loading_without_error() {
        let mut state = DebateState::streaming("");
        state.apply(agent_done("bull", "x"));
        assert!(state.close());
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.phase, SessionPhase::Closed);
        assert_eq!(state.outcome(), AnalysisOutcome::Closed);
    }

    #[test]
    fn close_after_terminal_is_noop() {
        let mut state = DebateState::streaming("");
        state.apply(complete("{}"));
        assert!(!state.close());
        assert_eq!(state.phase, SessionPhase::Completed);
    }

    #[test]
    fn event_parses_from_wire_json() {
        let event: DebateEvent =
            serde_json::from_str(r#"{"type":"agent_done","agent":"quant","text":"RSI 61"}"#)
                .unwrap();
        assert_eq!(event, agent_done("quant", "RSI 61"));

        let event: DebateEvent = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(event, DebateEvent::Unknown);
    }

    #[test]
    fn final_analysis_tolerates_nulls() {
        let analysis: FinalAnalysis = serde_json::from_str(
            r#"{"ticker":"AAPL","name":null,"price":null,"metrics":{"pe_ratio":null},
                "ai_analysis":{"sub_scores":{"Fundamental":70,"Macro_Risk":40},"xai_rationale":null}}"#,
        )
        .unwrap();
        assert_eq!(analysis.name, "");
        assert!(analysis.price.is_none());
        assert_eq!(analysis.ai_analysis.sub_scores.fundamental, Some(70.0));
        assert!(analysis.ai_analysis.xai_rationale.top_positive_drivers.is_empty());
    }
}
