#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::items_after_statements
    )
)]

//! QuantAI Client - Streaming Analysis Consumer
//!
//! Client core for the QuantAI stock-analysis backend. Fetches snapshot
//! data (quotes, chart series, search hits, user profile) and consumes the
//! streamed "AI debate" for a ticker, folding it incrementally into view
//! state.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure types and state machines
//!   - `debate`: Debate events, `DebateState` reducer, final analysis payload
//!   - `stream`: UTF-8 stream decoder, `\n\n` event framer, event codec
//!   - `chart`: Chart series normalization, ghost points, percent change
//!   - `access`: Profile flags and the snapshot-vs-stream decision
//!   - `session`: Generation tokens for session supersession
//!   - `view`: View state and the scoped dashboard theme
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Backend and identity provider interfaces
//!   - `services`: View controller, stream driver, debounced search, admin,
//!     landing cards
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `http`: `reqwest` backend client
//!   - `identity`: Bearer-token identity provider
//!   - `config`: Environment configuration
//!   - `metrics`, `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//! GET /api/analyze/{ticker}
//!        │ bytes
//!        ▼
//!  Utf8StreamDecoder ─► EventFramer ─► EventCodec ─► DebateEvent
//!                                                        │
//!                          session token still current? ─┤
//!                                                        ▼
//!                                              ViewState.debate.apply()
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types and state machines.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::access::{AnalysisPlan, Identity, Trigger, UserProfile, plan_analysis};
pub use domain::chart::{CandlePoint, ChartError, ChartSeries, ChartTime, Timeframe, WireCandle};
pub use domain::debate::{
    AgentId, AnalysisOutcome, DebateEvent, DebateState, FinalAnalysis, SessionPhase, Transition,
};
pub use domain::market::{AdminUser, QuickStats, SearchHit};
pub use domain::session::{SessionGenerator, SessionToken};
pub use domain::stream::{EventCodec, EventFramer, Flow, StreamConsumer, Utf8StreamDecoder};
pub use domain::view::{AuthStatus, ViewState};

// Ports
pub use application::ports::{ApiError, AuthError, BackendPort, ChunkStream, IdentityProvider};

// Services
pub use application::services::{
    AdminConsole, AdminError, IdentitySubscription, LandingPage, SearchDebouncer, SearchResults,
    StreamEnd, TickerCard, TickerOutcome, ViewController, ViewError, consume_stream, load_landing,
};

// Infrastructure
pub use infrastructure::config::{BackendSettings, ClientConfig, ConfigError, IdentityCredentials};
pub use infrastructure::http::BackendClient;
pub use infrastructure::identity::StaticIdentity;
pub use infrastructure::metrics::init_metrics;
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
