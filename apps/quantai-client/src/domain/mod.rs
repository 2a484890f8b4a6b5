//! Domain Layer - Core types and state machines.
//!
//! Everything here is synchronous. The only external dependencies are
//! serialization, decimal arithmetic and time zone support.

/// Profile flags and the snapshot-vs-stream decision.
pub mod access;

/// Chart series normalization and ghost points.
pub mod chart;

/// Debate events and the `DebateState` reducer.
pub mod debate;

/// Snapshot payloads (quick stats, search hits, admin users).
pub mod market;

/// Session identity tokens.
pub mod session;

/// Byte stream decoding and event framing.
pub mod stream;

/// View state and theme derivation.
pub mod view;

mod wire;
