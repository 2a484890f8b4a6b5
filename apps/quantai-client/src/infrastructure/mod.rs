//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Environment configuration.
pub mod config;

/// `reqwest` backend client.
pub mod http;

/// Bearer-token identity provider.
pub mod identity;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;
