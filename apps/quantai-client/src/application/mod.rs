//! Application Layer - Use cases and port definitions.
//!
//! Services here coordinate the domain state machines with the backend
//! and identity ports. Nothing in this layer knows about HTTP.

/// Port interfaces for the backend and the identity provider.
pub mod ports;

/// View controller, stream driver, debounced search and admin console.
pub mod services;
