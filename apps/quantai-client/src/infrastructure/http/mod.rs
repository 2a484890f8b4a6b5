//! HTTP Module
//!
//! `reqwest` adapter implementing the backend port.

mod client;

pub use client::BackendClient;
