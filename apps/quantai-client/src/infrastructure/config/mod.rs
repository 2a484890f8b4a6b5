//! Configuration Module
//!
//! Environment configuration for the client.

mod settings;

pub use settings::{
    BackendSettings, ClientConfig, ConfigError, DEFAULT_API_URL, IdentityCredentials,
};
