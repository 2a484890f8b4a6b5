//! Application Ports
//!
//! Driven (outbound) ports implemented by the infrastructure layer:
//!
//! - `BackendPort`: QuantAI REST and streaming endpoints
//! - `IdentityProvider`: Signed-in user and bearer tokens

mod backend_port;
mod identity_port;

pub use backend_port::{ApiError, BackendPort, ChunkStream};
pub use identity_port::{AuthError, IdentityProvider};
