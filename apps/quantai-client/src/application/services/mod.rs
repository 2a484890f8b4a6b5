//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `ViewController`: Snapshot loads, analysis sessions, supersession
//! - `consume_stream`: Drives one analysis body through the stream decoder
//! - `SearchDebouncer`: Debounced symbol search
//! - `AdminConsole`: User listing and Pro entitlement toggling
//! - `load_landing`: Landing page ticker cards

mod admin;
mod analysis;
mod landing;
mod search;
mod view;

pub use admin::{AdminConsole, AdminError, plan_counts};
pub use analysis::{StreamEnd, consume_stream};
pub use landing::{
    LandingPage, PLACEHOLDER_SCORE, PLACEHOLDER_SIGNAL, RECENT_SCANS, TOP_PICKS, TickerCard, load_card,
    load_landing,
};
pub use search::{SearchDebouncer, SearchResults};
pub use view::{IdentitySubscription, TickerOutcome, ViewController, ViewError};
