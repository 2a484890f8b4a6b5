//! Session tokens.
//!
//! Every ticker request, timeframe change and analysis run is issued a
//! token with a strictly increasing generation. Async results carry their
//! token back and are applied only if it is still the active one, so a slow
//! response for a superseded ticker can never overwrite newer state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Identity of one request lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken {
    generation: u64,
    ticker: String,
    correlation: Uuid,
}

impl SessionToken {
    /// Monotonic generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Ticker the session was opened for.
    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Correlation id for logs.
    #[must_use]
    pub const fn correlation(&self) -> Uuid {
        self.correlation
    }

    /// Whether `other` was issued after this token.
    #[must_use]
    pub const fn is_superseded_by(&self, other: &Self) -> bool {
        other.generation > self.generation
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.ticker, self.generation)
    }
}

/// Issues session tokens.
#[derive(Debug, Default)]
pub struct SessionGenerator {
    next: AtomicU64,
}

impl SessionGenerator {
    /// Create a generator starting at generation 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Issue a token for `ticker`, superseding every earlier token.
    pub fn issue(&self, ticker: impl Into<String>) -> SessionToken {
        let generation = self.next.fetch_add(1, Ordering::AcqRel) + 1;
        SessionToken {
            generation,
            ticker: ticker.into(),
            correlation: Uuid::new_v4(),
        }
    }

    /// Generation of the most recently issued token.
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase() {
        let sessions = SessionGenerator::new();
        let first = sessions.issue("AAPL");
        let second = sessions.issue("TSLA");

        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 2);
        assert!(first.is_superseded_by(&second));
        assert!(!second.is_superseded_by(&first));
        assert_eq!(sessions.latest(), 2);
        assert_ne!(first.correlation(), second.correlation());
        assert_eq!(second.to_string(), "TSLA#2");
    }
}
