//! Debounced ticker search.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::application::ports::BackendPort;
use crate::domain::market::SearchHit;
use crate::infrastructure::metrics::{self, Endpoint};

/// Latest search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    /// Query the results (or the request in flight) belong to.
    pub query: String,
    /// Matching symbols.
    pub hits: Vec<SearchHit>,
    /// A request for `query` is pending.
    pub loading: bool,
}

/// Search box backend.
///
/// Each [`query`](Self::query) cancels the previous pending request and
/// schedules a new one after the debounce delay. Results are published on
/// a `watch` channel. Dropping the debouncer cancels anything pending.
pub struct SearchDebouncer<B> {
    backend: Arc<B>,
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
    results: Arc<watch::Sender<SearchResults>>,
}

impl<B> std::fmt::Debug for SearchDebouncer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchDebouncer")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl<B: BackendPort + 'static> SearchDebouncer<B> {
    /// Default debounce delay.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

    /// Create a debouncer.
    #[must_use]
    pub fn new(backend: Arc<B>, delay: Duration) -> Self {
        let (results, _) = watch::channel(SearchResults::default());
        Self {
            backend,
            delay,
            pending: Mutex::new(None),
            results: Arc::new(results),
        }
    }

    /// Receive published results.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results.subscribe()
    }

    /// Current results.
    #[must_use]
    pub fn results(&self) -> SearchResults {
        self.results.borrow().clone()
    }

    /// The user typed `query`.
    ///
    /// A blank query clears the results immediately. Must be called from
    /// within a tokio runtime.
    pub fn query(&self, query: &str) {
        let query = query.trim().to_string();
        let cancel = CancellationToken::new();
        if let Some(previous) = self.pending.lock().replace(cancel.clone()) {
            previous.cancel();
        }

        if query.is_empty() {
            self.results.send_replace(SearchResults::default());
            return;
        }

        self.results.send_modify(|current| {
            current.query.clone_from(&query);
            current.loading = true;
        });

        let backend = Arc::clone(&self.backend);
        let results = Arc::clone(&self.results);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            let fetched = tokio::select! {
                () = cancel.cancelled() => return,
                fetched = backend.search(&query) => fetched,
            };
            metrics::record_request(Endpoint::Search, fetched.is_ok());

            results.send_if_modified(|current| {
                if cancel.is_cancelled() || current.query != query {
                    return false;
                }
                current.loading = false;
                match fetched {
                    Ok(hits) => current.hits = hits,
                    Err(err) => {
                        tracing::warn!(error = %err, query, "Search failed, keeping previous results");
                    }
                }
                true
            });
        });
    }

    /// Cancel the pending request, if any.
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.cancel();
        }
    }
}

impl<B> Drop for SearchDebouncer<B> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.cancel();
        }
    }
}
