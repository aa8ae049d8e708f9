//! Typeahead suggestions for the free-text field.
//!
//! [`TypeaheadAdapter`] turns raw keystrokes into suggestion lists: input is
//! debounced, repeats of the last term are dropped, and each surviving term
//! issues one request to a [`SuggestionSource`]. Issuing a request drops the
//! previous one, so an older answer can never overwrite a newer one.
//!
//! The adapter is polled from the caller's event loop like the rest of the
//! crate; `*_at` variants take the current instant for deterministic tests.

pub mod debouncer;

pub use debouncer::InputDebouncer;

use crate::search::loader::{LoadError, Pending, PendingPoll};
use crate::utils::AppConfig;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// One autocomplete entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Display text, also what the input is set to when picked
    pub term: String,
}

impl Suggestion {
    pub fn new(term: impl Into<String>) -> Self {
        Self { term: term.into() }
    }
}

pub type SuggestionOutcome = Result<Vec<Suggestion>, LoadError>;
pub type PendingSuggestions = Pending<SuggestionOutcome>;

/// Backend autocomplete endpoint
pub trait SuggestionSource {
    /// Start a suggestion request for a non-blank term. Must not block.
    fn suggest(&mut self, term: &str) -> PendingSuggestions;
}

struct InFlightSuggestions {
    term: String,
    pending: PendingSuggestions,
}

pub struct TypeaheadAdapter<S: SuggestionSource> {
    source: S,
    debouncer: InputDebouncer,
    in_flight: Option<InFlightSuggestions>,
    /// None when caching is disabled
    cache: Option<LruCache<String, Vec<Suggestion>>>,
    /// Term behind the most recent (or upcoming) emission
    last_term: Option<String>,
    requests_issued: usize,
}

impl<S: SuggestionSource> TypeaheadAdapter<S> {
    /// `cache_size` of 0 disables the suggestion cache
    pub fn new(source: S, debounce: Duration, cache_size: usize) -> Self {
        Self {
            source,
            debouncer: InputDebouncer::new(debounce),
            in_flight: None,
            cache: NonZeroUsize::new(cache_size).map(LruCache::new),
            last_term: None,
            requests_issued: 0,
        }
    }

    pub fn from_app_config(source: S, config: &AppConfig) -> Self {
        Self::new(
            source,
            Duration::from_millis(config.typeahead_debounce_ms),
            config.suggestion_cache_size,
        )
    }

    pub fn push_input(&mut self, value: &str) {
        self.push_input_at(value, Instant::now());
    }

    /// Feed the current content of the text input
    pub fn push_input_at(&mut self, value: &str, now: Instant) {
        self.debouncer.push_at(value.trim(), now);
    }

    pub fn poll(&mut self) -> Option<Vec<Suggestion>> {
        self.poll_at(Instant::now())
    }

    /// Advance the pipeline. Returns a suggestion list when one is ready:
    /// right away for blank or cached terms, otherwise once the source
    /// answers. A failed request yields an empty list.
    pub fn poll_at(&mut self, now: Instant) -> Option<Vec<Suggestion>> {
        if let Some(term) = self.debouncer.flush_at(now) {
            if let Some(immediate) = self.start(term) {
                return Some(immediate);
            }
        }
        self.poll_in_flight()
    }

    /// Time until buffered input is released, for sizing the event-loop wait
    pub fn time_until_ready_at(&self, now: Instant) -> Option<Duration> {
        self.debouncer.time_until_ready_at(now)
    }

    /// Whether a request is outstanding
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Term the latest emitted (or awaited) list belongs to
    pub fn last_term(&self) -> Option<&str> {
        self.last_term.as_deref()
    }

    pub fn requests_issued(&self) -> usize {
        self.requests_issued
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Start over: forget buffered input, the last term and any outstanding
    /// request. The cache survives.
    pub fn reset(&mut self) {
        self.debouncer.clear();
        self.last_term = None;
        self.cancel_in_flight();
    }

    fn start(&mut self, term: String) -> Option<Vec<Suggestion>> {
        self.cancel_in_flight();
        self.last_term = Some(term.clone());

        if term.is_empty() {
            return Some(Vec::new());
        }
        if let Some(cached) = self.cache.as_mut().and_then(|cache| cache.get(&term)) {
            tracing::trace!(term = %term, "Typeahead cache hit");
            return Some(cached.clone());
        }

        tracing::debug!(term = %term, "Requesting suggestions");
        let pending = self.source.suggest(&term);
        self.requests_issued += 1;
        self.in_flight = Some(InFlightSuggestions { term, pending });
        None
    }

    fn cancel_in_flight(&mut self) {
        if let Some(superseded) = self.in_flight.take() {
            tracing::debug!(term = %superseded.term, "Canceled superseded suggestion request");
        }
    }

    fn poll_in_flight(&mut self) -> Option<Vec<Suggestion>> {
        let flight = self.in_flight.as_ref()?;
        let outcome = match flight.pending.poll() {
            PendingPoll::Pending => return None,
            PendingPoll::Ready(outcome) => outcome,
            PendingPoll::Abandoned => Err(LoadError::new("suggestion source dropped the request")),
        };
        let flight = self.in_flight.take()?;

        match outcome {
            Ok(suggestions) => {
                if let Some(cache) = self.cache.as_mut() {
                    cache.put(flight.term, suggestions.clone());
                }
                Some(suggestions)
            }
            Err(err) => {
                tracing::warn!(term = %flight.term, error = %err, "Suggestion request failed");
                Some(Vec::new())
            }
        }
    }
}
