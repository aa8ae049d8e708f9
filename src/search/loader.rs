//! List loader contract
//!
//! The loader is the only place a backend query happens. It hands back a
//! [`Pending`] completion immediately; the controller polls it from its event
//! loop, the same way a background search thread reports back over a channel.

use crate::error::SearchError;
use crate::search::query::{ListResult, SearchQuery};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

/// Backend or transport failure reported by a loader
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<LoadError> for SearchError {
    fn from(err: LoadError) -> Self {
        SearchError::QueryFailure {
            message: err.message,
        }
    }
}

pub type LoadOutcome<T> = Result<ListResult<T>, LoadError>;

/// Outcome of polling a pending request
#[derive(Debug, PartialEq)]
pub enum PendingPoll<T> {
    Ready(T),
    Pending,
    /// The producer went away without answering
    Abandoned,
}

/// Producer side of a pending request
pub struct Completer<T> {
    tx: Sender<T>,
}

impl<T> Completer<T> {
    /// Deliver the outcome. Fails with [`SearchError::Canceled`] when the
    /// requester has already dropped interest (superseded or disposed).
    pub fn complete(self, outcome: T) -> crate::error::Result<()> {
        self.tx.send(outcome).map_err(|_| SearchError::Canceled)
    }
}

/// Requester side of a pending request. Dropping it cancels interest: a
/// later `complete` on the other side is discarded.
pub struct Pending<T> {
    rx: Receiver<T>,
}

impl<T> Pending<T> {
    pub fn channel() -> (Completer<T>, Pending<T>) {
        let (tx, rx) = mpsc::channel();
        (Completer { tx }, Pending { rx })
    }

    /// An already-completed request
    pub fn ready(outcome: T) -> Self {
        let (completer, pending) = Self::channel();
        // The receiver is alive, so this cannot fail
        let _ = completer.complete(outcome);
        pending
    }

    /// Run `work` on a background thread and report its outcome
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (completer, pending) = Self::channel();
        thread::spawn(move || {
            if completer.complete(work()).is_err() {
                tracing::trace!("Background request finished after its requester went away");
            }
        });
        pending
    }

    /// Non-blocking check for the outcome
    pub fn poll(&self) -> PendingPoll<T> {
        match self.rx.try_recv() {
            Ok(outcome) => PendingPoll::Ready(outcome),
            Err(TryRecvError::Empty) => PendingPoll::Pending,
            Err(TryRecvError::Disconnected) => PendingPoll::Abandoned,
        }
    }
}

pub type PendingLoad<T> = Pending<LoadOutcome<T>>;

/// Source of result pages for a [`SearchQuery`]
pub trait ListLoader {
    type Item;

    /// Start loading a page. Must not block.
    fn load(&mut self, query: SearchQuery) -> PendingLoad<Self::Item>;

    /// Release any resources held for outstanding requests
    fn dispose(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_ready_is_immediately_available() {
        let pending: PendingLoad<u8> = Pending::ready(Ok(ListResult::empty(1)));
        assert!(matches!(pending.poll(), PendingPoll::Ready(Ok(_))));
        assert_eq!(pending.poll(), PendingPoll::Abandoned);
    }

    #[test]
    fn test_channel_pending_until_completed() {
        let (completer, pending) = Pending::<u32>::channel();
        assert_eq!(pending.poll(), PendingPoll::Pending);
        completer.complete(7).unwrap();
        assert_eq!(pending.poll(), PendingPoll::Ready(7));
    }

    #[test]
    fn test_complete_after_drop_is_canceled() {
        let (completer, pending) = Pending::<u32>::channel();
        drop(pending);
        assert_eq!(completer.complete(7), Err(SearchError::Canceled));
    }

    #[test]
    fn test_dropped_completer_abandons() {
        let (completer, pending) = Pending::<u32>::channel();
        drop(completer);
        assert_eq!(pending.poll(), PendingPoll::Abandoned);
    }

    #[test]
    fn test_spawn_reports_back() {
        let pending = Pending::spawn(|| 40 + 2);
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match pending.poll() {
                PendingPoll::Ready(value) => {
                    assert_eq!(value, 42);
                    break;
                }
                PendingPoll::Pending if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                other => panic!("unexpected poll result: {:?}", other),
            }
        }
    }

    #[test]
    fn test_load_error_converts() {
        let err: SearchError = LoadError::new("timeout").into();
        assert_eq!(err, SearchError::QueryFailure { message: "timeout".to_string() });
    }
}
