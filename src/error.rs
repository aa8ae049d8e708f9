//! Error taxonomy for the synchronization engine.
//!
//! Only [`SearchError::Validation`] and [`SearchError::QueryFailure`] are meant
//! to reach the user. The rest are programmer-time invariants or concurrency
//! bookkeeping.

use thiserror::Error;

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Submission rejected because none of the required fields hold a value.
    #[error("blank query: one of {fields:?} must be filled in")]
    Validation { fields: Vec<String> },

    /// A field name that is not part of the filter specification.
    #[error("unknown filter field: {name}")]
    UnknownField { name: String },

    /// Two specs in one field set share a name (or alias).
    #[error("duplicate filter field: {name}")]
    DuplicateField { name: String },

    /// The list loader reported a backend or transport failure.
    #[error("query failed: {message}")]
    QueryFailure { message: String },

    /// A request was superseded before it completed.
    #[error("request canceled")]
    Canceled,

    /// The owning controller has been torn down.
    #[error("controller disposed")]
    Disposed,
}

impl SearchError {
    /// Whether the UI layer should show this error to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, SearchError::Validation { .. } | SearchError::QueryFailure { .. })
    }

    pub fn unknown_field(name: impl Into<String>) -> Self {
        SearchError::UnknownField { name: name.into() }
    }
}
