//! Search orchestration.
//!
//! - [`query`] - Backend query and result page types
//! - [`loader`] - Asynchronous list loader contract
//! - [`router`] - Address-bar contract and an in-memory router
//! - [`facets`] - Facet counts to select options
//! - [`pagination`] - Page field navigation
//! - [`form`] - On-screen form state
//! - [`controller`] - The state machine tying them together

pub mod controller;
pub mod facets;
pub mod form;
pub mod loader;
pub mod pagination;
pub mod query;
pub mod router;

pub use controller::{ControllerConfig, ControllerState, RefreshHandle, SearchController};
pub use facets::{extract_facets, FacetOptions};
pub use form::SearchForm;
pub use loader::{Completer, ListLoader, LoadError, LoadOutcome, Pending, PendingLoad, PendingPoll};
pub use pagination::{NavDirection, Pagination};
pub use query::{FacetCount, ListResult, ResultRange, SearchQuery};
pub use router::{HistoryMode, MemoryRouter, MergeStrategy, NavigateOptions, Router};
