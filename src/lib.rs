//! # facetsync - Filter-state synchronization for faceted record search
//!
//! facetsync keeps four surfaces of a search page consistent: the on-screen
//! form, the typed filter values, the address-bar query string and the
//! backend query. Each is updated only through the controller, so there are
//! no feedback loops between URL rewrites and route reads.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`filter`] - Field specifications, query-string parameters and the `FieldSet`
//! - [`search`] - Loader and router contracts, facets, pagination and the controller
//! - [`typeahead`] - Debounced, last-request-wins autocomplete
//! - [`fixture`] - JSON-file backend used by the CLI and tests
//! - [`output`] - Terminal rendering
//! - [`utils`] - Application configuration
//! - [`error`] - Error taxonomy
//!
//! ## Quick Start
//!
//! ```ignore
//! use facetsync::filter::standard_fields;
//! use facetsync::fixture::FixtureBackend;
//! use facetsync::search::{ControllerConfig, MemoryRouter, SearchController};
//!
//! let backend = FixtureBackend::load_file("records.json".as_ref())?;
//! let mut controller = SearchController::new(
//!     ControllerConfig::default(),
//!     standard_fields(),
//!     backend.clone(),
//!     backend.credential_types(),
//!     MemoryRouter::from_url("/search?q=acme"),
//! )?;
//!
//! // Event loop tick: URL sync, refreshes, loader completions
//! controller.poll();
//! ```

pub mod error;
pub mod filter;
pub mod fixture;
pub mod output;
pub mod search;
pub mod typeahead;
pub mod utils;

pub use error::{Result, SearchError};
