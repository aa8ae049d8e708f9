//! Utility functions and data structures.
//!
//! - [`app_data`] - Application configuration in the platform config directory

pub mod app_data;

pub use app_data::*;
