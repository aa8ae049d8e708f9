//! Page navigation
//!
//! The page number lives in the field set like any other filter, so a page
//! turn flows through the same change and URL-sync pipeline.

use crate::error::Result;
use crate::filter::{ChangeSource, FieldSet};
use crate::search::query::ListResult;

const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

impl NavDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "previous" | "prev" => Some(NavDirection::Previous),
            "next" => Some(NavDirection::Next),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            NavDirection::Previous => "previous",
            NavDirection::Next => "next",
        }
    }
}

/// Reads and moves the page field of a [`FieldSet`]
#[derive(Debug, Clone)]
pub struct Pagination {
    field: String,
}

impl Pagination {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Current page; malformed or non-positive values read as page 1
    pub fn current(&self, fields: &FieldSet) -> u32 {
        fields
            .get_field_value(&self.field)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|&page| page >= FIRST_PAGE)
            .unwrap_or(FIRST_PAGE)
    }

    /// Page reached from `current` in `direction`, never below 1
    pub fn target(current: u32, direction: NavDirection) -> u32 {
        match direction {
            NavDirection::Previous => current.saturating_sub(1).max(FIRST_PAGE),
            NavDirection::Next => current.saturating_add(1),
        }
    }

    /// Move the page field and return the new page number
    pub fn navigate(&self, fields: &mut FieldSet, direction: NavDirection) -> Result<u32> {
        let page = Self::target(self.current(fields), direction);
        let rendered = page.to_string();
        fields.update_from(
            [(self.field.as_str(), Some(rendered.as_str()))],
            ChangeSource::Pagination,
        )?;
        Ok(page)
    }

    /// Partial update that puts the page back to its default
    pub fn reset_entry(&self) -> (String, Option<String>) {
        (self.field.clone(), None)
    }

    pub fn next_page<T>(result: &ListResult<T>, page_size: u32) -> Option<u32> {
        result.has_next(page_size).then(|| result.page.saturating_add(1))
    }

    pub fn previous_page<T>(result: &ListResult<T>) -> Option<u32> {
        result.has_previous().then(|| result.page - 1)
    }
}
