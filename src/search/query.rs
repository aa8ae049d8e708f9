//! Query snapshots and result pages exchanged with the list loader

use crate::filter::{FieldValues, PAGE_FIELD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_PAGE: u32 = 1;

/// Immutable snapshot of the effective filter values sent to the loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub params: FieldValues,
    pub page_size: u32,
}

impl SearchQuery {
    pub fn new(params: FieldValues, page_size: u32) -> Self {
        Self { params, page_size }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Requested page; absent or malformed page numbers mean the first page
    pub fn page(&self) -> u32 {
        self.get(PAGE_FIELD)
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|&page| page >= 1)
            .unwrap_or(DEFAULT_PAGE)
    }

    /// Zero-based index of the first record on the requested page
    pub fn offset(&self) -> usize {
        (self.page() as usize - 1) * self.page_size as usize
    }
}

/// One `(value, count)` pair of a facet distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

impl FacetCount {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// A page of results with the facet distributions computed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub data: Vec<T>,
    /// Field name -> distribution, in backend order
    #[serde(default)]
    pub facets: BTreeMap<String, Vec<FacetCount>>,
    pub total: u64,
    pub page: u32,
}

/// Position of a page within the full result set (1-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRange {
    pub first: u64,
    pub last: u64,
    pub total: u64,
}

impl<T> ListResult<T> {
    pub fn empty(page: u32) -> Self {
        Self {
            data: Vec::new(),
            facets: BTreeMap::new(),
            total: 0,
            page,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Records shown on this page, or `None` for an empty page
    pub fn range(&self, page_size: u32) -> Option<ResultRange> {
        if self.data.is_empty() {
            return None;
        }
        let first = u64::from(self.page.max(1) - 1) * u64::from(page_size) + 1;
        let last = (first + self.data.len() as u64 - 1).min(self.total.max(first));
        Some(ResultRange {
            first,
            last,
            total: self.total,
        })
    }

    pub fn has_next(&self, page_size: u32) -> bool {
        u64::from(self.page) * u64::from(page_size) < self.total
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

impl std::fmt::Display for ResultRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} of {}", self.first, self.last, self.total)
    }
}
