//! Address-bar contract
//!
//! The controller reads the current query parameters once at startup (and on
//! explicit route changes) and writes them back through `navigate`. Only the
//! controller's URL sync writes; other navigation goes through the host.

use crate::filter::{ParamPatch, QueryParams};

/// How a navigation combines with the current parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Keep parameters the patch does not mention
    #[default]
    Merge,
    /// Drop everything the patch does not write
    Replace,
}

/// How a navigation is recorded in history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Rewrite the current entry in place (no page navigation)
    #[default]
    Replace,
    /// Add a new history entry
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigateOptions {
    pub merge_strategy: MergeStrategy,
    pub history_mode: HistoryMode,
}

impl NavigateOptions {
    /// In-place rewrite merged with unrelated parameters
    pub fn merge_replace() -> Self {
        Self {
            merge_strategy: MergeStrategy::Merge,
            history_mode: HistoryMode::Replace,
        }
    }
}

pub trait Router {
    fn current_query_params(&self) -> QueryParams;

    fn navigate(&mut self, patch: &ParamPatch, options: NavigateOptions);
}

/// In-process router: a path plus query parameters with a history stack
#[derive(Debug, Clone)]
pub struct MemoryRouter {
    path: String,
    history: Vec<QueryParams>,
    navigations: usize,
}

impl MemoryRouter {
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_params(path, QueryParams::new())
    }

    pub fn with_params(path: impl Into<String>, params: QueryParams) -> Self {
        Self {
            path: path.into(),
            history: vec![params],
            navigations: 0,
        }
    }

    /// Build from a URL such as `/en/search?q=acme`
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        Self::with_params(path, QueryParams::parse(url))
    }

    /// Simulate the user landing on new parameters (back button, pasted
    /// link). Does not count as a controller navigation.
    pub fn visit(&mut self, params: QueryParams) {
        self.history.push(params);
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.path, self.current())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of `navigate` calls received
    pub fn navigations(&self) -> usize {
        self.navigations
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn current(&self) -> &QueryParams {
        // history is never empty
        &self.history[self.history.len() - 1]
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Router for MemoryRouter {
    fn current_query_params(&self) -> QueryParams {
        self.current().clone()
    }

    fn navigate(&mut self, patch: &ParamPatch, options: NavigateOptions) {
        let mut next = match options.merge_strategy {
            MergeStrategy::Merge => self.current().clone(),
            MergeStrategy::Replace => QueryParams::new(),
        };
        next.merge_patch(patch);

        match options.history_mode {
            HistoryMode::Replace => {
                let last = self.history.len() - 1;
                self.history[last] = next;
            }
            HistoryMode::Push => self.history.push(next),
        }
        self.navigations += 1;
        tracing::debug!(url = %self.url(), ?options, "Router navigated");
    }
}
