//! Search controller
//!
//! Orchestrates the four state surfaces of a record search: the on-screen
//! form, the field set, the address bar and the backend query. It is driven
//! from a single event loop: user actions call [`SearchController::submit`],
//! [`SearchController::on_nav`] or [`SearchController::route_changed`], and
//! every tick calls [`SearchController::poll`] to pick up URL-sync work,
//! refresh requests and loader completions.
//!
//! ```text
//! Initializing -> Ready <-> Searching -> Ready
//!                              |
//!                              +-> Error -> (submit) -> Searching
//! ```
//!
//! Feedback loops are broken by provenance rather than ordering: values
//! applied from the route are tagged [`ChangeSource::Route`] and the URL sync
//! never writes them back.

use crate::error::{Result, SearchError};
use crate::filter::{
    ChangeSource, FieldChange, FieldOption, FieldSet, FieldValues, FilterFieldSpec, QueryParams,
    Subscription, CATEGORY_FIELD, CREDENTIAL_TYPE_FIELD, PAGE_FIELD, TEXT_FIELD,
};
use crate::search::facets::extract_facets;
use crate::search::form::SearchForm;
use crate::search::loader::{ListLoader, PendingLoad, PendingPoll};
use crate::search::pagination::{NavDirection, Pagination};
use crate::search::query::{ListResult, SearchQuery};
use crate::search::router::{NavigateOptions, Router};
use crate::utils::AppConfig;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

/// Page size used for the static option preload
const PRELOAD_PAGE_SIZE: u32 = 100;

/// Controller wiring: which fields play which role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub page_size: u32,
    /// Free-text field (one of the two that satisfy the blank-query rule)
    pub text_field: String,
    /// Category field (the other one)
    pub category_field: String,
    pub page_field: String,
    /// Field whose options come from the static preload
    pub preload_field: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            text_field: TEXT_FIELD.to_string(),
            category_field: CATEGORY_FIELD.to_string(),
            page_field: PAGE_FIELD.to_string(),
            preload_field: CREDENTIAL_TYPE_FIELD.to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            ..Self::default()
        }
    }

    /// Fields of which at least one must be filled before a search
    pub fn required_fields(&self) -> [&str; 2] {
        [self.text_field.as_str(), self.category_field.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Initializing,
    Ready,
    Searching,
    /// The last search failed; a new submission may retry
    Error,
    Disposed,
}

/// Lets other parts of the application ask for the current query to be re-run
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: Sender<()>,
}

impl RefreshHandle {
    pub fn request(&self) -> Result<()> {
        self.tx.send(()).map_err(|_| SearchError::Disposed)
    }
}

struct InFlightSearch<T> {
    generation: u64,
    query: SearchQuery,
    pending: PendingLoad<T>,
    started: Instant,
}

pub struct SearchController<L: ListLoader, P: ListLoader, R: Router> {
    config: ControllerConfig,
    fields: FieldSet,
    form: SearchForm,
    pagination: Pagination,
    loader: L,
    preload: P,
    router: R,
    state: ControllerState,
    blank_query: bool,
    /// Opens on the first accepted submission; never closes
    latch_open: bool,
    url_sync: Subscription<FieldChange>,
    /// Parameters most recently written to (or read from) the router
    last_synced: QueryParams,
    refresh_tx: Option<Sender<()>>,
    refresh_rx: Option<Receiver<()>>,
    in_flight: Option<InFlightSearch<L::Item>>,
    preload_pending: Option<PendingLoad<P::Item>>,
    generation: u64,
    result: Option<ListResult<L::Item>>,
    last_error: Option<SearchError>,
    last_duration: Option<Duration>,
}

impl<L: ListLoader, P: ListLoader, R: Router> SearchController<L, P, R> {
    /// Build and initialize a controller.
    ///
    /// Starts the static option preload, applies the router's current query
    /// parameters as the initial values (without rewriting the URL), and
    /// becomes `Ready`. A search is issued right away only if the route
    /// already encodes a non-blank query.
    ///
    /// Fails with [`SearchError::UnknownField`] or
    /// [`SearchError::DuplicateField`] when `specs` do not match the config.
    /// The loaders are disposed on failure.
    pub fn new(
        config: ControllerConfig,
        specs: Vec<FilterFieldSpec>,
        mut loader: L,
        mut preload: P,
        router: R,
    ) -> Result<Self> {
        let mut fields = match FieldSet::new(specs) {
            Ok(fields) => fields,
            Err(err) => {
                loader.dispose();
                preload.dispose();
                return Err(err);
            }
        };
        let url_sync = fields.subscribe();
        let (refresh_tx, refresh_rx) = mpsc::channel();
        let pagination = Pagination::new(config.page_field.clone());

        let mut controller = Self {
            config,
            fields,
            form: SearchForm::new(),
            pagination,
            loader,
            preload,
            router,
            state: ControllerState::Initializing,
            blank_query: false,
            latch_open: false,
            url_sync,
            last_synced: QueryParams::new(),
            refresh_tx: Some(refresh_tx),
            refresh_rx: Some(refresh_rx),
            in_flight: None,
            preload_pending: None,
            generation: 0,
            result: None,
            last_error: None,
            last_duration: None,
        };

        // Dropping the controller on any error below disposes it
        controller.initialize()?;
        Ok(controller)
    }

    fn initialize(&mut self) -> Result<()> {
        for name in [
            &self.config.text_field,
            &self.config.category_field,
            &self.config.page_field,
            &self.config.preload_field,
        ] {
            if !self.fields.contains(name) {
                return Err(SearchError::unknown_field(name.as_str()));
            }
        }

        self.preload_pending = Some(
            self.preload
                .load(SearchQuery::new(FieldValues::new(), PRELOAD_PAGE_SIZE)),
        );

        let params = self.router.current_query_params();
        self.fields.apply_params(&params, ChangeSource::Route)?;
        self.last_synced = self.fields.query_params();
        self.form.patch_from(&self.fields);

        // Any visible filter arriving with the route counts as prior intent
        self.latch_open = self
            .fields
            .specs()
            .any(|spec| !spec.hidden && self.fields.has_value(&spec.name));

        tracing::debug!(
            route = %params,
            values = ?self.fields.values(),
            latch_open = self.latch_open,
            "Search controller initialized"
        );
        self.set_state(ControllerState::Ready);

        if self.has_required_values() {
            self.start_search()?;
        }
        Ok(())
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Read-only view of filter values and options for rendering
    pub fn filters(&self) -> &FieldSet {
        &self.fields
    }

    pub fn form(&self) -> &SearchForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SearchForm {
        &mut self.form
    }

    /// Whether the last submission was rejected by the blank-query rule
    pub fn blank_query(&self) -> bool {
        self.blank_query
    }

    pub fn is_latched(&self) -> bool {
        self.latch_open
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn results(&self) -> Option<&ListResult<L::Item>> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&SearchError> {
        self.last_error.as_ref()
    }

    /// Time the most recent completed search took
    pub fn search_duration(&self) -> Option<Duration> {
        self.last_duration
    }

    /// Query currently being loaded
    pub fn pending_query(&self) -> Option<&SearchQuery> {
        self.in_flight.as_ref().map(|flight| &flight.query)
    }

    pub fn current_page(&self) -> u32 {
        self.pagination.current(&self.fields)
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Mutable router access for the host (e.g. to record a back
    /// navigation before calling [`SearchController::route_changed`])
    pub fn router_mut(&mut self) -> &mut R {
        &mut self.router
    }

    pub fn refresh_handle(&self) -> Result<RefreshHandle> {
        self.refresh_tx
            .as_ref()
            .map(|tx| RefreshHandle { tx: tx.clone() })
            .ok_or(SearchError::Disposed)
    }

    /// Accept the form.
    ///
    /// Rejected with [`SearchError::Validation`] when neither the text nor
    /// the category control is filled: `blank_query` is raised, the form is
    /// marked touched, and nothing else happens. Otherwise the form is copied
    /// into the field set (back on page 1), the latch opens and a search
    /// starts.
    pub fn submit(&mut self) -> Result<()> {
        self.ensure_live()?;

        let required = self.config.required_fields();
        if !required.iter().any(|field| self.form.is_filled(field)) {
            tracing::info!("Rejected blank search submission");
            return Err(self.reject_blank());
        }

        let mut partial = self.form.to_partial(&self.fields);
        partial.push(self.pagination.reset_entry());
        self.fields.update_from(partial, ChangeSource::User)?;

        self.form.reset_touched();
        if !self.latch_open {
            tracing::debug!("Search latch opened");
            self.latch_open = true;
        }
        self.start_search()
    }

    /// Move to the previous or next page. Once the latch is open the new
    /// page is searched immediately, and a blank query is rejected before
    /// the page moves. Returns the page now in effect.
    pub fn on_nav(&mut self, direction: NavDirection) -> Result<u32> {
        self.ensure_live()?;

        let before = self.pagination.current(&self.fields);
        if Pagination::target(before, direction) == before {
            tracing::debug!(
                page = before,
                direction = direction.as_str(),
                "Already at page boundary"
            );
            return Ok(before);
        }
        if self.latch_open && !self.has_required_values() {
            tracing::info!(direction = direction.as_str(), "Rejected page turn on blank query");
            return Err(self.reject_blank());
        }

        let page = self.pagination.navigate(&mut self.fields, direction)?;
        if self.latch_open {
            self.start_search()?;
        }
        Ok(page)
    }

    /// Re-read the router after the host observed a navigation. An echo of
    /// the controller's own rewrite changes nothing. New values are applied
    /// with route provenance (no URL write-back), copied into the form, and
    /// searched if they form a non-blank query. Otherwise the search in
    /// flight and the shown results are dropped.
    ///
    /// Returns whether the values changed.
    pub fn route_changed(&mut self) -> Result<bool> {
        self.ensure_live()?;

        let params = self.router.current_query_params();
        if !self.fields.apply_params(&params, ChangeSource::Route)? {
            return Ok(false);
        }

        self.last_synced = self.fields.query_params();
        self.form.patch_from(&self.fields);
        tracing::debug!(route = %params, "Applied route change");

        if self.has_required_values() {
            self.latch_open = true;
            self.start_search()?;
        } else {
            // Whatever was loading belongs to the previous route
            self.cancel_search();
            self.result = None;
            self.last_error = None;
            self.set_state(ControllerState::Ready);
        }
        Ok(true)
    }

    /// One event-loop tick: URL sync, refresh requests, preload and search
    /// completions, in that order. A no-op once disposed.
    pub fn poll(&mut self)
    where
        P::Item: Into<FieldOption>,
    {
        if self.state == ControllerState::Disposed {
            return;
        }
        self.sync_url();
        self.drain_refresh();
        self.poll_preload();
        self.poll_search();
    }

    /// Tear down: close the field set channels and the refresh channel, drop
    /// in-flight requests (their completions become no-ops) and dispose both
    /// loaders. Idempotent; also runs on drop.
    pub fn dispose(&mut self) {
        if self.state == ControllerState::Disposed {
            return;
        }
        self.fields.close();
        self.refresh_tx = None;
        self.refresh_rx = None;
        if let Some(flight) = self.in_flight.take() {
            tracing::debug!(generation = flight.generation, "Dropping in-flight search on dispose");
        }
        self.preload_pending = None;
        self.loader.dispose();
        self.preload.dispose();
        self.set_state(ControllerState::Disposed);
    }

    fn ensure_live(&self) -> Result<()> {
        match self.state {
            ControllerState::Disposed => Err(SearchError::Disposed),
            _ => Ok(()),
        }
    }

    fn set_state(&mut self, next: ControllerState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "Search controller state change");
            self.state = next;
        }
    }

    fn has_required_values(&self) -> bool {
        self.config
            .required_fields()
            .iter()
            .any(|field| self.fields.has_value(field))
    }

    /// Raise `blank_query` and mark the form so the rejection is visible
    fn reject_blank(&mut self) -> SearchError {
        self.blank_query = true;
        self.form.mark_all_touched(&self.fields);
        self.validation_error()
    }

    fn validation_error(&self) -> SearchError {
        SearchError::Validation {
            fields: self
                .config
                .required_fields()
                .iter()
                .map(|field| field.to_string())
                .collect(),
        }
    }

    /// Validation gate plus loader call. Supersedes any in-flight search.
    fn start_search(&mut self) -> Result<()> {
        if !self.has_required_values() {
            return Err(self.reject_blank());
        }

        self.blank_query = false;
        self.cancel_search();
        self.generation += 1;
        let query = SearchQuery::new(self.fields.values(), self.config.page_size);

        tracing::info!(generation = self.generation, params = ?query.params, "Issuing search");
        let pending = self.loader.load(query.clone());
        self.in_flight = Some(InFlightSearch {
            generation: self.generation,
            query,
            pending,
            started: Instant::now(),
        });
        // Stale results must not linger next to a new query
        self.result = None;
        self.last_error = None;
        self.set_state(ControllerState::Searching);
        Ok(())
    }

    /// Drop the in-flight search; its completer sees `Canceled`
    fn cancel_search(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            tracing::debug!(
                superseded = previous.generation,
                query = ?previous.query.params,
                "Dropping in-flight search"
            );
        }
    }

    fn sync_url(&mut self) {
        let mut dirty = false;
        for change in self.url_sync.drain() {
            if change.source == ChangeSource::Route {
                tracing::trace!(values = ?change.values, "Skipping route-originated change");
                continue;
            }
            dirty = true;
        }
        if !dirty {
            return;
        }

        let target = self.fields.query_params();
        if target == self.last_synced {
            return;
        }
        self.router
            .navigate(&self.fields.url_patch(), NavigateOptions::merge_replace());
        tracing::debug!(params = %target, "Rewrote URL query parameters");
        self.last_synced = target;
    }

    fn drain_refresh(&mut self) {
        let Some(rx) = &self.refresh_rx else {
            return;
        };
        let requested = rx.try_iter().count();
        if requested == 0 {
            return;
        }
        if !self.latch_open {
            tracing::debug!(requested, "Ignoring refresh before first search");
            return;
        }
        if let Err(err) = self.start_search() {
            tracing::debug!(error = %err, "Refresh skipped");
        }
    }

    fn poll_preload(&mut self)
    where
        P::Item: Into<FieldOption>,
    {
        let Some(pending) = &self.preload_pending else {
            return;
        };
        match pending.poll() {
            PendingPoll::Pending => {}
            PendingPoll::Ready(Ok(result)) => {
                self.preload_pending = None;
                let options: Vec<FieldOption> = result.data.into_iter().map(Into::into).collect();
                tracing::debug!(
                    count = options.len(),
                    field = %self.config.preload_field,
                    "Static options loaded"
                );
                if let Err(err) = self.fields.set_options(&self.config.preload_field, options) {
                    tracing::warn!(error = %err, "Could not apply static options");
                }
            }
            PendingPoll::Ready(Err(err)) => {
                self.preload_pending = None;
                tracing::warn!(error = %err, "Static option preload failed");
            }
            PendingPoll::Abandoned => {
                self.preload_pending = None;
                tracing::warn!("Static option preload was abandoned by the loader");
            }
        }
    }

    fn poll_search(&mut self) {
        let Some(flight) = &self.in_flight else {
            return;
        };
        let outcome = match flight.pending.poll() {
            PendingPoll::Pending => return,
            PendingPoll::Ready(outcome) => outcome.map_err(SearchError::from),
            PendingPoll::Abandoned => Err(SearchError::QueryFailure {
                message: "loader dropped the request".to_string(),
            }),
        };

        let Some(flight) = self.in_flight.take() else {
            return;
        };
        let elapsed = flight.started.elapsed();
        self.last_duration = Some(elapsed);

        match outcome {
            Ok(result) => {
                self.apply_facets(&result);
                tracing::info!(
                    generation = flight.generation,
                    total = result.total,
                    page = result.page,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Search completed"
                );
                self.result = Some(result);
                self.last_error = None;
                self.set_state(ControllerState::Ready);
            }
            Err(err) => {
                tracing::warn!(generation = flight.generation, error = %err, "Search failed");
                self.last_error = Some(err);
                self.set_state(ControllerState::Error);
            }
        }
    }

    fn apply_facets(&mut self, result: &ListResult<L::Item>) {
        for (field, options) in extract_facets(&result.facets) {
            match self.fields.set_options(&field, options) {
                Ok(()) => {}
                Err(SearchError::UnknownField { name }) => {
                    tracing::debug!(field = %name, "Ignoring facet for unknown field");
                }
                Err(err) => {
                    tracing::warn!(field = %field, error = %err, "Could not apply facet options")
                }
            }
        }
    }
}

impl<L: ListLoader, P: ListLoader, R: Router> Drop for SearchController<L, P, R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<L: ListLoader, P: ListLoader, R: Router> std::fmt::Debug for SearchController<L, P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController")
            .field("state", &self.state)
            .field("fields", &self.fields)
            .field("blank_query", &self.blank_query)
            .field("latch_open", &self.latch_open)
            .field("generation", &self.generation)
            .finish()
    }
}
