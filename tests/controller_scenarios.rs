//! End-to-end scenarios for the search controller, driven through the public
//! API with an in-memory router and a recording loader.

use facetsync::filter::{
    standard_fields, ChangeSource, FieldOption, FieldSet, QueryParams, CATEGORY_FIELD,
    CREDENTIAL_TYPE_FIELD, INACTIVE_FIELD, PAGE_FIELD, TEXT_FIELD,
};
use facetsync::fixture::{FixtureBackend, FixtureData};
use facetsync::search::{
    Completer, ControllerConfig, ControllerState, FacetCount, ListLoader, ListResult, LoadError,
    LoadOutcome, MemoryRouter, NavDirection, Pending, PendingLoad, SearchController, SearchQuery,
};
use facetsync::typeahead::{
    PendingSuggestions, SuggestionOutcome, SuggestionSource, TypeaheadAdapter,
};
use facetsync::SearchError;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// Loader whose calls and completers are shared with the test body
#[derive(Clone, Default)]
struct RecordingLoader {
    calls: Rc<RefCell<Vec<SearchQuery>>>,
    held: Rc<RefCell<Vec<Completer<LoadOutcome<String>>>>>,
    disposed: Rc<RefCell<bool>>,
}

impl RecordingLoader {
    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn last_call(&self) -> SearchQuery {
        self.calls.borrow().last().cloned().unwrap()
    }

    fn complete_last(&self, outcome: LoadOutcome<String>) {
        let completer = self.held.borrow_mut().pop().unwrap();
        completer.complete(outcome).unwrap();
    }
}

impl ListLoader for RecordingLoader {
    type Item = String;

    fn load(&mut self, query: SearchQuery) -> PendingLoad<String> {
        self.calls.borrow_mut().push(query);
        let (completer, pending) = Pending::channel();
        self.held.borrow_mut().push(completer);
        pending
    }

    fn dispose(&mut self) {
        *self.disposed.borrow_mut() = true;
    }
}

/// Preload with no static options
struct NoOptions;

impl ListLoader for NoOptions {
    type Item = FieldOption;

    fn load(&mut self, _query: SearchQuery) -> PendingLoad<FieldOption> {
        Pending::ready(Ok(ListResult::empty(1)))
    }
}

type Controller = SearchController<RecordingLoader, NoOptions, MemoryRouter>;

fn start(url: &str) -> (Controller, RecordingLoader) {
    let loader = RecordingLoader::default();
    let controller = SearchController::new(
        ControllerConfig::default(),
        standard_fields(),
        loader.clone(),
        NoOptions,
        MemoryRouter::from_url(url),
    )
    .unwrap();
    (controller, loader)
}

fn page_of(names: &[&str], total: u64, page: u32) -> LoadOutcome<String> {
    Ok(ListResult {
        data: names.iter().map(|n| n.to_string()).collect(),
        facets: Default::default(),
        total,
        page,
    })
}

#[test]
fn test_defaults_are_omitted_everywhere() {
    let mut fields = FieldSet::new(standard_fields()).unwrap();
    fields
        .update([(INACTIVE_FIELD, Some("false")), (PAGE_FIELD, Some("1"))])
        .unwrap();

    assert!(fields.values().is_empty());
    assert!(fields.query_params().is_empty());
    assert_eq!(fields.get_field_value(INACTIVE_FIELD), Some("false"));
}

#[test]
fn test_update_with_effective_values_is_silent() {
    let mut fields = FieldSet::new(standard_fields()).unwrap();
    fields.update([(TEXT_FIELD, Some("acme"))]).unwrap();
    let stream = fields.subscribe();

    let effective: Vec<(String, Option<String>)> = fields
        .values()
        .into_iter()
        .map(|(k, v)| (k, Some(v)))
        .collect();
    assert!(!fields.update(effective).unwrap());
    assert!(!fields.update([(INACTIVE_FIELD, Some("false"))]).unwrap());
    assert!(stream.try_next().is_none());
}

#[test]
fn test_round_trip_normalizes_alias() {
    let mut fields = FieldSet::new(standard_fields()).unwrap();
    let raw = "query=acme%20ltd&category%3Aentity_type=Corporation&page=3&inactive=any";
    fields
        .apply_params(&QueryParams::parse(raw), ChangeSource::Route)
        .unwrap();

    let params = fields.query_params();
    assert_eq!(params.get(TEXT_FIELD), Some("acme ltd"));
    assert_eq!(params.get(CATEGORY_FIELD), Some("Corporation"));
    assert_eq!(params.get(PAGE_FIELD), Some("3"));
    assert_eq!(params.get(INACTIVE_FIELD), Some("any"));
    assert!(!params.contains_key("query"));

    // A second trip is stable
    let mut again = FieldSet::new(standard_fields()).unwrap();
    again
        .apply_params(&QueryParams::parse(&params.to_query_string()), ChangeSource::Route)
        .unwrap();
    assert_eq!(again.query_params(), params);
}

#[test]
fn test_route_query_searches_without_submit() {
    let (mut controller, loader) = start("/search?q=acme&inactive=any");

    let values = controller.filters().values();
    assert_eq!(values.len(), 2);
    assert_eq!(values[TEXT_FIELD], "acme");
    assert_eq!(values[INACTIVE_FIELD], "any");
    assert!(!controller.blank_query());
    assert_eq!(loader.call_count(), 1);

    loader.complete_last(page_of(&["Acme Ltd"], 1, 1));
    controller.poll();
    assert_eq!(controller.state(), &ControllerState::Ready);
    assert_eq!(controller.router().navigations(), 0);
}

#[test]
fn test_empty_submit_is_rejected_quietly() {
    let (mut controller, loader) = start("/search?lang=fr");

    let err = controller.submit().unwrap_err();
    assert!(err.is_user_visible());
    assert!(controller.blank_query());
    assert_eq!(controller.state(), &ControllerState::Ready);

    controller.poll();
    assert_eq!(loader.call_count(), 0);
    assert_eq!(controller.router().navigations(), 0);
    assert_eq!(controller.router().url(), "/search?lang=fr");
}

#[test]
fn test_filter_edits_before_submit_do_not_search() {
    let (mut controller, loader) = start("/search");
    controller.form_mut().set_text("acme");
    controller.form_mut().set(CATEGORY_FIELD, Some("Corporation"));
    controller.poll();

    assert_eq!(loader.call_count(), 0);
    assert!(controller.filters().values().is_empty());
}

#[test]
fn test_submit_then_paginate() {
    let (mut controller, loader) = start("/en/search?lang=en");
    controller.form_mut().set_text("acme");
    controller.submit().unwrap();
    loader.complete_last(page_of(&["a"; 10], 25, 1));
    controller.poll();
    assert_eq!(controller.router().url(), "/en/search?lang=en&q=acme");

    let mut previous_page = controller.current_page();
    for _ in 0..2 {
        let page = controller.on_nav(NavDirection::Next).unwrap();
        assert!(page > previous_page);
        previous_page = page;
        loader.complete_last(page_of(&["b"], 25, page));
        controller.poll();
    }
    assert_eq!(loader.last_call().page(), 3);
    assert_eq!(controller.router().url(), "/en/search?lang=en&q=acme&page=3");
    assert!(!controller.results().unwrap().has_next(controller.page_size()));

    for expected in [2, 1, 1] {
        assert_eq!(controller.on_nav(NavDirection::Previous).unwrap(), expected);
    }
    controller.poll();
    assert_eq!(controller.router().url(), "/en/search?lang=en&q=acme");
}

#[test]
fn test_error_keeps_url_and_allows_retry() {
    let (mut controller, loader) = start("/search");
    controller.form_mut().set_text("acme");
    controller.submit().unwrap();
    controller.poll();
    let url = controller.router().url();
    let navigations = controller.router().navigations();

    loader.complete_last(Err(LoadError::new("service unavailable")));
    controller.poll();
    assert_eq!(controller.state(), &ControllerState::Error);
    assert!(controller.last_error().unwrap().is_user_visible());
    assert_eq!(controller.router().url(), url);
    assert_eq!(controller.router().navigations(), navigations);

    controller.submit().unwrap();
    assert_eq!(controller.state(), &ControllerState::Searching);
    loader.complete_last(page_of(&["Acme"], 1, 1));
    controller.poll();
    assert_eq!(controller.state(), &ControllerState::Ready);
}

#[test]
fn test_stale_completion_is_ignored() {
    let (mut controller, loader) = start("/search?q=first");
    controller.form_mut().set_text("second");
    controller.submit().unwrap();
    assert_eq!(loader.call_count(), 2);

    let second = loader.held.borrow_mut().pop().unwrap();
    let first = loader.held.borrow_mut().pop().unwrap();
    assert_eq!(first.complete(page_of(&["old"], 1, 1)), Err(SearchError::Canceled));
    second.complete(page_of(&["new"], 1, 1)).unwrap();

    controller.poll();
    assert_eq!(controller.results().unwrap().data, vec!["new".to_string()]);
}

#[test]
fn test_back_navigation_restores_filters() {
    let (mut controller, loader) = start("/search?q=acme");
    loader.complete_last(page_of(&["Acme"], 1, 1));
    controller.poll();

    controller
        .router_mut()
        .visit(QueryParams::parse("q=globex&inactive=true"));
    assert!(controller.route_changed().unwrap());
    assert_eq!(controller.form().text(), "globex");
    assert_eq!(loader.last_call().get(INACTIVE_FIELD), Some("true"));

    controller.poll();
    assert_eq!(controller.router().navigations(), 0);
}

#[test]
fn test_drop_disposes_loader() {
    let (controller, loader) = start("/search?q=acme");
    drop(controller);
    assert!(*loader.disposed.borrow());

    let completer = loader.held.borrow_mut().pop().unwrap();
    assert_eq!(completer.complete(page_of(&[], 0, 1)), Err(SearchError::Canceled));
}

#[test]
fn test_failed_init_disposes_loader() {
    let loader = RecordingLoader::default();
    let result = SearchController::new(
        ControllerConfig {
            category_field: "missing".to_string(),
            ..ControllerConfig::default()
        },
        standard_fields(),
        loader.clone(),
        NoOptions,
        MemoryRouter::default(),
    );
    assert_eq!(result.unwrap_err(), SearchError::unknown_field("missing"));
    assert!(*loader.disposed.borrow());
}

fn fixture() -> FixtureBackend {
    let data = FixtureData {
        credential_types: serde_json::from_str(
            r#"[{ "id": 1, "description": "Registration" }, { "id": 2, "description": "Business Number" }]"#,
        )
        .unwrap(),
        records: serde_json::from_str(
            r#"[
                { "id": 1, "name": "Acme Ltd", "issuer_id": 4, "credential_type_id": 1, "entity_type": "Corporation" },
                { "id": 2, "name": "Acme Holdings", "issuer_id": 4, "credential_type_id": 2, "entity_type": "Corporation" },
                { "id": 3, "name": "Acme Bakery", "issuer_id": 5, "credential_type_id": 1, "entity_type": "Sole Proprietorship" }
            ]"#,
        )
        .unwrap(),
        facets: BTreeMap::from([(
            CATEGORY_FIELD.to_string(),
            vec![FacetCount::new("Corporation", 2), FacetCount::new("Sole Proprietorship", 1)],
        )]),
    };
    FixtureBackend::new(data)
}

fn settle<L, R>(controller: &mut SearchController<L, facetsync::fixture::CredentialTypeLoader, R>)
where
    L: ListLoader,
    R: facetsync::search::Router,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    controller.poll();
    while controller.is_searching() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
        controller.poll();
    }
}

#[test]
fn test_fixture_backend_end_to_end() {
    let backend = fixture();
    let mut controller = SearchController::new(
        ControllerConfig {
            page_size: 2,
            ..ControllerConfig::default()
        },
        standard_fields(),
        backend.clone(),
        backend.credential_types(),
        MemoryRouter::from_url("/search?query=acme"),
    )
    .unwrap();
    settle(&mut controller);

    let result = controller.results().unwrap();
    assert_eq!(result.total, 3);
    assert_eq!(result.data.len(), 2);
    assert_eq!(result.range(2).unwrap().to_string(), "1-2 of 3");

    let categories = controller.filters().options(CATEGORY_FIELD);
    assert_eq!(categories[0].label, "Corporation (2)");
    let types = controller.filters().options(CREDENTIAL_TYPE_FIELD);
    assert_eq!(types[1], FieldOption::new("2", "Business Number"));

    controller.on_nav(NavDirection::Next).unwrap();
    settle(&mut controller);
    let result = controller.results().unwrap();
    assert_eq!(result.page, 2);
    assert_eq!(result.data[0].name, "Acme Bakery");
    assert_eq!(controller.router().url(), "/search?q=acme&page=2");
}

/// Suggestion source that counts requests and answers immediately
#[derive(Default)]
struct CountingSource {
    terms: Vec<String>,
}

impl SuggestionSource for CountingSource {
    fn suggest(&mut self, term: &str) -> PendingSuggestions {
        self.terms.push(term.to_string());
        let outcome: SuggestionOutcome = Ok(Vec::new());
        Pending::ready(outcome)
    }
}

#[test]
fn test_typeahead_issues_one_request_per_burst() {
    let t0 = Instant::now();
    let mut typeahead =
        TypeaheadAdapter::new(CountingSource::default(), Duration::from_millis(200), 0);
    typeahead.push_input_at("a", t0);
    typeahead.poll_at(t0 + Duration::from_millis(120));
    typeahead.push_input_at("ab", t0 + Duration::from_millis(150));

    assert_eq!(typeahead.poll_at(t0 + Duration::from_millis(350)), Some(Vec::new()));
    assert_eq!(typeahead.source().terms, vec!["ab".to_string()]);
}

#[test]
fn test_typeahead_failure_yields_empty_list() {
    struct FailingSource;
    impl SuggestionSource for FailingSource {
        fn suggest(&mut self, _term: &str) -> PendingSuggestions {
            Pending::ready(Err(LoadError::new("connection reset")))
        }
    }

    let t0 = Instant::now();
    let mut typeahead = TypeaheadAdapter::new(FailingSource, Duration::from_millis(200), 4);
    typeahead.push_input_at("acme", t0);
    assert_eq!(typeahead.poll_at(t0 + Duration::from_millis(200)), Some(Vec::new()));
}
