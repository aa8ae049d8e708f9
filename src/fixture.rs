//! JSON fixture backend
//!
//! Serves credential records, credential types and name suggestions from a
//! JSON file so the controller can be driven without a live search service.
//! Facet distributions are replayed from the file as-is.
//!
//! ```json
//! {
//!   "credential_types": [{ "id": 1, "description": "Registration" }],
//!   "records": [{ "id": 7, "name": "Acme Ltd", "issuer_id": 4,
//!                 "credential_type_id": 1, "entity_type": "Corporation",
//!                 "inactive": false }],
//!   "facets": { "category:entity_type": [{ "value": "Corporation", "count": 1 }] }
//! }
//! ```

use crate::filter::{
    FieldOption, InactiveFilter, CATEGORY_FIELD, CREDENTIAL_TYPE_FIELD, INACTIVE_FIELD,
    ISSUER_FIELD, TEXT_FIELD,
};
use crate::search::loader::{ListLoader, Pending, PendingLoad};
use crate::search::query::{FacetCount, ListResult, SearchQuery};
use crate::typeahead::{PendingSuggestions, Suggestion, SuggestionSource};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Maximum number of suggestions returned per term
const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialType {
    pub id: u64,
    pub description: String,
}

impl From<CredentialType> for FieldOption {
    fn from(credential_type: CredentialType) -> Self {
        FieldOption::new(credential_type.id.to_string(), credential_type.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: u64,
    pub name: String,
    pub issuer_id: u64,
    pub credential_type_id: u64,
    pub entity_type: String,
    #[serde(default)]
    pub inactive: bool,
}

impl CredentialRecord {
    fn matches(&self, query: &SearchQuery) -> bool {
        if let Some(text) = query.get(TEXT_FIELD) {
            if !self.name.to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        if !id_matches(query.get(ISSUER_FIELD), self.issuer_id)
            || !id_matches(query.get(CREDENTIAL_TYPE_FIELD), self.credential_type_id)
        {
            return false;
        }
        if query
            .get(CATEGORY_FIELD)
            .is_some_and(|category| category != self.entity_type)
        {
            return false;
        }

        // Absent means the field's default: active records only
        match query
            .get(INACTIVE_FIELD)
            .and_then(InactiveFilter::parse)
            .unwrap_or_default()
        {
            InactiveFilter::Active => !self.inactive,
            InactiveFilter::Historical => self.inactive,
            InactiveFilter::Any => true,
        }
    }
}

fn id_matches(filter: Option<&str>, id: u64) -> bool {
    match filter {
        Some(raw) => raw.trim().parse::<u64>().is_ok_and(|wanted| wanted == id),
        None => true,
    }
}

/// Parsed fixture file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub credential_types: Vec<CredentialType>,
    #[serde(default)]
    pub records: Vec<CredentialRecord>,
    #[serde(default)]
    pub facets: BTreeMap<String, Vec<FacetCount>>,
}

impl FixtureData {
    /// Filter and page the records for `query`
    pub fn search(&self, query: &SearchQuery) -> ListResult<CredentialRecord> {
        let matching: Vec<&CredentialRecord> =
            self.records.iter().filter(|record| record.matches(query)).collect();
        let data = matching
            .iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .map(|record| (*record).clone())
            .collect();

        ListResult {
            data,
            facets: self.facets.clone(),
            total: matching.len() as u64,
            page: query.page(),
        }
    }

    /// Distinct record names containing `term`, in file order
    pub fn suggest(&self, term: &str) -> Vec<Suggestion> {
        let needle = term.to_lowercase();
        let mut suggestions: Vec<Suggestion> = Vec::new();
        for record in &self.records {
            if suggestions.len() >= MAX_SUGGESTIONS {
                break;
            }
            if record.name.to_lowercase().contains(&needle)
                && !suggestions.iter().any(|s| s.term == record.name)
            {
                suggestions.push(Suggestion::new(record.name.clone()));
            }
        }
        suggestions
    }
}

/// Record loader and suggestion source over shared fixture data. Each
/// request runs on a background thread.
#[derive(Debug, Clone)]
pub struct FixtureBackend {
    data: Arc<FixtureData>,
    requests: usize,
}

impl FixtureBackend {
    pub fn new(data: FixtureData) -> Self {
        Self {
            data: Arc::new(data),
            requests: 0,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: FixtureData =
            serde_json::from_str(json).context("Failed to parse fixture JSON")?;
        Ok(Self::new(data))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid fixture {}", path.display()))
    }

    pub fn data(&self) -> &FixtureData {
        &self.data
    }

    /// Number of record and suggestion requests served
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Loader for the credential-type options, sharing this fixture's data
    pub fn credential_types(&self) -> CredentialTypeLoader {
        CredentialTypeLoader {
            data: Arc::clone(&self.data),
        }
    }
}

impl ListLoader for FixtureBackend {
    type Item = CredentialRecord;

    fn load(&mut self, query: SearchQuery) -> PendingLoad<CredentialRecord> {
        self.requests += 1;
        let data = Arc::clone(&self.data);
        Pending::spawn(move || Ok(data.search(&query)))
    }
}

impl SuggestionSource for FixtureBackend {
    fn suggest(&mut self, term: &str) -> PendingSuggestions {
        self.requests += 1;
        let data = Arc::clone(&self.data);
        let term = term.to_string();
        Pending::spawn(move || Ok(data.suggest(&term)))
    }
}

/// Static preload of every credential type
#[derive(Debug, Clone)]
pub struct CredentialTypeLoader {
    data: Arc<FixtureData>,
}

impl ListLoader for CredentialTypeLoader {
    type Item = CredentialType;

    fn load(&mut self, _query: SearchQuery) -> PendingLoad<CredentialType> {
        let credential_types = self.data.credential_types.clone();
        Pending::ready(Ok(ListResult {
            total: credential_types.len() as u64,
            data: credential_types,
            facets: BTreeMap::new(),
            page: 1,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FieldValues;

    const FIXTURE: &str = r#"{
        "credential_types": [
            { "id": 1, "description": "Registration" },
            { "id": 2, "description": "Business Number" }
        ],
        "records": [
            { "id": 1, "name": "Acme Ltd", "issuer_id": 4, "credential_type_id": 1, "entity_type": "Corporation" },
            { "id": 2, "name": "Acme Holdings", "issuer_id": 4, "credential_type_id": 2, "entity_type": "Corporation", "inactive": true },
            { "id": 3, "name": "Globex", "issuer_id": 5, "credential_type_id": 1, "entity_type": "Partnership" }
        ],
        "facets": { "category:entity_type": [{ "value": "Corporation", "count": 2 }] }
    }"#;

    fn data() -> FixtureData {
        serde_json::from_str(FIXTURE).unwrap()
    }

    fn query(pairs: &[(&str, &str)], page_size: u32) -> SearchQuery {
        let params: FieldValues = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SearchQuery::new(params, page_size)
    }

    fn ids(result: &ListResult<CredentialRecord>) -> Vec<u64> {
        result.data.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_text_search_defaults_to_active() {
        let result = data().search(&query(&[("q", "acme")], 10));
        assert_eq!(ids(&result), vec![1]);
        assert_eq!(result.total, 1);
        assert_eq!(result.facets["category:entity_type"][0].count, 2);
    }

    #[test]
    fn test_inactive_filter() {
        let data = data();
        assert_eq!(
            ids(&data.search(&query(&[("q", "acme"), ("inactive", "any")], 10))),
            vec![1, 2]
        );
        assert_eq!(ids(&data.search(&query(&[("q", "acme"), ("inactive", "true")], 10))), vec![2]);
    }

    #[test]
    fn test_id_and_category_filters() {
        let data = data();
        assert_eq!(ids(&data.search(&query(&[("issuer_id", "5")], 10))), vec![3]);
        assert_eq!(
            ids(&data.search(&query(
                &[("category:entity_type", "Corporation"), ("inactive", "any")],
                10
            ))),
            vec![1, 2]
        );
        assert!(data.search(&query(&[("issuer_id", "x")], 10)).is_empty());
    }

    #[test]
    fn test_paging() {
        let data = data();
        let first = data.search(&query(&[("inactive", "any")], 2));
        assert_eq!(ids(&first), vec![1, 2]);
        assert_eq!(first.total, 3);

        let second = data.search(&query(&[("inactive", "any"), ("page", "2")], 2));
        assert_eq!(ids(&second), vec![3]);
        assert_eq!(second.page, 2);
    }

    #[test]
    fn test_suggest() {
        let suggestions = data().suggest("acm");
        assert_eq!(
            suggestions,
            vec![Suggestion::new("Acme Ltd"), Suggestion::new("Acme Holdings")]
        );
        assert!(data().suggest("zzz").is_empty());
    }

    #[test]
    fn test_credential_types_become_options() {
        let options: Vec<FieldOption> = data()
            .credential_types
            .into_iter()
            .map(Into::into)
            .collect();
        assert_eq!(options[1], FieldOption::new("2", "Business Number"));
    }

    #[test]
    fn test_backend_counts_requests() {
        let mut backend = FixtureBackend::new(data());
        let _records = backend.load(query(&[("q", "acme")], 10));
        let _suggestions = SuggestionSource::suggest(&mut backend, "acme");

        // Clones share the data but keep their own count
        let mut clone = backend.clone();
        let _more = clone.load(query(&[("q", "globex")], 10));
        assert_eq!(backend.requests(), 2);
        assert_eq!(clone.requests(), 3);
    }

    #[test]
    fn test_invalid_json_has_context() {
        let err = FixtureBackend::from_json("{ nope").unwrap_err();
        assert!(err.to_string().contains("fixture"));
    }
}
