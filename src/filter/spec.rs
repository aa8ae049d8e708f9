//! Filter field specifications
//!
//! A [`FilterFieldSpec`] describes one query key: how it is named on the URL,
//! what it falls back to when unset, and which static choices it offers before
//! any facet data has arrived.

use serde::{Deserialize, Serialize};

/// Free-text search term
pub const TEXT_FIELD: &str = "q";
/// Legacy spelling of the free-text key, still accepted on input
pub const TEXT_ALIAS: &str = "query";
/// Page number (hidden, participates in URL sync)
pub const PAGE_FIELD: &str = "page";
pub const ISSUER_FIELD: &str = "issuer_id";
pub const CREDENTIAL_TYPE_FIELD: &str = "topic_credential_type_id";
/// Category facet
pub const CATEGORY_FIELD: &str = "category:entity_type";
/// Archived/historical toggle
pub const INACTIVE_FIELD: &str = "inactive";

/// A selectable choice for a filter field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
    /// Number of matching records, when the option came from a facet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            count: None,
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }
}

/// Declarative description of one filter field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFieldSpec {
    /// Canonical query key
    pub name: String,
    /// Alternate key accepted when reading query parameters
    #[serde(default)]
    pub alias: Option<String>,
    /// Display key for the UI layer
    #[serde(default)]
    pub label: Option<String>,
    /// Tracked and serialized but not rendered
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    /// Static, pre-seeded choices
    #[serde(default)]
    pub options: Vec<FieldOption>,
    /// Omit the field from `values()` while it sits at its default
    #[serde(default = "default_suppress_when_default")]
    pub suppress_when_default: bool,
}

fn default_suppress_when_default() -> bool {
    true
}

impl FilterFieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            label: None,
            hidden: false,
            default_value: None,
            options: Vec::new(),
            suppress_when_default: default_suppress_when_default(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn options(mut self, options: impl IntoIterator<Item = FieldOption>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    /// Keep the default in `values()` so the query layer always sees it.
    /// The URL stays minimal regardless.
    pub fn keep_default(mut self) -> Self {
        self.suppress_when_default = false;
        self
    }

    /// Whether `key` addresses this field (by name or alias)
    pub fn accepts_key(&self, key: &str) -> bool {
        self.name == key || self.alias.as_deref() == Some(key)
    }

    /// The value in effect: the explicit value, or the default when unset
    pub fn effective<'a>(&'a self, value: Option<&'a str>) -> Option<&'a str> {
        value.or(self.default_value.as_deref())
    }

    /// Whether an explicit value is equivalent to leaving the field unset
    pub fn is_default(&self, value: Option<&str>) -> bool {
        self.effective(value) == self.default_value.as_deref()
    }
}

/// Normalize raw input: surrounding whitespace is dropped and blanks mean "unset".
pub fn normalize_value(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// State of the archived/historical toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InactiveFilter {
    /// Current records only
    #[default]
    #[serde(rename = "false")]
    Active,
    /// Historical records only
    #[serde(rename = "true")]
    Historical,
    /// No filter applied
    Any,
}

impl InactiveFilter {
    pub const fn as_str(self) -> &'static str {
        match self {
            InactiveFilter::Active => "false",
            InactiveFilter::Historical => "true",
            InactiveFilter::Any => "any",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "false" => Some(InactiveFilter::Active),
            "true" => Some(InactiveFilter::Historical),
            "any" => Some(InactiveFilter::Any),
            _ => None,
        }
    }
}

/// The field list behind the record search URL contract.
pub fn standard_fields() -> Vec<FilterFieldSpec> {
    vec![
        FilterFieldSpec::new(TEXT_FIELD)
            .alias(TEXT_ALIAS)
            .label("search.query"),
        FilterFieldSpec::new(PAGE_FIELD).hidden().default_value("1"),
        FilterFieldSpec::new(ISSUER_FIELD).label("cred.issuer"),
        FilterFieldSpec::new(CREDENTIAL_TYPE_FIELD).label("cred.cred-type"),
        FilterFieldSpec::new(CATEGORY_FIELD).label("attribute.entity_type"),
        FilterFieldSpec::new(INACTIVE_FIELD)
            .label("cred.inactive")
            .default_value(InactiveFilter::Active.as_str())
            .options([
                FieldOption::new(InactiveFilter::Active.as_str(), "No"),
                FieldOption::new(InactiveFilter::Historical.as_str(), "Yes"),
                FieldOption::new(InactiveFilter::Any.as_str(), "Any"),
            ]),
    ]
}
