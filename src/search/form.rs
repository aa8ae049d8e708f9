//! On-screen form state
//!
//! The form holds what the user is editing. Edits stay here until submit
//! copies them into the field set; nothing the user types reaches the backend
//! or the URL before that.

use crate::filter::{FieldSet, InactiveFilter, INACTIVE_FIELD, TEXT_FIELD};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchForm {
    values: BTreeMap<String, String>,
    touched: BTreeSet<String>,
}

impl SearchForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Edit a control. A blank value clears it.
    pub fn set(&mut self, field: impl Into<String>, value: Option<&str>) {
        let field = field.into();
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => {
                self.values.insert(field, value.to_string());
            }
            None => {
                self.values.remove(&field);
            }
        }
    }

    pub fn text(&self) -> &str {
        self.get(TEXT_FIELD).unwrap_or_default()
    }

    pub fn set_text(&mut self, text: &str) {
        self.set(TEXT_FIELD, Some(text));
    }

    pub fn inactive(&self) -> InactiveFilter {
        self.get(INACTIVE_FIELD)
            .and_then(InactiveFilter::parse)
            .unwrap_or_default()
    }

    pub fn set_inactive(&mut self, inactive: InactiveFilter) {
        self.set(INACTIVE_FIELD, Some(inactive.as_str()));
    }

    /// Whether a control holds a non-blank value
    pub fn is_filled(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Refill every visible control from the field set's effective values
    pub fn patch_from(&mut self, fields: &FieldSet) {
        self.values = fields
            .specs()
            .filter(|spec| !spec.hidden)
            .filter_map(|spec| {
                fields
                    .get_field_value(&spec.name)
                    .map(|value| (spec.name.clone(), value.to_string()))
            })
            .collect();
    }

    /// Partial update covering every visible field of `fields`; controls the
    /// user cleared unset their field.
    pub fn to_partial(&self, fields: &FieldSet) -> Vec<(String, Option<String>)> {
        fields
            .specs()
            .filter(|spec| !spec.hidden)
            .map(|spec| (spec.name.clone(), self.values.get(&spec.name).cloned()))
            .collect()
    }

    /// Flag every visible control as touched so validation messages show
    pub fn mark_all_touched(&mut self, fields: &FieldSet) {
        self.touched = fields
            .specs()
            .filter(|spec| !spec.hidden)
            .map(|spec| spec.name.clone())
            .collect();
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    pub fn reset_touched(&mut self) {
        self.touched.clear();
    }
}
