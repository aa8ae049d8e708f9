//! Facet options
//!
//! Turns the `(value, count)` distributions returned with a result page into
//! option lists for the filter selects. Backend order is preserved; the
//! backend already ranks them.

use crate::filter::FieldOption;
use crate::search::query::FacetCount;
use std::collections::BTreeMap;

/// Field name -> options derived from that field's facet
pub type FacetOptions = BTreeMap<String, Vec<FieldOption>>;

/// Derive selectable options from a result's facet map
pub fn extract_facets(facets: &BTreeMap<String, Vec<FacetCount>>) -> FacetOptions {
    facets
        .iter()
        .map(|(field, counts)| (field.clone(), counts.iter().map(facet_option).collect()))
        .collect()
}

fn facet_option(facet: &FacetCount) -> FieldOption {
    FieldOption::new(facet.value.clone(), format!("{} ({})", facet.value, facet.count))
        .with_count(facet.count)
}
