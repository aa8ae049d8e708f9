//! Filter specification model and its URL serialization.
//!
//! - [`spec`] - Field specifications and the standard record-search field list
//! - [`params`] - Ordered query-string parameters
//! - [`field_set`] - Current values, options and their change channels

pub mod field_set;
pub mod params;
pub mod spec;

pub use field_set::{
    ChangeSource, FieldChange, FieldSet, FieldValues, OptionsChange, StreamPoll, Subscription,
};
pub use params::{ParamPatch, QueryParams};
pub use spec::{
    standard_fields, FieldOption, FilterFieldSpec, InactiveFilter, CATEGORY_FIELD,
    CREDENTIAL_TYPE_FIELD, INACTIVE_FIELD, ISSUER_FIELD, PAGE_FIELD, TEXT_ALIAS, TEXT_FIELD,
};
