#![no_main]

use facetsync::filter::{standard_fields, ChangeSource, FieldSet, QueryParams};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary query strings must never panic, and serialization must be
    // stable after one normalization pass
    let Ok(mut fields) = FieldSet::new(standard_fields()) else {
        return;
    };
    if fields
        .apply_params(&QueryParams::parse(data), ChangeSource::Route)
        .is_err()
    {
        return;
    }

    let rendered = fields.query_params().to_query_string();
    let mut again = match FieldSet::new(standard_fields()) {
        Ok(fields) => fields,
        Err(_) => return,
    };
    let _ = again.apply_params(&QueryParams::parse(&rendered), ChangeSource::Route);
    assert_eq!(again.query_params(), fields.query_params());
});
