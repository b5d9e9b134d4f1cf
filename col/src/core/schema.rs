//! JSON-Schema documents for the context file and the model response.
//!
//! These mirror the rules enforced by [`crate::core::validate`] and
//! [`crate::core::response::parse`] for consumers outside this crate.

const CONTEXT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/context.schema.json"
));
const RESPONSE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/response.schema.json"
));

/// Draft 2020-12 schema for context files.
pub fn context_schema() -> &'static str {
    CONTEXT_SCHEMA
}

/// Draft 2020-12 schema for the model's response document.
pub fn response_schema() -> &'static str {
    RESPONSE_SCHEMA
}
