//! Strict parsing of raw model output into a [`Response`].
//!
//! The raw text must be a JSON object with a string `answer` and, optionally,
//! a `suggested_context_updates` object whose keys are mutable field names and
//! whose values are arrays of strings. Other top-level keys are ignored.
//! Anything else is rejected whole: no coercion, no repair, no partial
//! acceptance, and no repeated keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::core::context::{Entries, Field};
use crate::core::json::find_duplicate_key;

const ANSWER_KEY: &str = "answer";
const UPDATES_KEY: &str = "suggested_context_updates";
const FRAGMENT_LIMIT: usize = 120;

/// Parsed result of one model call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub answer: String,
    /// Candidate additions per field. Absent and empty are equivalent.
    #[serde(default)]
    pub suggested_context_updates: Entries,
}

impl Response {
    pub fn has_suggestions(&self) -> bool {
        !self.suggested_context_updates.is_empty()
    }
}

/// Structural failure while parsing raw model output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed JSON: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
        fragment: String,
    },
    #[error("expected a JSON object at the top level, found {found}")]
    NotAnObject { found: &'static str, fragment: String },
    #[error("missing required field `answer`")]
    MissingAnswer,
    #[error("`{path}` must be {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
        fragment: String,
    },
    #[error("unknown field `{name}` at `{path}`")]
    UnknownField { path: String, name: String },
    #[error("duplicate key `{name}` at line {line} column {column}")]
    DuplicateKey {
        name: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Stable snake_case identifier for the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Syntax { .. } => "syntax",
            ParseError::NotAnObject { .. } => "not_an_object",
            ParseError::MissingAnswer => "missing_answer",
            ParseError::WrongType { .. } => "wrong_type",
            ParseError::UnknownField { .. } => "unknown_field",
            ParseError::DuplicateKey { .. } => "duplicate_key",
        }
    }

    /// The offending portion of the input, where one can be isolated.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            ParseError::Syntax { fragment, .. }
            | ParseError::NotAnObject { fragment, .. }
            | ParseError::WrongType { fragment, .. } => Some(fragment.as_str()),
            ParseError::UnknownField { name, .. } | ParseError::DuplicateKey { name, .. } => {
                Some(name.as_str())
            }
            ParseError::MissingAnswer => None,
        }
    }
}

/// Serializable summary of a [`ParseError`] for run artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
}

impl From<&ParseError> for ErrorDetail {
    fn from(err: &ParseError) -> Self {
        Self {
            kind: err.kind().to_string(),
            reason: err.to_string(),
            fragment: err.fragment().map(str::to_string),
        }
    }
}

/// Parse raw model output strictly into a [`Response`].
pub fn parse(raw: &str) -> Result<Response, ParseError> {
    let result = parse_inner(raw);
    if let Err(err) = &result {
        debug!(kind = err.kind(), reason = %err, "rejected model output");
    }
    result
}

fn parse_inner(raw: &str) -> Result<Response, ParseError> {
    let value: Value = serde_json::from_str(raw).map_err(|err| syntax_error(raw, &err))?;
    let root = match value {
        Value::Object(root) => root,
        other => {
            return Err(ParseError::NotAnObject {
                found: type_name(&other),
                fragment: fragment_of(&other),
            });
        }
    };

    if let Some(dup) = find_duplicate_key(raw) {
        return Err(ParseError::DuplicateKey {
            name: dup.name,
            line: dup.line,
            column: dup.column,
        });
    }

    let answer = match root.get(ANSWER_KEY) {
        None => return Err(ParseError::MissingAnswer),
        Some(Value::String(answer)) => answer.clone(),
        Some(other) => return Err(wrong_type(format!("/{ANSWER_KEY}"), "a string", other)),
    };

    let suggested_context_updates = match root.get(UPDATES_KEY) {
        None => Entries::default(),
        Some(Value::Object(updates)) => parse_updates(updates)?,
        Some(other) => return Err(wrong_type(format!("/{UPDATES_KEY}"), "an object", other)),
    };

    Ok(Response {
        answer,
        suggested_context_updates,
    })
}

fn parse_updates(updates: &Map<String, Value>) -> Result<Entries, ParseError> {
    let mut entries = Entries::default();
    for (key, value) in updates {
        let path = format!("/{UPDATES_KEY}/{key}");
        let field: Field = key.parse().map_err(|_| ParseError::UnknownField {
            path: format!("/{UPDATES_KEY}"),
            name: key.clone(),
        })?;
        let Value::Array(items) = value else {
            return Err(wrong_type(path, "an array of strings", value));
        };
        let mut strings = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => strings.push(s.clone()),
                other => return Err(wrong_type(format!("{path}/{index}"), "a string", other)),
            }
        }
        entries = entries.with(field, strings);
    }
    Ok(entries)
}

fn syntax_error(raw: &str, err: &serde_json::Error) -> ParseError {
    let line = err.line();
    let column = err.column();
    let fragment = raw
        .lines()
        .nth(line.saturating_sub(1))
        .map(truncate)
        .unwrap_or_default();
    ParseError::Syntax {
        message: err.to_string(),
        line,
        column,
        fragment,
    }
}

fn wrong_type(path: String, expected: &'static str, value: &Value) -> ParseError {
    ParseError::WrongType {
        path,
        expected,
        found: type_name(value),
        fragment: fragment_of(value),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(crate) fn fragment_of(value: &Value) -> String {
    truncate(&value.to_string())
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= FRAGMENT_LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(FRAGMENT_LIMIT).collect();
    cut.push_str("...");
    cut
}
