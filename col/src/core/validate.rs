//! Structural validation of context documents.
//!
//! Works on the raw JSON value so that a hand-edited file gets the complete
//! list of problems in one pass, each with a JSON-pointer location.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::core::context::{Context, Field};
use crate::core::response::{fragment_of, type_name};

const GOAL_KEY: &str = "goal";

/// A single problem found in a context document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON-pointer style location, `/` for the document root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every violation found by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_valid() {
            return Ok(());
        }
        Err(ValidationError {
            violations: self.violations,
        })
    }

    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// A context document that violates the field-type invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("context has {} violation(s):\n- {}", .violations.len(), render_list(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn render_list(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("\n- ")
}

/// Validate a context document.
///
/// Checks that the root is an object with only known keys, that `goal` is a
/// string, and that each mutable field is an array of distinct strings.
/// Missing keys are allowed and mean "empty".
pub fn validate(document: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let Value::Object(root) = document else {
        report.push("/", format!("expected an object, found {}", type_name(document)));
        return report;
    };

    for key in root.keys() {
        if key != GOAL_KEY && key.parse::<Field>().is_err() {
            report.push(format!("/{key}"), format!("unknown field `{key}`"));
        }
    }

    match root.get(GOAL_KEY) {
        Some(goal) if !goal.is_string() => report.push(
            format!("/{GOAL_KEY}"),
            format!("expected a string, found {} `{}`", type_name(goal), fragment_of(goal)),
        ),
        _ => {}
    }

    for field in Field::ALL {
        let Some(value) = root.get(field.as_str()) else {
            continue;
        };
        let Value::Array(items) = value else {
            report.push(
                format!("/{field}"),
                format!("expected an array of strings, found {}", type_name(value)),
            );
            continue;
        };
        let mut seen = HashSet::new();
        for (index, item) in items.iter().enumerate() {
            let path = format!("/{field}/{index}");
            match item {
                Value::String(text) => {
                    if !seen.insert(text.as_str()) {
                        report.push(path, format!("duplicate entry `{text}`"));
                    }
                }
                other => {
                    let found = type_name(other);
                    let fragment = fragment_of(other);
                    report.push(path, format!("expected a string, found {found} `{fragment}`"));
                }
            }
        }
    }

    report
}

/// Validate an in-memory context. Types hold by construction, so only the
/// no-duplicates invariant can fail.
pub fn validate_context(context: &Context) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (field, items) in context.all_entries().iter() {
        let mut seen = HashSet::new();
        for (index, item) in items.iter().enumerate() {
            if !seen.insert(item.as_str()) {
                report.push(format!("/{field}/{index}"), format!("duplicate entry `{item}`"));
            }
        }
    }
    report
}
