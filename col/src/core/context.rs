//! Canonical task context and its append-only entry sequences.
//!
//! A [`Context`] is the single persistent unit of state for one task. The goal
//! is only ever changed by an explicit user edit; the five entry sequences only
//! grow, through [`Context::append_unique`] or the merge engine built on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the five mutable, append-only context sequences.
///
/// Declaration order is the canonical field order used for rendering and
/// serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Constraints,
    Facts,
    Decisions,
    ToolOutputs,
    OpenQuestions,
}

impl Field {
    /// All mutable fields in canonical order.
    pub const ALL: [Field; 5] = [
        Field::Constraints,
        Field::Facts,
        Field::Decisions,
        Field::ToolOutputs,
        Field::OpenQuestions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Constraints => "constraints",
            Field::Facts => "facts",
            Field::Decisions => "decisions",
            Field::ToolOutputs => "tool_outputs",
            Field::OpenQuestions => "open_questions",
        }
    }

    /// Section heading used in the rendered prompt.
    pub fn heading(self) -> &'static str {
        match self {
            Field::Constraints => "Constraints",
            Field::Facts => "Established Facts",
            Field::Decisions => "Decisions Made",
            Field::ToolOutputs => "Tool Outputs",
            Field::OpenQuestions => "Open Questions",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that does not name one of the five mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unknown context field `{0}` (expected one of: constraints, facts, decisions, tool_outputs, open_questions)"
)]
pub struct UnknownFieldName(pub String);

impl FromStr for Field {
    type Err = UnknownFieldName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownFieldName(s.to_string()))
    }
}

/// Per-field string sequences, one for each [`Field`].
///
/// Shared by the context itself, suggested updates and computed diffs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entries {
    constraints: Vec<String>,
    facts: Vec<String>,
    decisions: Vec<String>,
    tool_outputs: Vec<String>,
    open_questions: Vec<String>,
}

impl Entries {
    pub fn get(&self, field: Field) -> &[String] {
        match field {
            Field::Constraints => &self.constraints,
            Field::Facts => &self.facts,
            Field::Decisions => &self.decisions,
            Field::ToolOutputs => &self.tool_outputs,
            Field::OpenQuestions => &self.open_questions,
        }
    }

    pub(crate) fn get_mut(&mut self, field: Field) -> &mut Vec<String> {
        match field {
            Field::Constraints => &mut self.constraints,
            Field::Facts => &mut self.facts,
            Field::Decisions => &mut self.decisions,
            Field::ToolOutputs => &mut self.tool_outputs,
            Field::OpenQuestions => &mut self.open_questions,
        }
    }

    /// Replace the sequence stored for `field`, as-is.
    pub fn with(mut self, field: Field, items: Vec<String>) -> Self {
        *self.get_mut(field) = items;
        self
    }

    /// Iterate `(field, items)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &[String])> + '_ {
        Field::ALL.into_iter().map(move |field| (field, self.get(field)))
    }

    /// Total number of entries across all fields.
    pub fn len(&self) -> usize {
        self.iter().map(|(_, items)| items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, items)| items.is_empty())
    }
}

/// Structured task state fed to every model run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    goal: String,
    #[serde(flatten)]
    entries: Entries,
}

impl Context {
    /// Empty goal and five empty sequences.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the goal. This is the user-edit path; merges never touch the goal.
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn entries(&self, field: Field) -> &[String] {
        self.entries.get(field)
    }

    pub fn all_entries(&self) -> &Entries {
        &self.entries
    }

    /// Return a new context with every candidate not already in `field`
    /// appended in the given order.
    ///
    /// Matching is byte-exact: no trimming, case folding or normalization.
    /// Candidates repeated within `candidates` are inserted once.
    pub fn append_unique<S: AsRef<str>>(&self, field: Field, candidates: &[S]) -> Context {
        let mut next = self.clone();
        for candidate in candidates {
            next.push_unique(field, candidate.as_ref());
        }
        next
    }

    /// Append `candidate` unless an identical entry exists. Returns whether it was added.
    pub(crate) fn push_unique(&mut self, field: Field, candidate: &str) -> bool {
        let items = self.entries.get_mut(field);
        if items.iter().any(|existing| existing == candidate) {
            return false;
        }
        items.push(candidate.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(context: &Context) -> Vec<&str> {
        context
            .entries(Field::Facts)
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn empty_has_blank_goal_and_no_entries() {
        let context = Context::empty();
        assert_eq!(context.goal(), "");
        assert!(context.all_entries().is_empty());
        for field in Field::ALL {
            assert!(context.entries(field).is_empty(), "{field} should be empty");
        }
    }

    #[test]
    fn append_unique_to_empty_sequence() {
        let context = Context::empty().append_unique(Field::Facts, &["a", "b"]);
        assert_eq!(facts(&context), vec!["a", "b"]);
    }

    /// Existing entries keep their position; new ones follow in input order.
    #[test]
    fn append_unique_preserves_existing_order() {
        let context = Context::empty()
            .append_unique(Field::Facts, &["c", "a"])
            .append_unique(Field::Facts, &["b", "a", "d"]);
        assert_eq!(facts(&context), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn append_unique_dedups_within_candidates() {
        let context = Context::empty().append_unique(Field::Facts, &["a", "a", "b", "a"]);
        assert_eq!(facts(&context), vec!["a", "b"]);
    }

    #[test]
    fn append_unique_is_idempotent() {
        let candidates = ["x", "y", "x"];
        let once = Context::empty()
            .append_unique(Field::Decisions, &["w"])
            .append_unique(Field::Decisions, &candidates);
        let twice = once.append_unique(Field::Decisions, &candidates);
        assert_eq!(once, twice);
    }

    /// Duplicates are byte-exact only: whitespace and case make entries distinct.
    #[test]
    fn append_unique_uses_exact_matching() {
        let context = Context::empty().append_unique(Field::Facts, &["A", "a", "A ", " A"]);
        assert_eq!(facts(&context), vec!["A", "a", "A ", " A"]);
    }

    #[test]
    fn append_unique_leaves_input_and_other_fields_untouched() {
        let original = Context::empty()
            .with_goal("ship it")
            .append_unique(Field::Constraints, &["no downtime"]);
        let next = original.append_unique(Field::Facts, &["f1"]);

        assert!(original.entries(Field::Facts).is_empty());
        assert_eq!(next.goal(), "ship it");
        assert_eq!(next.entries(Field::Constraints), ["no downtime".to_string()]);
    }

    #[test]
    fn field_names_round_trip_through_from_str() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>(), Ok(field));
        }
        let err = "goal".parse::<Field>().unwrap_err();
        assert_eq!(err, UnknownFieldName("goal".to_string()));
    }

    #[test]
    fn serializes_in_canonical_field_order() {
        let context = Context::empty().with_goal("g");
        let json = serde_json::to_string(&context).expect("serialize");
        assert_eq!(
            json,
            r#"{"goal":"g","constraints":[],"facts":[],"decisions":[],"tool_outputs":[],"open_questions":[]}"#
        );
    }

    #[test]
    fn deserialize_defaults_missing_fields() {
        let context: Context = serde_json::from_str(r#"{"facts":["f"]}"#).expect("deserialize");
        assert_eq!(context.goal(), "");
        assert_eq!(facts(&context), vec!["f"]);
        assert!(context.entries(Field::OpenQuestions).is_empty());
    }
}
