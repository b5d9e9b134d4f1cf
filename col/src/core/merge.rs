//! Diff computation and approval-gated merging of suggested updates.
//!
//! A [`Diff`] lists, per field, the suggested candidates not already present
//! in the context. A [`Selection`] names approved candidates by position in
//! that diff. [`apply`] appends exactly the approved candidates and nothing
//! else; the goal is never touched and existing entries never move.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

use crate::core::context::{Context, Entries, Field};
use crate::core::response::Response;

/// Proposed additions per field. Never represents removals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    additions: Entries,
}

impl Diff {
    pub fn additions(&self, field: Field) -> &[String] {
        self.additions.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &[String])> + '_ {
        self.additions.iter()
    }

    pub fn len(&self) -> usize {
        self.additions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty()
    }
}

/// Compute the candidates from `response` that are new to `context`.
///
/// Candidate order is preserved and repeated candidates collapse to their
/// first occurrence.
pub fn diff(context: &Context, response: &Response) -> Diff {
    let mut additions = Entries::default();
    for (field, candidates) in response.suggested_context_updates.iter() {
        let existing = context.entries(field);
        let fresh = additions.get_mut(field);
        for candidate in candidates {
            if existing.contains(candidate) || fresh.contains(candidate) {
                continue;
            }
            fresh.push(candidate.clone());
        }
    }
    debug!(additions = additions.len(), "computed context diff");
    Diff { additions }
}

/// Approved diff candidates, by field and position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    picks: BTreeMap<Field, BTreeSet<usize>>,
}

impl Selection {
    /// Approve nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Approve every candidate in `diff`.
    pub fn all(diff: &Diff) -> Self {
        Self::fields(diff, Field::ALL)
    }

    /// Approve every candidate of the given fields wholesale.
    pub fn fields(diff: &Diff, fields: impl IntoIterator<Item = Field>) -> Self {
        let mut selection = Self::none();
        for field in fields {
            for index in 0..diff.additions(field).len() {
                selection.insert(field, index);
            }
        }
        selection
    }

    /// Approve the candidate at `index` within `field`.
    pub fn insert(&mut self, field: Field, index: usize) {
        self.picks.entry(field).or_default().insert(index);
    }

    pub fn with(mut self, field: Field, index: usize) -> Self {
        self.insert(field, index);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.picks.values().all(BTreeSet::is_empty)
    }

    /// Resolve the selection against `diff`, in field then diff order.
    ///
    /// Fails on the first pick that does not exist in `diff`.
    pub fn resolve<'d>(
        &self,
        diff: &'d Diff,
    ) -> Result<Vec<(Field, &'d str)>, MergeSelectionError> {
        let mut approved = Vec::new();
        for (&field, indices) in &self.picks {
            let candidates = diff.additions(field);
            for &index in indices {
                let candidate = candidates.get(index).ok_or(MergeSelectionError::OutOfRange {
                    field,
                    index,
                    available: candidates.len(),
                })?;
                approved.push((field, candidate.as_str()));
            }
        }
        Ok(approved)
    }
}

/// A selection that does not match the diff it is applied against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeSelectionError {
    #[error("selection references {field}[{index}] but the diff has {available} candidate(s) for {field}")]
    OutOfRange {
        field: Field,
        index: usize,
        available: usize,
    },
}

/// Merge the approved candidates of `diff` into a new context.
///
/// Equivalent to `append_unique` per field over the approved candidates in
/// diff order. The whole selection is checked before anything is applied, so
/// a stale selection changes nothing.
pub fn apply(
    context: &Context,
    diff: &Diff,
    selection: &Selection,
) -> Result<Context, MergeSelectionError> {
    let approved = selection.resolve(diff)?;
    let mut next = context.clone();
    let mut added = 0usize;
    for (field, candidate) in approved {
        if next.push_unique(field, candidate) {
            added += 1;
        }
    }
    debug!(approved = added, "applied context diff");
    Ok(next)
}
