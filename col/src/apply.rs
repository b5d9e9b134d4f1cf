//! `col apply` orchestration: load, diff, select, merge, save.
//!
//! Only candidates the user approved reach the context. Approval comes from
//! flags (`--yes`, `--field`, `--pick`) or an interactive prompt in the
//! binary; this module turns either into a [`Selection`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context as _, Result, anyhow};
use thiserror::Error;
use tracing::info;

use crate::core::context::{Context, Field, UnknownFieldName};
use crate::core::merge::{Diff, Selection, apply as merge, diff};
use crate::core::record::{ArtifactOutcomeError, RunArtifact};
use crate::core::validate::validate_context;
use crate::io::context_store::save_context;

/// One approved candidate, written `field:index` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub field: Field,
    pub index: usize,
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("pick `{0}` must look like `field:index`, e.g. `facts:0`")]
    Malformed(String),
    #[error(transparent)]
    Field(#[from] UnknownFieldName),
    #[error("pick index `{0}` is not a non-negative integer")]
    Index(String),
}

/// Parse `field:index`, e.g. `facts:0`.
pub fn parse_pick(s: &str) -> Result<Pick, PickError> {
    let (field, index) = s
        .split_once(':')
        .ok_or_else(|| PickError::Malformed(s.to_string()))?;
    let field: Field = field.parse()?;
    let index = index
        .parse()
        .map_err(|_| PickError::Index(index.to_string()))?;
    Ok(Pick { field, index })
}

impl FromStr for Pick {
    type Err = PickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_pick(s)
    }
}

/// A diff candidate with its position, for display and interactive choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'d> {
    pub pick: Pick,
    pub text: &'d str,
}

/// Every candidate in `diff`, in field then diff order.
pub fn candidates(diff: &Diff) -> Vec<Candidate<'_>> {
    diff.iter()
        .flat_map(|(field, items)| {
            items.iter().enumerate().map(move |(index, text)| Candidate {
                pick: Pick { field, index },
                text: text.as_str(),
            })
        })
        .collect()
}

/// Diff the suggestions in a recorded run against `context`.
///
/// Refuses artifacts that failed to parse or whose recorded outcome is
/// inconsistent; there is nothing trustworthy to merge from them.
pub fn plan(context: &Context, artifact: &RunArtifact) -> Result<Diff> {
    match artifact.outcome() {
        Ok(response) => Ok(diff(context, response)),
        Err(ArtifactOutcomeError::ParseFailed(detail)) => Err(anyhow!(
            "response is not valid ({}): {}; fix the response file or re-run the completion",
            detail.kind,
            detail.reason
        )),
        Err(ArtifactOutcomeError::Inconsistent) => Err(anyhow!(
            "response file is inconsistent: `valid` does not match `parsed_response`/`error`"
        )),
    }
}

/// How the user approved candidates on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Approval {
    pub all: bool,
    pub fields: Vec<Field>,
    pub picks: Vec<Pick>,
}

impl Approval {
    /// True when no flag approved anything and the user must be asked.
    pub fn is_unspecified(&self) -> bool {
        !self.all && self.fields.is_empty() && self.picks.is_empty()
    }

    pub fn selection(&self, diff: &Diff) -> Selection {
        if self.all {
            return Selection::all(diff);
        }
        let mut selection = Selection::fields(diff, self.fields.iter().copied());
        for pick in &self.picks {
            selection.insert(pick.field, pick.index);
        }
        selection
    }
}

/// Selection for candidates chosen by position in [`candidates`].
pub fn selection_from_chosen(all: &[Candidate<'_>], chosen: &[usize]) -> Selection {
    let mut selection = Selection::none();
    for candidate in chosen.iter().filter_map(|&i| all.get(i)) {
        selection.insert(candidate.pick.field, candidate.pick.index);
    }
    selection
}

/// Outcome of [`commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub context: Context,
    /// Entries appended by this commit.
    pub added: usize,
}

/// Merge the approved candidates and save the context.
///
/// The merged context is checked before it is written; an invalid result
/// leaves the file untouched.
pub fn commit(
    path: &Path,
    context: &Context,
    diff: &Diff,
    selection: &Selection,
) -> Result<Applied> {
    let merged = merge(context, diff, selection)?;
    validate_context(&merged)
        .into_result()
        .context("merged context is invalid")?;
    let added = merged.all_entries().len() - context.all_entries().len();
    save_context(path, &merged)?;
    info!(path = %path.display(), added, "applied context updates");
    Ok(Applied {
        context: merged,
        added,
    })
}
