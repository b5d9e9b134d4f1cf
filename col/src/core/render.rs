//! Deterministic system prompt rendering.
//!
//! The rendered text depends only on the context's field values: no clock,
//! randomness, run identifiers or environment-dependent formatting. Sections
//! always appear in canonical order (goal, then every [`Field`] in
//! [`Field::ALL`] order), each with its header even when empty.

use std::fmt;

use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::core::context::{Context, Field};

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const EMPTY_GOAL: &str = "(not set)";

/// Content digest of rendered prompt text (first 8 bytes of SHA-256, hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptHash(String);

impl PromptHash {
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        Self(hex::encode(&digest[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prompt text together with its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub text: String,
    pub hash: PromptHash,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render system prompt template: {0}")]
    Template(#[from] minijinja::Error),
}

#[derive(Serialize)]
struct Section<'a> {
    heading: &'static str,
    items: &'a [String],
}

/// Render `context` into the provider-agnostic system prompt.
pub fn render(context: &Context) -> Result<RenderedPrompt, RenderError> {
    let env = environment()?;
    let template = env.get_template("system")?;

    let goal = match context.goal() {
        "" => EMPTY_GOAL,
        goal => goal,
    };
    let sections: Vec<Section<'_>> = Field::ALL
        .into_iter()
        .map(|field| Section {
            heading: field.heading(),
            items: context.entries(field),
        })
        .collect();

    let text = template.render(context! { goal => goal, sections => sections })?;
    let hash = PromptHash::of(&text);
    debug!(bytes = text.len(), hash = %hash, "rendered system prompt");
    Ok(RenderedPrompt { text, hash })
}

fn environment() -> Result<Environment<'static>, RenderError> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_template("system", SYSTEM_TEMPLATE)?;
    Ok(env)
}
