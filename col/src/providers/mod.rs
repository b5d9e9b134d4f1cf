//! Model provider abstraction.
//!
//! The [`Provider`] trait is the single capability the orchestrator needs:
//! system prompt plus instruction in, raw text out. Adapters own transport,
//! authentication and request shaping; they never interpret the text. Tests
//! use scripted providers that return queued outputs without network access.

pub mod anthropic;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, anyhow};
use thiserror::Error;

use crate::core::record::TokenUsage;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Raw provider output for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// A model endpoint that turns a prompt into text.
pub trait Provider {
    /// Stable provider identifier recorded in run artifacts.
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    /// Invoke the model once. Transport and HTTP failures are errors; the
    /// returned text is passed through verbatim.
    fn complete(&self, system_prompt: &str, instruction: &str) -> Result<Completion>;
}

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Groq,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Groq => "groq",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider `{0}` (expected one of: openai, anthropic, groq)")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "groq" => Ok(ProviderKind::Groq),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Per-invocation transport settings shared by every adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Model override; `None` uses [`ProviderKind::default_model`].
    pub model: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
}

/// Construct the adapter for `kind`, reading its API key through `env`.
///
/// A missing or empty key is an error here, before any request is made.
pub fn build_provider(
    kind: ProviderKind,
    settings: &ProviderSettings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn Provider>> {
    let key_var = kind.api_key_var();
    let api_key = env(key_var)
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("{key_var} environment variable is required for provider {kind}"))?;
    let model = settings
        .model
        .clone()
        .unwrap_or_else(|| kind.default_model().to_string());

    let provider: Box<dyn Provider> = match kind {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::openai(api_key, model, settings)?),
        ProviderKind::Groq => Box::new(OpenAiProvider::groq(api_key, model, settings)?),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(api_key, model, settings)?),
    };
    Ok(provider)
}

/// Turn a non-success HTTP response into an error carrying status and body.
fn check_status(
    provider: &str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    tracing::warn!(provider, status = status.as_u16(), "provider returned error status");
    Err(anyhow!("{provider} request failed with status {status}: {body}"))
}
