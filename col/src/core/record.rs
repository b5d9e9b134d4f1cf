//! Provenance records for model invocations.

use serde::{Deserialize, Serialize};

use crate::core::render::PromptHash;
use crate::core::response::{ErrorDetail, ParseError, Response};

/// Token counts reported by a provider. Providers report different subsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Optional measurements attached to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetrics {
    pub latency_ms: Option<u64>,
    pub token_usage: Option<TokenUsage>,
}

/// Write-once record of one provider invocation.
///
/// The raw output is kept verbatim whether or not it parsed. Exactly one of
/// `parsed_response` and `error` is set, and `valid` mirrors which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifact {
    provider: String,
    model: String,
    prompt_hash: PromptHash,
    raw_output: String,
    valid: bool,
    parsed_response: Option<Response>,
    error: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_usage: Option<TokenUsage>,
}

/// Assemble a [`RunArtifact`]. Pure; persisting it is the caller's job.
pub fn record(
    provider: &str,
    model: &str,
    prompt_hash: &PromptHash,
    raw_text: &str,
    parse_result: &Result<Response, ParseError>,
    metrics: RunMetrics,
) -> RunArtifact {
    let (parsed_response, error) = match parse_result {
        Ok(response) => (Some(response.clone()), None),
        Err(err) => (None, Some(ErrorDetail::from(err))),
    };
    RunArtifact {
        provider: provider.to_string(),
        model: model.to_string(),
        prompt_hash: prompt_hash.clone(),
        raw_output: raw_text.to_string(),
        valid: parsed_response.is_some(),
        parsed_response,
        error,
        latency_ms: metrics.latency_ms,
        token_usage: metrics.token_usage,
    }
}

impl RunArtifact {
    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt_hash(&self) -> &PromptHash {
        &self.prompt_hash
    }

    pub fn raw_output(&self) -> &str {
        &self.raw_output
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    pub fn token_usage(&self) -> Option<&TokenUsage> {
        self.token_usage.as_ref()
    }

    /// The parsed response, or the recorded parse failure.
    ///
    /// A deserialized artifact that claims validity without a response (or the
    /// reverse) is reported as an inconsistency rather than trusted.
    pub fn outcome(&self) -> Result<&Response, ArtifactOutcomeError<'_>> {
        match (self.valid, &self.parsed_response, &self.error) {
            (true, Some(response), None) => Ok(response),
            (false, None, Some(detail)) => Err(ArtifactOutcomeError::ParseFailed(detail)),
            _ => Err(ArtifactOutcomeError::Inconsistent),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.outcome().is_ok()
    }
}

/// Why an artifact has no usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcomeError<'a> {
    ParseFailed(&'a ErrorDetail),
    Inconsistent,
}
