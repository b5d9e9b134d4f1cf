//! `col run` orchestration: render, invoke, parse, record.
//!
//! Runs are stateless with respect to the context: nothing here writes the
//! context file. The one clock read for the run history happens in
//! [`save_run`], outside the recorded artifact.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context as _, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::core::context::Context;
use crate::core::record::{RunArtifact, RunMetrics, record};
use crate::core::render::render;
use crate::core::response::parse;
use crate::io::run_store::{write_response_file, write_run_record};
use crate::providers::Provider;

/// Run one completion against `context`.
///
/// The prompt is rendered once, before the provider is called. Transport
/// failures are returned as errors and produce no artifact. A response that
/// fails to parse still yields an artifact carrying the raw text and the
/// parse error.
pub fn run_completion(
    provider: &dyn Provider,
    context: &Context,
    instruction: &str,
) -> Result<RunArtifact> {
    let prompt = render(context).context("render system prompt")?;
    info!(
        provider = provider.name(),
        model = provider.model(),
        prompt_hash = %prompt.hash,
        "invoking provider"
    );

    let started = Instant::now();
    let completion = provider
        .complete(&prompt.text, instruction)
        .with_context(|| format!("provider {} failed", provider.name()))?;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let parsed = parse(&completion.text);
    if let Err(err) = &parsed {
        warn!(kind = err.kind(), "provider output failed to parse");
    }
    let metrics = RunMetrics {
        latency_ms: Some(latency_ms),
        token_usage: completion.usage,
    };
    Ok(record(
        provider.name(),
        provider.model(),
        &prompt.hash,
        &completion.text,
        &parsed,
        metrics,
    ))
}

/// Persist `artifact` to the response file and the run history.
///
/// Returns the run history path.
pub fn save_run(artifact: &RunArtifact, output: &Path, runs_dir: &Path) -> Result<PathBuf> {
    write_response_file(output, artifact)?;
    write_run_record(runs_dir, artifact, Utc::now())
}
