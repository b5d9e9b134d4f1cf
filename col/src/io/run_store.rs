//! Response files and the timestamped run history under `runs_dir`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::json_file::write_json_atomic;
use crate::core::record::RunArtifact;

/// Run history entry: the artifact plus when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRun {
    /// RFC 3339 UTC timestamp.
    pub recorded_at: String,
    #[serde(flatten)]
    pub artifact: RunArtifact,
}

/// Write the response file consumed by `col apply`.
pub fn write_response_file(path: &Path, artifact: &RunArtifact) -> Result<()> {
    write_json_atomic(path, artifact)
        .with_context(|| format!("write response file {}", path.display()))
}

/// Read a response file. Whether it holds a usable response is up to the caller.
pub fn read_response_file(path: &Path) -> Result<RunArtifact> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read response file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse response file {}", path.display()))
}

/// File name for a run recorded at `at`: `YYYYMMDD_HHMMSS_mmm.json`.
pub fn run_file_name(at: DateTime<Utc>) -> String {
    format!("{}.json", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Append `artifact` to the run history. Returns the path written.
///
/// Runs recorded within the same millisecond get a numeric suffix instead of
/// replacing each other.
pub fn write_run_record(
    runs_dir: &Path,
    artifact: &RunArtifact,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    let path = unused_path(runs_dir, &run_file_name(at))?;
    let stored = StoredRun {
        recorded_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        artifact: artifact.clone(),
    };
    write_json_atomic(&path, &stored)
        .with_context(|| format!("write run record {}", path.display()))?;
    debug!(path = %path.display(), "recorded run");
    Ok(path)
}

fn unused_path(runs_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let candidate = runs_dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }
    let stem = file_name.trim_end_matches(".json");
    (1..1000)
        .map(|n| runs_dir.join(format!("{stem}-{n}.json")))
        .find(|path| !path.exists())
        .ok_or_else(|| anyhow!("no free run file name for {stem} in {}", runs_dir.display()))
}

/// Read one run history entry.
pub fn read_run_record(path: &Path) -> Result<StoredRun> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read run record {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse run record {}", path.display()))
}
