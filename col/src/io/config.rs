//! `col` configuration stored in `col.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::providers::{ProviderKind, ProviderSettings};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "col.toml";

/// Environment variables that override file values, paired with the key they set.
const ENV_OVERRIDES: [(&str, ConfigKey); 5] = [
    ("COL_DEFAULT_PROVIDER", ConfigKey::Provider),
    ("COL_DEFAULT_MODEL", ConfigKey::Model),
    ("COL_DEFAULT_CONTEXT_FILE", ConfigKey::ContextFile),
    ("COL_DEFAULT_OUTPUT_FILE", ConfigKey::OutputFile),
    ("COL_RUNS_DIR", ConfigKey::RunsDir),
];

#[derive(Debug, Clone, Copy)]
enum ConfigKey {
    Provider,
    Model,
    ContextFile,
    OutputFile,
    RunsDir,
}

/// `col` configuration (TOML).
///
/// Missing fields take the defaults below. CLI flags take precedence over
/// environment variables, which take precedence over the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColConfig {
    /// Provider used when `run` is given no `--provider`.
    pub default_provider: String,

    /// Model used when `run` is given no `--model`. Unset means the provider's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    pub default_context_file: PathBuf,

    /// Where `run` writes its response artifact.
    pub default_output_file: PathBuf,

    /// Directory holding one timestamped artifact per run.
    pub runs_dir: PathBuf,

    pub request_timeout_secs: u64,

    pub max_tokens: u32,
}

impl Default for ColConfig {
    fn default() -> Self {
        Self {
            default_provider: "openai".to_string(),
            default_model: None,
            default_context_file: PathBuf::from("context.json"),
            default_output_file: PathBuf::from("response.json"),
            runs_dir: PathBuf::from(".col/runs"),
            request_timeout_secs: 120,
            max_tokens: 4096,
        }
    }
}

impl ColConfig {
    pub fn validate(&self) -> Result<()> {
        self.provider_kind()?;
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be > 0"));
        }
        for (name, path) in [
            ("default_context_file", &self.default_context_file),
            ("default_output_file", &self.default_output_file),
            ("runs_dir", &self.runs_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("{name} must be a non-empty path"));
            }
        }
        if matches!(&self.default_model, Some(model) if model.trim().is_empty()) {
            return Err(anyhow!("default_model must not be blank when set"));
        }
        Ok(())
    }

    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.default_provider
            .parse::<ProviderKind>()
            .context("invalid default_provider")
    }

    /// Transport settings for a provider, with an optional model override.
    pub fn provider_settings(&self, model: Option<String>) -> ProviderSettings {
        ProviderSettings {
            model: model.or_else(|| self.default_model.clone()),
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_tokens: self.max_tokens,
        }
    }

    /// Apply environment overrides. Unset and empty variables are ignored.
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        for (var, key) in ENV_OVERRIDES {
            let Some(value) = env(var).filter(|value| !value.is_empty()) else {
                continue;
            };
            debug!(var, "config override from environment");
            match key {
                ConfigKey::Provider => self.default_provider = value,
                ConfigKey::Model => self.default_model = Some(value),
                ConfigKey::ContextFile => self.default_context_file = PathBuf::from(value),
                ConfigKey::OutputFile => self.default_output_file = PathBuf::from(value),
                ConfigKey::RunsDir => self.runs_dir = PathBuf::from(value),
            }
        }
        self
    }
}

/// Load config from a TOML file, then apply overrides from the process environment.
///
/// If the file is missing, starts from `ColConfig::default()`.
pub fn load_config(path: &Path) -> Result<ColConfig> {
    load_config_with_env(path, |var| std::env::var(var).ok())
}

/// [`load_config`] with an injected environment lookup.
pub fn load_config_with_env(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ColConfig> {
    let file_cfg = if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        debug!(path = %path.display(), "config file missing; using defaults");
        ColConfig::default()
    };
    let cfg = file_cfg.with_env(env);
    cfg.validate()
        .with_context(|| format!("invalid configuration ({})", path.display()))?;
    Ok(cfg)
}
