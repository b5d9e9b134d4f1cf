//! Test-only helpers: a scripted provider, deterministic contexts and temp workspaces.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::context::{Context, Field};
use crate::core::record::TokenUsage;
use crate::providers::{Completion, Provider};

/// A captured `Provider::complete` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    pub system_prompt: String,
    pub instruction: String,
}

/// Provider that returns queued outputs in order and records every request.
///
/// Errors once the queue is exhausted, or on every call when built with
/// [`ScriptedProvider::failing`].
pub struct ScriptedProvider {
    outputs: RefCell<VecDeque<String>>,
    failure: Option<String>,
    usage: Option<TokenUsage>,
    requests: RefCell<Vec<CapturedRequest>>,
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(outputs: Vec<S>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into_iter().map(Into::into).collect()),
            failure: None,
            usage: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    /// A provider whose every call fails with `message`, like a transport error.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Report `usage` with every completion.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.borrow().clone()
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn complete(&self, system_prompt: &str, instruction: &str) -> Result<Completion> {
        self.requests.borrow_mut().push(CapturedRequest {
            system_prompt: system_prompt.to_string(),
            instruction: instruction.to_string(),
        });
        if let Some(message) = &self.failure {
            return Err(anyhow!("{message}"));
        }
        let text = self
            .outputs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted provider has no outputs left"))?;
        Ok(Completion {
            text,
            usage: self.usage.clone(),
        })
    }
}

/// A small context with a goal and entries in three fields.
pub fn sample_context() -> Context {
    Context::empty()
        .with_goal("Ship the billing migration")
        .append_unique(Field::Constraints, &["No downtime"])
        .append_unique(Field::Facts, &["Ledger v2 is live"])
        .append_unique(Field::OpenQuestions, &["Who owns refunds?"])
}

/// Raw model output with the given answer and suggested updates.
pub fn response_json(answer: &str, updates: &[(Field, &[&str])]) -> String {
    let mut map = serde_json::Map::new();
    for (field, items) in updates {
        map.insert(field.as_str().to_string(), serde_json::json!(items));
    }
    serde_json::json!({
        "answer": answer,
        "suggested_context_updates": map,
    })
    .to_string()
}

/// Temporary working directory with the default `col` file layout.
pub struct TempWorkspace {
    dir: tempfile::TempDir,
}

impl TempWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Create a workspace whose context file holds `context`.
    pub fn with_context(context: &Context) -> Result<Self> {
        let workspace = Self::new()?;
        crate::io::context_store::save_context(&workspace.context_path(), context)?;
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn context_path(&self) -> PathBuf {
        self.path().join("context.json")
    }

    pub fn response_path(&self) -> PathBuf {
        self.path().join("response.json")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.path().join(".col/runs")
    }
}
