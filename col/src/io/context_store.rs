//! Context file load/save helpers with validation.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result, anyhow, bail};
use serde_json::Value;
use tracing::debug;

use super::json_file::write_json_atomic;
use crate::core::context::Context;
use crate::core::json::find_duplicate_key;
use crate::core::validate::validate;

/// Read a context file as raw JSON. Repeated object keys are an error.
pub fn read_context_value(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read context file {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse context file {}", path.display()))?;
    if let Some(dup) = find_duplicate_key(&contents) {
        bail!(
            "parse context file {}: duplicate key `{}` at line {} column {}",
            path.display(),
            dup.name,
            dup.line,
            dup.column
        );
    }
    Ok(value)
}

/// Load a context file, reporting every violation before deserializing.
pub fn load_context(path: &Path) -> Result<Context> {
    let value = read_context_value(path)?;
    validate(&value)
        .into_result()
        .with_context(|| format!("validate context file {}", path.display()))?;
    let context: Context = serde_json::from_value(value)
        .with_context(|| format!("deserialize context file {}", path.display()))?;
    debug!(path = %path.display(), entries = context.all_entries().len(), "loaded context");
    Ok(context)
}

/// Write `context` as pretty JSON, replacing `path` atomically.
pub fn save_context(path: &Path, context: &Context) -> Result<()> {
    write_json_atomic(path, context).with_context(|| format!("save context {}", path.display()))
}

/// Create a new empty context file. Refuses to overwrite an existing file.
pub fn init_context(path: &Path) -> Result<Context> {
    if path.exists() {
        return Err(anyhow!("context file already exists: {}", path.display()));
    }
    let context = Context::empty();
    save_context(path, &context)?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Field;

    #[test]
    fn save_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("context.json");
        let context = Context::empty()
            .with_goal("g")
            .append_unique(Field::Facts, &["f1", "f2"]);
        save_context(&path, &context).expect("save");
        assert_eq!(load_context(&path).expect("load"), context);
    }

    #[test]
    fn saved_file_uses_canonical_key_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("context.json");
        save_context(&path, &Context::empty()).expect("save");
        let contents = fs::read_to_string(&path).expect("read");
        let keys = [
            "\"goal\"",
            "\"constraints\"",
            "\"facts\"",
            "\"decisions\"",
            "\"tool_outputs\"",
            "\"open_questions\"",
        ];
        let order: Vec<usize> = keys
            .iter()
            .map(|key| contents.find(key).expect("key present"))
            .collect();
        assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(contents.ends_with("}\n"));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("context.json");
        init_context(&path).expect("init");
        assert_eq!(load_context(&path).expect("load"), Context::empty());
        let err = init_context(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    /// Invalid files list all violations in the error chain.
    #[test]
    fn load_reports_all_violations() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("context.json");
        fs::write(&path, r#"{"goal": 1, "facts": ["a", "a"], "notes": []}"#).expect("write");
        let err = load_context(&path).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("validate context file"));
        assert!(chain.contains("3 violation(s)"));
        assert!(chain.contains("/notes"));
        assert!(chain.contains("/goal"));
        assert!(chain.contains("/facts/1"));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("context.json");
        fs::write(&path, "{not json").expect("write");
        let err = load_context(&path).unwrap_err();
        assert!(err.to_string().starts_with("parse context file"));
    }

    #[test]
    fn load_rejects_repeated_keys() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("context.json");
        fs::write(&path, "{\n  \"goal\": \"a\",\n  \"goal\": \"b\"\n}\n").expect("write");
        let err = load_context(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate key `goal` at line 3"));
    }

    #[test]
    fn load_missing_file_names_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_context(&temp.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
