//! Pretty JSON files written via temp file + rename.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

/// Serialize `value` as pretty JSON with a trailing newline and atomically
/// replace `path`. Missing parent directories are created.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote json file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_pretty_json_with_trailing_newline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("out.json");
        write_json_atomic(&path, &json!({"a": 1})).expect("write");
        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "{\n  \"a\": 1\n}\n");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/dir/out.json");
        write_json_atomic(&path, &json!([])).expect("write");
        assert!(path.exists());
    }

    #[test]
    fn replaces_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("out.json");
        write_json_atomic(&path, &json!({"v": 1})).expect("first");
        write_json_atomic(&path, &json!({"v": 2})).expect("second");
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(value["v"], 2);
    }
}
