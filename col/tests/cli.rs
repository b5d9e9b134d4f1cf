//! CLI tests for `col` commands.
//!
//! Spawns the binary in a temp working directory and checks exit codes,
//! stdout and the files each command leaves behind.

use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use col::core::context::{Context, Field};
use col::core::record::{RunMetrics, record};
use col::core::render::{PromptHash, render};
use col::core::response::parse;
use col::exit_codes;
use col::io::context_store::{load_context, save_context};
use col::io::run_store::write_response_file;
use col::test_support::{TempWorkspace, response_json, sample_context};

const ENV_VARS: [&str; 8] = [
    "COL_DEFAULT_PROVIDER",
    "COL_DEFAULT_MODEL",
    "COL_DEFAULT_CONTEXT_FILE",
    "COL_DEFAULT_OUTPUT_FILE",
    "COL_RUNS_DIR",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GROQ_API_KEY",
];

fn col(dir: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_col"));
    cmd.current_dir(dir).args(args).stdin(Stdio::null());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.output().expect("spawn col")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_response(workspace: &TempWorkspace, raw: &str) {
    let context = load_context(&workspace.context_path()).expect("load context");
    let hash = render(&context).expect("render").hash;
    let artifact = record("mock", "mock-model", &hash, raw, &parse(raw), RunMetrics::default());
    write_response_file(&workspace.response_path(), &artifact).expect("write response");
}

#[test]
fn init_creates_empty_context_and_refuses_overwrite() {
    let workspace = TempWorkspace::new().expect("workspace");
    let output = col(workspace.path(), &["init"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(load_context(&workspace.context_path()).expect("load"), Context::empty());

    let again = col(workspace.path(), &["init"]);
    assert_eq!(again.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&again).contains("already exists"));
}

#[test]
fn validate_lists_every_violation() {
    let workspace = TempWorkspace::new().expect("workspace");
    fs::write(
        workspace.context_path(),
        r#"{"goal": ["x"], "facts": ["a", 3], "decisions": ["d", "d"]}"#,
    )
    .expect("write");

    let output = col(workspace.path(), &["validate", "-c", "context.json"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let text = stdout(&output);
    assert!(text.contains("3 violation(s)"));
    assert!(text.contains("- /goal:"));
    assert!(text.contains("- /facts/1:"));
    assert!(text.contains("- /decisions/1: duplicate entry `d`"));
}

#[test]
fn validate_accepts_valid_context() {
    let workspace = TempWorkspace::with_context(&sample_context()).expect("workspace");
    let output = col(workspace.path(), &["validate"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("ok"));
}

/// The CLI prints exactly the library's rendering and hash.
#[test]
fn render_matches_library_output() {
    let context = sample_context();
    let workspace = TempWorkspace::with_context(&context).expect("workspace");
    let expected = render(&context).expect("render");

    let text = col(workspace.path(), &["render", "-c", "context.json"]);
    assert_eq!(text.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&text), expected.text);

    let hash = col(workspace.path(), &["render", "--hash-only"]);
    assert_eq!(stdout(&hash).trim(), expected.hash.as_str());
}

#[test]
fn schema_prints_json_documents() {
    let workspace = TempWorkspace::new().expect("workspace");
    for kind in ["context", "response"] {
        let output = col(workspace.path(), &["schema", kind]);
        assert_eq!(output.status.code(), Some(exit_codes::OK));
        let value: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("schema json");
        assert_eq!(value["type"], "object");
    }
}

#[test]
fn run_without_api_key_fails_before_any_request() {
    let workspace = TempWorkspace::with_context(&sample_context()).expect("workspace");
    let output = col(workspace.path(), &["run", "-q", "next?", "-p", "groq"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("GROQ_API_KEY"));
    assert!(!workspace.response_path().exists());
}

#[test]
fn apply_yes_merges_every_new_suggestion() {
    let workspace = TempWorkspace::with_context(&sample_context()).expect("workspace");
    write_response(
        &workspace,
        &response_json(
            "ok",
            &[
                (Field::Facts, &["Ledger v2 is live", "Refunds go through v2"]),
                (Field::Decisions, &["Cut over on Monday"]),
            ],
        ),
    );

    let output = col(workspace.path(), &["apply", "-r", "response.json", "--yes"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    assert!(stdout(&output).contains("+ facts:0 Refunds go through v2"));

    let context = load_context(&workspace.context_path()).expect("load");
    assert_eq!(
        context.entries(Field::Facts),
        ["Ledger v2 is live".to_string(), "Refunds go through v2".to_string()]
    );
    assert_eq!(context.entries(Field::Decisions), ["Cut over on Monday".to_string()]);
    assert_eq!(context.goal(), sample_context().goal());
}

#[test]
fn apply_pick_merges_only_the_chosen_candidate() {
    let workspace = TempWorkspace::with_context(&Context::empty()).expect("workspace");
    write_response(&workspace, &response_json("ok", &[(Field::Facts, &["x", "y", "z"])]));

    let args = ["apply", "-r", "response.json", "--pick", "facts:1"];
    let output = col(workspace.path(), &args);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    let context = load_context(&workspace.context_path()).expect("load");
    assert_eq!(context.entries(Field::Facts), ["y".to_string()]);
}

/// Without approval flags and without a terminal, nothing is applied.
#[test]
fn apply_without_approval_refuses_non_interactive_stdin() {
    let workspace = TempWorkspace::with_context(&Context::empty()).expect("workspace");
    write_response(&workspace, &response_json("ok", &[(Field::Facts, &["x"])]));
    let before = fs::read_to_string(workspace.context_path()).expect("read");

    let output = col(workspace.path(), &["apply", "-r", "response.json"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("not a terminal"));
    assert_eq!(fs::read_to_string(workspace.context_path()).expect("read"), before);
}

#[test]
fn apply_with_nothing_new_succeeds_without_writing() {
    let context = Context::empty().append_unique(Field::Facts, &["x"]);
    let workspace = TempWorkspace::with_context(&context).expect("workspace");
    write_response(&workspace, &response_json("ok", &[(Field::Facts, &["x"])]));

    let output = col(workspace.path(), &["apply", "-r", "response.json"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("No new updates"));
}

/// A pick that no longer exists in the recomputed diff is rejected, even when
/// the diff is empty.
#[test]
fn apply_rejects_pick_against_empty_diff() {
    let context = Context::empty().append_unique(Field::Facts, &["x"]);
    let workspace = TempWorkspace::with_context(&context).expect("workspace");
    write_response(&workspace, &response_json("ok", &[(Field::Facts, &["x"])]));
    let before = fs::read_to_string(workspace.context_path()).expect("read");

    let output = col(workspace.path(), &["apply", "-r", "response.json", "--pick", "facts:0"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("facts[0]"));
    assert!(!stdout(&output).contains("No new updates"));
    assert_eq!(fs::read_to_string(workspace.context_path()).expect("read"), before);
}

/// Field approval against an empty diff is a no-op, not an error.
#[test]
fn apply_field_against_empty_diff_is_a_no_op() {
    let context = Context::empty().append_unique(Field::Facts, &["x"]);
    let workspace = TempWorkspace::with_context(&context).expect("workspace");
    write_response(&workspace, &response_json("ok", &[(Field::Facts, &["x"])]));

    let output = col(workspace.path(), &["apply", "-r", "response.json", "--field", "facts"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    assert!(stdout(&output).contains("No new updates"));
}

#[test]
fn validate_rejects_repeated_keys() {
    let workspace = TempWorkspace::new().expect("workspace");
    fs::write(workspace.context_path(), r#"{"facts": ["a"], "facts": ["b"]}"#).expect("write");

    let output = col(workspace.path(), &["validate"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("duplicate key `facts`"));
}

#[test]
fn apply_refuses_invalid_response() {
    let workspace = TempWorkspace::with_context(&sample_context()).expect("workspace");
    write_response(&workspace, "I think the answer is 42");
    let before = fs::read_to_string(workspace.context_path()).expect("read");

    let output = col(workspace.path(), &["apply", "-r", "response.json", "--yes"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("not valid"));
    assert_eq!(fs::read_to_string(workspace.context_path()).expect("read"), before);
}

#[test]
fn apply_rejects_out_of_range_pick() {
    let workspace = TempWorkspace::with_context(&Context::empty()).expect("workspace");
    write_response(&workspace, &response_json("ok", &[(Field::Facts, &["x"])]));

    let args = ["apply", "-r", "response.json", "--pick", "facts:4"];
    let output = col(workspace.path(), &args);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("facts[4]"));
    assert!(load_context(&workspace.context_path()).expect("load").all_entries().is_empty());
}

#[test]
fn metrics_reports_counts_and_prompt_size() {
    let context = sample_context();
    let workspace = TempWorkspace::with_context(&context).expect("workspace");
    let prompt = render(&context).expect("render");

    let output = col(workspace.path(), &["metrics"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let text = stdout(&output);
    assert!(text.contains(&format!("System prompt chars: {}", prompt.text.chars().count())));
    assert!(text.contains(&format!("Prompt hash: {}", prompt.hash)));
    assert!(text.lines().any(|line| line.starts_with("facts") && line.ends_with('1')));
}

/// Config file defaults are picked up from the working directory.
#[test]
fn config_file_sets_default_context_path() {
    let workspace = TempWorkspace::new().expect("workspace");
    let config = "default_context_file = \"task.json\"\n";
    fs::write(workspace.path().join("col.toml"), config).expect("write");
    save_context(&workspace.path().join("task.json"), &sample_context()).expect("save");

    let output = col(workspace.path(), &["render", "--hash-only"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    assert_eq!(
        stdout(&output).trim(),
        PromptHash::of(&render(&sample_context()).expect("render").text).as_str()
    );
}
