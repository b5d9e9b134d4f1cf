//! `col`: model-agnostic context management for LLM runs.
//!
//! Every command reads the context file; only `init` and `apply` write it,
//! and `apply` only with explicit approval.

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use col::apply::{Approval, Pick, candidates, commit, plan, selection_from_chosen};
use col::core::context::{Context, Field};
use col::core::merge::Diff;
use col::core::record::{ArtifactOutcomeError, RunArtifact};
use col::core::render::render;
use col::core::schema::{context_schema, response_schema};
use col::core::validate::validate;
use col::exit_codes;
use col::io::config::{ColConfig, DEFAULT_CONFIG_FILE, load_config};
use col::io::context_store::{init_context, load_context, read_context_value};
use col::io::run_store::read_response_file;
use col::logging;
use col::providers::{ProviderKind, build_provider};
use col::run::{run_completion, save_run};

#[derive(Parser)]
#[command(
    name = "col",
    version,
    about = "Context orchestration layer: model-agnostic context management for LLMs"
)]
struct Cli {
    /// Config file. Defaults to `col.toml` in the working directory.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty context file. Fails if the file exists.
    Init {
        /// Context file to create. Defaults to `default_context_file`.
        file: Option<PathBuf>,
    },
    /// Check a context file and print every violation.
    Validate {
        #[arg(short, long, value_name = "FILE")]
        context: Option<PathBuf>,
    },
    /// Print the system prompt rendered from a context file.
    Render {
        #[arg(short, long, value_name = "FILE")]
        context: Option<PathBuf>,
        /// Print only the prompt hash.
        #[arg(long)]
        hash_only: bool,
    },
    /// Run one completion. Never modifies the context file.
    Run {
        #[arg(short, long, value_name = "FILE")]
        context: Option<PathBuf>,
        /// Instruction sent as the user message.
        #[arg(short = 'q', long)]
        prompt: String,
        /// openai, anthropic (or claude), groq.
        #[arg(short, long)]
        provider: Option<ProviderKind>,
        #[arg(short, long)]
        model: Option<String>,
        /// Response file to write. Defaults to `default_output_file`.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Merge approved suggestions from a response file into the context.
    Apply {
        #[arg(short, long, value_name = "FILE")]
        context: Option<PathBuf>,
        /// Response file written by `col run`.
        #[arg(short, long, value_name = "FILE")]
        response: PathBuf,
        /// Approve every suggested addition.
        #[arg(short, long)]
        yes: bool,
        /// Approve every addition for a field (repeatable).
        #[arg(long = "field", value_name = "FIELD")]
        fields: Vec<Field>,
        /// Approve one addition as `field:index` (repeatable).
        #[arg(long = "pick", value_name = "FIELD:INDEX")]
        picks: Vec<Pick>,
    },
    /// Show entry counts and prompt size for a context file.
    Metrics {
        #[arg(short, long, value_name = "FILE")]
        context: Option<PathBuf>,
    },
    /// Print a JSON Schema document.
    Schema {
        #[arg(value_enum, default_value_t = SchemaKind::Context)]
        kind: SchemaKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemaKind {
    Context,
    Response,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = load_config(&config_path)?;
    let context_file =
        |flag: Option<PathBuf>| flag.unwrap_or_else(|| config.default_context_file.clone());

    match cli.command {
        Command::Init { file } => cmd_init(&context_file(file)),
        Command::Validate { context } => cmd_validate(&context_file(context)),
        Command::Render { context, hash_only } => cmd_render(&context_file(context), hash_only),
        Command::Run {
            context,
            prompt,
            provider,
            model,
            output,
        } => {
            let output = output.unwrap_or_else(|| config.default_output_file.clone());
            cmd_run(&config, &context_file(context), &prompt, provider, model, &output)
        }
        Command::Apply {
            context,
            response,
            yes,
            fields,
            picks,
        } => {
            let approval = Approval {
                all: yes,
                fields,
                picks,
            };
            cmd_apply(&context_file(context), &response, &approval)
        }
        Command::Metrics { context } => cmd_metrics(&context_file(context)),
        Command::Schema { kind } => {
            match kind {
                SchemaKind::Context => print!("{}", context_schema()),
                SchemaKind::Response => print!("{}", response_schema()),
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_init(path: &Path) -> Result<i32> {
    init_context(path)?;
    println!("Created context file: {}", path.display());
    println!("Edit it to set the goal, constraints and initial facts.");
    Ok(exit_codes::OK)
}

fn cmd_validate(path: &Path) -> Result<i32> {
    let value = read_context_value(path)?;
    let report = validate(&value);
    if report.is_valid() {
        println!("{}: ok", path.display());
        return Ok(exit_codes::OK);
    }
    println!("{}: {} violation(s)", path.display(), report.violations().len());
    for violation in report.violations() {
        println!("- {violation}");
    }
    Ok(exit_codes::INVALID)
}

fn cmd_render(path: &Path, hash_only: bool) -> Result<i32> {
    let context = load_context(path)?;
    let prompt = render(&context)?;
    if hash_only {
        println!("{}", prompt.hash);
    } else {
        print!("{}", prompt.text);
    }
    Ok(exit_codes::OK)
}

fn cmd_run(
    config: &ColConfig,
    context_path: &Path,
    instruction: &str,
    provider: Option<ProviderKind>,
    model: Option<String>,
    output: &Path,
) -> Result<i32> {
    let context = load_context(context_path)?;
    let kind = match provider {
        Some(kind) => kind,
        None => config.provider_kind()?,
    };
    let provider = build_provider(kind, &config.provider_settings(model), |var| {
        std::env::var(var).ok()
    })?;

    eprintln!("Running with {} ({})...", provider.name(), provider.model());
    let artifact = run_completion(provider.as_ref(), &context, instruction)?;
    let record_path = save_run(&artifact, output, &config.runs_dir)?;

    let code = report_run(&artifact, context_path, output);
    println!("Prompt hash: {}", artifact.prompt_hash());
    println!("Run recorded: {}", record_path.display());
    Ok(code)
}

fn report_run(artifact: &RunArtifact, context_path: &Path, output: &Path) -> i32 {
    match artifact.outcome() {
        Ok(response) => {
            println!("Answer:\n{}\n", response.answer);
            if response.has_suggestions() {
                println!("Suggested context updates:");
                for (field, items) in response.suggested_context_updates.iter() {
                    for item in items {
                        println!("  {field}: {item}");
                    }
                }
                println!(
                    "\nTo review and apply them: col apply --context {} --response {}",
                    context_path.display(),
                    output.display()
                );
            }
            println!("Response saved: {}", output.display());
            exit_codes::OK
        }
        Err(ArtifactOutcomeError::ParseFailed(detail)) => {
            eprintln!("error: provider output failed to parse: {}", detail.reason);
            if let Some(fragment) = &detail.fragment {
                eprintln!("  near: {fragment}");
            }
            eprintln!("Raw output saved: {}", output.display());
            exit_codes::PARSE_FAILED
        }
        Err(ArtifactOutcomeError::Inconsistent) => {
            eprintln!("error: recorded run is inconsistent");
            exit_codes::INVALID
        }
    }
}

fn cmd_apply(context_path: &Path, response_path: &Path, approval: &Approval) -> Result<i32> {
    let context = load_context(context_path)?;
    let artifact = read_response_file(response_path)?;
    let diff = plan(&context, &artifact)
        .with_context(|| format!("cannot apply {}", response_path.display()))?;

    if diff.is_empty() {
        // Explicit picks must still exist in the recomputed diff.
        approval.selection(&diff).resolve(&diff)?;
        println!("No new updates to apply: every suggestion is already in the context.");
        return Ok(exit_codes::OK);
    }
    print_diff(&diff);

    let selection = if approval.is_unspecified() {
        if !std::io::stdin().is_terminal() {
            bail!("stdin is not a terminal; approve updates with --yes, --field or --pick");
        }
        let all = candidates(&diff);
        let labels: Vec<String> = all
            .iter()
            .map(|c| format!("[{}] {}", c.pick.field, c.text))
            .collect();
        let chosen = dialoguer::MultiSelect::new()
            .with_prompt("Select updates to apply (space toggles, enter confirms)")
            .items(&labels)
            .interact()
            .context("read update selection")?;
        selection_from_chosen(&all, &chosen)
    } else {
        approval.selection(&diff)
    };

    if selection.is_empty() {
        println!("Nothing selected; context unchanged.");
        return Ok(exit_codes::OK);
    }
    let applied = commit(context_path, &context, &diff, &selection)?;
    let added = applied.added;
    println!("Context updated: {} ({added} entries added)", context_path.display());
    Ok(exit_codes::OK)
}

fn print_diff(diff: &Diff) {
    println!("Proposed additions:");
    for candidate in candidates(diff) {
        println!("  + {} {}", candidate.pick, candidate.text);
    }
}

fn cmd_metrics(path: &Path) -> Result<i32> {
    let context = load_context(path)?;
    let file_size = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    let prompt = render(&context)?;
    let chars = prompt.text.chars().count();

    print_metrics(&context);
    println!("File size: {file_size} bytes");
    println!("System prompt chars: {chars}");
    println!("Estimated tokens: ~{}", chars / 4);
    println!("Prompt hash: {}", prompt.hash);
    Ok(exit_codes::OK)
}

fn print_metrics(context: &Context) {
    println!("{:<16} {:>5}", "Field", "Count");
    println!("{:<16} {:>5}", "Goal", usize::from(!context.goal().is_empty()));
    for field in Field::ALL {
        println!("{:<16} {:>5}", field.as_str(), context.entries(field).len());
    }
}
