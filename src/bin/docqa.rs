//! CLI binary for docqa.
//!
//! A thin shim over the library crate: resolves the project root and
//! `config/config.yml`, maps CLI flags onto `PipelineConfig`, runs the
//! selected pipelines and prints a summary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docqa::config::DEFAULT_CONFIG_FILE;
use docqa::{
    extract_text, find_project_root, run, PipelineConfig, PipelineJob, PipelineKind,
    PipelineOutcome, PipelineProgressCallback, ProgressCallback, ProjectConfig, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: one spinner per pipeline plus a log line per
/// finished stage.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref bar) = *guard {
                f(bar);
            }
        }
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut guard| guard.take())
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_pipeline_start(&self, pipeline: PipelineKind) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix(pipeline.to_string());
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_stage_start(&self, stage: Stage) {
        let msg = match stage {
            Stage::Extract => "extracting text…",
            Stage::Generate => "waiting for the model…",
            Stage::Match => "matching product blocks…",
            Stage::Flatten => "building Q&A pairs…",
            Stage::Write => "writing JSON…",
        };
        self.with_bar(|bar| bar.set_message(msg));
    }

    fn on_stage_complete(&self, stage: Stage, items: usize) {
        let unit = match stage {
            Stage::Extract => "chars",
            Stage::Match => "products",
            Stage::Generate | Stage::Flatten | Stage::Write => "items",
        };
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} {:<9} {}",
                green("✓"),
                stage.to_string(),
                dim(&format!("{items} {unit}"))
            ))
        });
    }

    fn on_pipeline_error(&self, _pipeline: PipelineKind, _error: &str) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
    }

    fn on_pipeline_complete(&self, _pipeline: PipelineKind, _written: bool) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Build every dataset named in config/config.yml
  docqa all

  # One pipeline, explicit paths
  docqa product-specifications --input specs.pdf --output specs.json --records records.json

  # Custom prompt template (must contain {text_content})
  docqa company-description --prompt prompts/company.txt

  # Show what the extractor sees
  docqa extract data/raw/product_manual.pdf

CONFIG (config/config.yml, found by walking up from the current directory):
  raw_data_dir:
    company_description_docx_dir: data/raw/company_description.docx
    product_manual_pdf_dir: data/raw/product_manual.pdf
    product_specifications_pdf_dir: data/raw/product_specifications.pdf
  json_dir:
    company_description_json_dir: data/json/company_description.json
    product_manual_json_dir: data/json/product_manual.json
    product_specifications_json_dir: data/json/product_specifications.json
    product_records_json_dir: data/json/product_records.json   # optional
  llm:                                                          # optional
    model: gemini-2.5-flash
    api_key_env: GOOGLE_API_KEY

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY     Gemini API key (a .env file in the working directory is loaded)
  PDFIUM_LIB_PATH    Path to libpdfium (file or directory); system path otherwise
  RUST_LOG           Log filter, overrides -v / -q
"#;

/// Prepare JSON Q&A datasets from company documents.
#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about = "Prepare JSON Q&A datasets from company documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: <root>/config/config.yml).
    #[arg(long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Project root relative paths resolve against (default: nearest
    /// ancestor containing config/config.yml).
    #[arg(long, global = true, env = "DOCQA_ROOT")]
    root: Option<PathBuf>,

    /// Gemini model ID, overrides llm.model.
    #[arg(long, global = true, env = "DOCQA_MODEL")]
    model: Option<String>,

    /// Environment variable holding the API key, overrides llm.api_key_env.
    #[arg(long, global = true, env = "DOCQA_API_KEY_ENV")]
    api_key_env: Option<String>,

    /// Per-request timeout in seconds, overrides llm.timeout_secs.
    #[arg(long, global = true, env = "DOCQA_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "DOCQA_PDF_PASSWORD")]
    password: Option<String>,

    /// Print the run summary as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "DOCQA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCQA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCQA_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Word company description → generated {Question, Answer} pairs.
    CompanyDescription(GenerativeArgs),
    /// PDF product manual → generated {instruction, response} pairs.
    ProductManual(GenerativeArgs),
    /// PDF specification sheet → pattern-extracted {Question, Answer} pairs.
    ProductSpecifications(SpecificationArgs),
    /// Run all three pipelines in order, continuing past failures.
    All,
    /// Print the text extracted from a .pdf or .docx file.
    Extract {
        /// Document to read.
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct PathArgs {
    /// Source document, overrides the config entry.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output JSON file, overrides the config entry.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerativeArgs {
    #[command(flatten)]
    paths: PathArgs,

    /// Text file with a custom prompt template containing {text_content}.
    #[arg(long)]
    prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SpecificationArgs {
    #[command(flatten)]
    paths: PathArgs,

    /// Also write the intermediate product records to this file.
    #[arg(long)]
    records: Option<PathBuf>,
}

/// One line of the `--json` summary.
#[derive(Serialize)]
struct RunReport {
    pipeline: PipelineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<PipelineOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; the key may already be in the environment.
    let _ = dotenvy::dotenv();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // stage lines provide the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Extract-only mode ────────────────────────────────────────────────
    if let Command::Extract { ref path } = cli.command {
        let mut builder = PipelineConfig::builder();
        if let Some(ref pwd) = cli.password {
            builder = builder.password(pwd.clone());
        }
        let config = builder.build().context("Invalid configuration")?;
        let text = extract_text(path, &config)
            .await
            .with_context(|| format!("Failed to extract text from {}", path.display()))?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        return Ok(());
    }

    // ── Resolve project ──────────────────────────────────────────────────
    let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
    let root = match cli.root {
        Some(ref root) => root.clone(),
        None => find_project_root(&cwd).unwrap_or_else(|| cwd.clone()),
    };
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(DEFAULT_CONFIG_FILE));
    let project = load_project(&config_path, cli.config.is_some())?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let kinds: Vec<PipelineKind> = match cli.command {
        Command::CompanyDescription(_) => vec![PipelineKind::CompanyDescription],
        Command::ProductManual(_) => vec![PipelineKind::ProductManual],
        Command::ProductSpecifications(_) => vec![PipelineKind::ProductSpecifications],
        Command::All => PipelineKind::ALL.to_vec(),
        Command::Extract { .. } => Vec::new(),
    };

    // ── Run pipelines ────────────────────────────────────────────────────
    let printed = !cli.quiet && !cli.json;
    let mut reports = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let result = run_one(kind, &cli, &project, &root, progress_cb.clone()).await;
        if printed {
            print_result(kind, &result);
        }
        reports.push((kind, result));
    }

    if cli.json {
        let summary: Vec<RunReport> = reports
            .iter()
            .map(|(kind, result)| match result {
                Ok(outcome) => RunReport {
                    pipeline: *kind,
                    outcome: Some(outcome.clone()),
                    error: None,
                },
                Err(e) => RunReport {
                    pipeline: *kind,
                    outcome: None,
                    error: Some(format!("{e:#}")),
                },
            })
            .collect();
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    }

    // ── Exit status ──────────────────────────────────────────────────────
    let total = reports.len();
    if total == 1 {
        if let Some((kind, result)) = reports.pop() {
            return single_exit_status(kind, result, printed);
        }
    }

    let unwritten = reports
        .iter()
        .filter(|(_, r)| !matches!(r, Ok(PipelineOutcome::Written { .. })))
        .count();
    if unwritten > 0 {
        anyhow::bail!("{unwritten} of {total} pipelines did not write a dataset");
    }
    Ok(())
}

/// Exit status of a single-pipeline run. When the result line is already on
/// stderr, only a short failure line follows it.
fn single_exit_status(
    kind: PipelineKind,
    result: Result<PipelineOutcome>,
    printed: bool,
) -> Result<()> {
    match result {
        Ok(PipelineOutcome::Written { .. }) => Ok(()),
        Ok(PipelineOutcome::NothingToWrite { .. }) if printed => {
            anyhow::bail!("{kind}: nothing to write")
        }
        Ok(PipelineOutcome::NothingToWrite { reason, .. }) => {
            anyhow::bail!("{kind}: nothing to write ({reason})")
        }
        Err(_) if printed => anyhow::bail!("{kind} pipeline failed"),
        Err(e) => Err(e.context(format!("{kind} pipeline failed"))),
    }
}

/// Load the project config. A missing default config is tolerated (every
/// path may come from flags); a missing explicit `--config` is an error.
fn load_project(path: &Path, explicit: bool) -> Result<ProjectConfig> {
    if !explicit && !path.is_file() {
        tracing::debug!("No config at {}; using flags only", path.display());
        return Ok(ProjectConfig::default());
    }
    ProjectConfig::load(path).context("Failed to load project config")
}

/// Resolve paths and settings for one pipeline and run it.
async fn run_one(
    kind: PipelineKind,
    cli: &Cli,
    project: &ProjectConfig,
    root: &Path,
    progress: Option<ProgressCallback>,
) -> Result<PipelineOutcome> {
    let (paths, prompt, records) = match cli.command {
        Command::CompanyDescription(ref a) | Command::ProductManual(ref a) => {
            (Some(&a.paths), a.prompt.as_deref(), None)
        }
        Command::ProductSpecifications(ref a) => (Some(&a.paths), None, a.records.clone()),
        Command::All | Command::Extract { .. } => (None, None, None),
    };

    let job = resolve_job(kind, project, root, paths, records)?;
    let config = build_config(cli, project, prompt, progress).await?;

    run(&job, &config)
        .await
        .with_context(|| format!("{} → {}", job.input.display(), job.output.display()))
}

/// Flags win over the config file, one path at a time: a side given on the
/// command line never needs its config key.
fn resolve_job(
    kind: PipelineKind,
    project: &ProjectConfig,
    root: &Path,
    paths: Option<&PathArgs>,
    records: Option<PathBuf>,
) -> Result<PipelineJob> {
    let input = match paths.and_then(|p| p.input.clone()) {
        Some(input) => input,
        None => project
            .input_path(kind, root)
            .with_context(|| format!("Cannot resolve the input for {kind}; pass --input"))?,
    };
    let output = match paths.and_then(|p| p.output.clone()) {
        Some(output) => output,
        None => project
            .output_path(kind, root)
            .with_context(|| format!("Cannot resolve the output for {kind}; pass --output"))?,
    };
    let records_output = records.or_else(|| project.records_output_path(kind, root));

    Ok(PipelineJob {
        kind,
        input,
        output,
        records_output,
    })
}

/// Map CLI args and the `llm:` config section to `PipelineConfig`.
async fn build_config(
    cli: &Cli,
    project: &ProjectConfig,
    prompt: Option<&Path>,
    progress: Option<ProgressCallback>,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::from_settings(&project.llm);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref env) = cli.api_key_env {
        builder = builder.api_key_env(env.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(path) = prompt {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_result(kind: PipelineKind, result: &Result<PipelineOutcome>) {
    match result {
        Ok(PipelineOutcome::Written { path, stats }) => {
            eprintln!(
                "{} {}  {} items  {}ms  →  {}",
                green("✔"),
                bold(kind.name()),
                stats.items,
                stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
            if kind.is_generative() {
                eprintln!(
                    "   {} tokens in  /  {} tokens out",
                    dim(&stats.prompt_tokens.to_string()),
                    dim(&stats.completion_tokens.to_string()),
                );
            }
            if stats.malformed_items > 0 {
                eprintln!(
                    "   {}",
                    yellow(&format!(
                        "{} items do not match the expected keys",
                        stats.malformed_items
                    ))
                );
            }
        }
        Ok(PipelineOutcome::NothingToWrite { reason, .. }) => {
            eprintln!(
                "{} {}  nothing to write: {}",
                yellow("⚠"),
                bold(kind.name()),
                reason
            );
        }
        Err(e) => {
            eprintln!("{} {}  {}", red("✘"), bold(kind.name()), red(&format!("{e:#}")));
        }
    }
}
