//! Pipeline entry points: one document in, one JSON dataset out.
//!
//! Every run is strictly sequential: extract → synthesise → (flatten) →
//! write. A generative run makes exactly one service call; the pattern run
//! makes none. Fatal problems come back as [`DocQaError`]; a run that
//! succeeded but produced no items returns
//! [`PipelineOutcome::NothingToWrite`] and leaves the filesystem untouched.

use crate::config::{PipelineConfig, PipelineJob, PipelineKind, SourceFormat};
use crate::error::DocQaError;
use crate::output::{DatasetStats, PipelineOutcome};
use crate::pipeline::{docx, flatten, input, llm, pdf, postprocess, products, write};
use crate::progress::Stage;
use crate::prompts::default_template;
use crate::provider::{GeminiProvider, GenerativeProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Build the company-description dataset (`{Question, Answer}`, indent 4)
/// from a Word document.
pub async fn prepare_company_description(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, DocQaError> {
    run_pipeline(
        PipelineKind::CompanyDescription,
        input.as_ref(),
        output.as_ref(),
        None,
        config,
    )
    .await
}

/// Build the product-manual dataset (`{instruction, response}`, indent 4)
/// from a PDF.
pub async fn prepare_product_manual(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, DocQaError> {
    run_pipeline(
        PipelineKind::ProductManual,
        input.as_ref(),
        output.as_ref(),
        None,
        config,
    )
    .await
}

/// Build the product-specifications dataset (`{Question, Answer}`, indent 2)
/// from a PDF by pattern extraction.
///
/// When `records_output` is given, the intermediate product records are also
/// written there (indent 2).
pub async fn prepare_product_specifications(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    records_output: Option<&Path>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, DocQaError> {
    run_pipeline(
        PipelineKind::ProductSpecifications,
        input.as_ref(),
        output.as_ref(),
        records_output,
        config,
    )
    .await
}

/// Run a resolved job.
pub async fn run(job: &PipelineJob, config: &PipelineConfig) -> Result<PipelineOutcome, DocQaError> {
    run_pipeline(
        job.kind,
        &job.input,
        &job.output,
        job.records_output.as_deref(),
        config,
    )
    .await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(job: &PipelineJob, config: &PipelineConfig) -> Result<PipelineOutcome, DocQaError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocQaError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(job, config))
}

/// Extract the text of a .docx or PDF file, choosing the extractor from the
/// file's magic bytes (or extension).
///
/// Does not require a provider or API key.
pub async fn extract_text(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<String, DocQaError> {
    let path = path.as_ref();
    let format = match input::detect_format(path) {
        Some(format) => format,
        None if !path.exists() => {
            return Err(DocQaError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        None => {
            return Err(DocQaError::InvalidConfig(format!(
                "Cannot tell whether '{}' is a PDF or a Word document",
                path.display()
            )))
        }
    };
    extract_source(path, format, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn extract_source(
    path: &Path,
    format: SourceFormat,
    config: &PipelineConfig,
) -> Result<String, DocQaError> {
    let path = input::resolve_local(path, format)?;
    let raw = match format {
        SourceFormat::Docx => docx::extract_text(&path).await?,
        SourceFormat::Pdf => pdf::extract_text(&path, config).await?,
    };
    Ok(postprocess::clean_source_text(&raw))
}

async fn run_pipeline(
    kind: PipelineKind,
    input: &Path,
    output: &Path,
    records_output: Option<&Path>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, DocQaError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_pipeline_start(kind);
    }
    info!("Starting {} pipeline: {}", kind, input.display());

    let result = if kind.is_generative() {
        run_generative(kind, input, output, config).await
    } else {
        run_pattern(input, output, records_output, config).await
    };

    match &result {
        Ok(outcome) => {
            match outcome {
                PipelineOutcome::Written { path, stats } => info!(
                    "{} pipeline complete: {} items → {} ({}ms)",
                    kind,
                    stats.items,
                    path.display(),
                    stats.total_duration_ms
                ),
                PipelineOutcome::NothingToWrite { reason, .. } => {
                    warn!("{} pipeline wrote nothing: {}", kind, reason)
                }
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_pipeline_complete(kind, outcome.is_written());
            }
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_pipeline_error(kind, &e.to_string());
            }
        }
    }
    result
}

/// Extract stage with progress events and timing.
async fn extract_stage(
    kind: PipelineKind,
    input: &Path,
    config: &PipelineConfig,
    stats: &mut DatasetStats,
) -> Result<String, DocQaError> {
    stage_start(config, Stage::Extract);
    let start = Instant::now();
    let text = extract_source(input, kind.source_format(), config).await?;
    stats.extract_duration_ms = start.elapsed().as_millis() as u64;
    stats.source_chars = text.chars().count();
    info!(
        "Extracted {} chars in {}ms",
        stats.source_chars, stats.extract_duration_ms
    );
    stage_complete(config, Stage::Extract, stats.source_chars);
    Ok(text)
}

async fn run_generative(
    kind: PipelineKind,
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, DocQaError> {
    let total_start = Instant::now();
    let mut stats = DatasetStats::default();

    let provider = resolve_provider(config)?;
    let template = match config.prompt_template.as_deref() {
        Some(t) => t,
        None => default_template(kind).ok_or_else(|| {
            DocQaError::Internal(format!("No prompt template for the {} pipeline", kind))
        })?,
    };

    let text = extract_stage(kind, input, config, &mut stats).await?;
    if text.trim().is_empty() {
        return Err(DocQaError::EmptyDocument {
            path: input.to_path_buf(),
        });
    }

    stage_start(config, Stage::Generate);
    let dataset = llm::generate_records(
        provider.as_ref(),
        template,
        &text,
        kind.dataset_kind(),
        config,
    )
    .await?;
    stats.synthesis_duration_ms = dataset.duration_ms;
    stats.prompt_tokens = dataset.prompt_tokens;
    stats.completion_tokens = dataset.completion_tokens;
    stats.malformed_items = dataset.malformed_items;
    stats.items = dataset.items.len();
    stage_complete(config, Stage::Generate, stats.items);

    stage_start(config, Stage::Write);
    let path = write::write_json(&dataset.items, output, kind.indent()).await?;
    stage_complete(config, Stage::Write, stats.items);

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(PipelineOutcome::Written { path, stats })
}

async fn run_pattern(
    input: &Path,
    output: &Path,
    records_output: Option<&Path>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, DocQaError> {
    let kind = PipelineKind::ProductSpecifications;
    let total_start = Instant::now();
    let mut stats = DatasetStats::default();

    let text = extract_stage(kind, input, config, &mut stats).await?;
    let mut outcome = pattern_stages(&text, output, records_output, config, stats).await?;
    let (PipelineOutcome::Written { stats, .. } | PipelineOutcome::NothingToWrite { stats, .. }) =
        &mut outcome;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(outcome)
}

/// Match, flatten and write. Either both files are written or neither is:
/// the records dump only goes out after the pairs file is in place, and a
/// failed dump takes the pairs file back out.
async fn pattern_stages(
    text: &str,
    output: &Path,
    records_output: Option<&Path>,
    config: &PipelineConfig,
    mut stats: DatasetStats,
) -> Result<PipelineOutcome, DocQaError> {
    let kind = PipelineKind::ProductSpecifications;

    let synth_start = Instant::now();
    stage_start(config, Stage::Match);
    let records = products::extract_products(text);
    stats.products = records.len();
    stage_complete(config, Stage::Match, records.len());

    stage_start(config, Stage::Flatten);
    let pairs = flatten::flatten_products(&records);
    stats.items = pairs.len();
    stats.synthesis_duration_ms = synth_start.elapsed().as_millis() as u64;
    stage_complete(config, Stage::Flatten, pairs.len());

    if pairs.is_empty() {
        let reason = if records.is_empty() {
            "no product blocks found in the document".to_string()
        } else {
            format!(
                "{} product blocks found but none had features or a price",
                records.len()
            )
        };
        return Ok(PipelineOutcome::NothingToWrite { reason, stats });
    }

    stage_start(config, Stage::Write);
    let path = write::write_json(&pairs, output, kind.indent()).await?;

    if let Some(records_path) = records_output {
        match write::write_json(&records, records_path, kind.indent()).await {
            Ok(records_path) => debug!("Product records written to {}", records_path.display()),
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!("Could not remove {} after failed records dump: {}", path.display(), rm);
                }
                return Err(e);
            }
        }
    }
    stage_complete(config, Stage::Write, pairs.len());

    Ok(PipelineOutcome::Written { path, stats })
}

fn stage_start(config: &PipelineConfig, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(config: &PipelineConfig, stage: Stage, items: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, items);
    }
}

/// Resolve the generation provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is. Tests and
///    callers with custom middleware go through here.
/// 2. **Explicit key** (`config.api_key`).
/// 3. **Environment** — the variable named by `config.api_key_env`
///    (default `GOOGLE_API_KEY`). The CLI loads `.env` before this runs.
fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn GenerativeProvider>, DocQaError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            std::env::var(&config.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
        })
        .ok_or_else(|| DocQaError::ProviderNotConfigured {
            provider: "gemini".to_string(),
            hint: format!(
                "Set {} in the environment or in a .env file, or choose another variable with --api-key-env",
                config.api_key_env
            ),
        })?;

    let provider = GeminiProvider::new(
        config.api_base_url.clone(),
        config.model.clone(),
        api_key,
        config.api_timeout_secs,
    )?;
    debug!("Using {} model {}", provider.name(), provider.model());
    Ok(Arc::new(provider))
}
